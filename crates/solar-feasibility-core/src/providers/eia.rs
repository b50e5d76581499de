use async_trait::async_trait;
use chrono::Datelike;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{check_status, http_client, provider_error, EnergyDataProvider};
use crate::config::{EiaConfig, HttpConfig};
use crate::production::solar_metrics::EnergyData;
use crate::rates::census::census_division;
use crate::rates::details::{
    build_rate_details, fallback_rate_details, EnergyRateDetails, HistoricalRate,
};
use crate::rates::escalation::RateEscalationTable;
use crate::types::{Rate, Sourced};
use crate::SolarResult;

const PROVIDER: &str = "eia";

/// Substituted for individual fields missing from an otherwise good reply.
const MISSING_PRICE_CENTS: Decimal = dec!(12);
const MISSING_CONSUMPTION: Decimal = dec!(12);
const MISSING_SUN_HOURS: Decimal = dec!(5);

/// Conservative figures used when the EIA cannot be reached at all.
pub fn fallback_energy_data() -> EnergyData {
    EnergyData {
        electricity_rate: dec!(0.11),
        consumption_benchmark: dec!(0.8),
        sun_hours_per_day: dec!(4.5),
    }
}

#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    response: EiaBody,
}

#[derive(Debug, Deserialize)]
struct EiaBody {
    #[serde(default)]
    data: Vec<EiaRow>,
}

#[derive(Debug, Deserialize)]
struct EiaRow {
    #[serde(default)]
    period: String,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    consumption: Option<Decimal>,
    #[serde(default)]
    value: Option<Decimal>,
}

struct Query<'a> {
    route: &'a str,
    data: &'a str,
    frequency: &'a str,
    facets: Vec<(&'a str, &'a str)>,
    length: u32,
}

/// U.S. Energy Information Administration open-data client (API v2).
pub struct EiaClient {
    client: reqwest::Client,
    config: EiaConfig,
    escalation: RateEscalationTable,
}

impl EiaClient {
    pub fn new(config: &EiaConfig, http: &HttpConfig) -> SolarResult<Self> {
        Ok(Self {
            client: http_client(http)?,
            config: config.clone(),
            escalation: RateEscalationTable::default(),
        })
    }

    async fn fetch(&self, query: Query<'_>) -> SolarResult<Vec<EiaRow>> {
        if self.config.api_key.is_empty() {
            return Err(provider_error(PROVIDER, "API key not configured"));
        }

        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            query.route
        );
        let length = query.length.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("api_key", self.config.api_key.as_str()),
            ("frequency", query.frequency),
            ("data[0]", query.data),
        ];
        params.extend(query.facets.iter().copied());
        params.extend([
            ("sort[0][column]", "period"),
            ("sort[0][direction]", "desc"),
            ("length", length.as_str()),
        ]);

        debug!(route = query.route, "querying EIA");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| provider_error(PROVIDER, format!("Request failed: {e}")))?;
        let response = check_status(PROVIDER, response).await?;

        let envelope: EiaEnvelope = response
            .json()
            .await
            .map_err(|e| provider_error(PROVIDER, format!("Failed to parse response: {e}")))?;
        Ok(envelope.response.data)
    }

    async fn fetch_energy_data(&self, state: &str) -> SolarResult<EnergyData> {
        let sector = self.config.sector.as_str();

        let rates = self
            .fetch(Query {
                route: "electricity/retail-sales/data/",
                data: "price",
                frequency: "monthly",
                facets: vec![("facets[state][]", state), ("facets[sectorid][]", sector)],
                length: 1,
            })
            .await?;
        let price_cents =
            posted_price(first_row(&rates, "retail price")?).unwrap_or(MISSING_PRICE_CENTS);

        let consumption = self
            .fetch(Query {
                route: "consumption/commercial/data/",
                data: "consumption",
                frequency: "monthly",
                facets: vec![("facets[state][]", state)],
                length: 1,
            })
            .await?;
        let consumption_benchmark = first_row(&consumption, "commercial consumption")?
            .consumption
            .unwrap_or(MISSING_CONSUMPTION);

        let sun = self
            .fetch(Query {
                route: "solar/data/",
                data: "value",
                frequency: "annual",
                facets: vec![("facets[state][]", state)],
                length: 1,
            })
            .await?;
        let sun_hours_per_day = first_row(&sun, "sun hours")?
            .value
            .unwrap_or(MISSING_SUN_HOURS);

        Ok(EnergyData {
            electricity_rate: cents_to_dollars(price_cents),
            consumption_benchmark,
            sun_hours_per_day,
        })
    }

    async fn fetch_rate_details(
        &self,
        state: &str,
        county: Option<&str>,
        base_year: i32,
    ) -> SolarResult<EnergyRateDetails> {
        let sector = self.config.sector.as_str();

        let history = self
            .fetch(Query {
                route: "electricity/retail-sales/data/",
                data: "price",
                frequency: "monthly",
                facets: vec![("facets[state][]", state), ("facets[sectorid][]", sector)],
                length: 12,
            })
            .await?;
        let current_rate = cents_to_dollars(
            history
                .first()
                .and_then(posted_price)
                .unwrap_or(MISSING_PRICE_CENTS),
        );
        let historical_rates = history
            .iter()
            .map(|row| HistoricalRate {
                date: row.period.clone(),
                rate: cents_to_dollars(posted_price(row).unwrap_or(Decimal::ZERO)),
            })
            .collect();

        let division = census_division(state);
        let regional = self
            .fetch(Query {
                route: "electricity/retail-sales/data/",
                data: "price",
                frequency: "monthly",
                facets: vec![
                    ("facets[census_division_name][]", division),
                    ("facets[sectorid][]", sector),
                ],
                length: 1,
            })
            .await?;
        let regional_average = cents_to_dollars(
            regional
                .first()
                .and_then(posted_price)
                .unwrap_or(Decimal::ZERO),
        );

        Ok(build_rate_details(
            current_rate,
            historical_rates,
            regional_average,
            county,
            state,
            &self.escalation,
            base_year,
        ))
    }
}

#[async_trait]
impl EnergyDataProvider for EiaClient {
    async fn energy_data(&self, state: &str) -> Sourced<EnergyData> {
        match self.fetch_energy_data(state).await {
            Ok(data) => Sourced::live(data),
            Err(e) => {
                warn!(state, error = %e, "EIA energy data unavailable, using conservative defaults");
                Sourced::degraded(fallback_energy_data(), format!("EIA energy data: {e}"))
            }
        }
    }

    async fn rate_details(&self, state: &str, county: Option<&str>) -> Sourced<EnergyRateDetails> {
        let base_year = chrono::Utc::now().year();
        match self.fetch_rate_details(state, county, base_year).await {
            Ok(details) => Sourced::live(details),
            Err(e) => {
                warn!(state, error = %e, "EIA rate details unavailable, using fallback rates");
                Sourced::degraded(
                    fallback_rate_details(base_year),
                    format!("EIA rate details: {e}"),
                )
            }
        }
    }
}

fn cents_to_dollars(cents: Decimal) -> Rate {
    cents / dec!(100)
}

/// Price in cents. Zero and negative prices count as missing.
fn posted_price(row: &EiaRow) -> Option<Decimal> {
    row.price.filter(|cents| *cents > Decimal::ZERO)
}

fn first_row<'a>(rows: &'a [EiaRow], series: &str) -> SolarResult<&'a EiaRow> {
    rows.first()
        .ok_or_else(|| provider_error(PROVIDER, format!("No {series} data returned")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn client_for(server: &ServerGuard) -> EiaClient {
        let config = EiaConfig {
            api_key: "test-key".to_string(),
            base_url: server.url(),
            ..EiaConfig::default()
        };
        EiaClient::new(&config, &HttpConfig::default()).unwrap()
    }

    fn rows(body: serde_json::Value) -> String {
        json!({ "response": { "data": body } }).to_string()
    }

    #[tokio::test]
    async fn test_energy_data_live() {
        let mut server = Server::new_async().await;

        let price = server
            .mock("GET", "/electricity/retail-sales/data/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api_key".into(), "test-key".into()),
                Matcher::UrlEncoded("facets[state][]".into(), "CA".into()),
                Matcher::UrlEncoded("facets[sectorid][]".into(), "COM".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([{ "period": "2026-07", "price": 21.5 }])))
            .create_async()
            .await;
        let consumption = server
            .mock("GET", "/consumption/commercial/data/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([{ "period": "2026-07", "consumption": "1.4" }])))
            .create_async()
            .await;
        let sun = server
            .mock("GET", "/solar/data/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([{ "period": "2025" }])))
            .create_async()
            .await;

        let data = client_for(&server).energy_data("CA").await;
        assert!(!data.is_degraded());
        let data = data.into_inner();
        assert_eq!(data.electricity_rate, dec!(0.215));
        assert_eq!(data.consumption_benchmark, dec!(1.4));
        // Field missing from the reply
        assert_eq!(data.sun_hours_per_day, dec!(5));

        price.assert_async().await;
        consumption.assert_async().await;
        sun.assert_async().await;
    }

    #[tokio::test]
    async fn test_energy_data_degrades_on_server_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/electricity/retail-sales/data/")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let data = client_for(&server).energy_data("TX").await;
        assert!(data.is_degraded());
        assert!(data.degradation_reason().unwrap().contains("503"));
        assert_eq!(data.value(), &fallback_energy_data());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_energy_data_degrades_on_empty_reply() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/electricity/retail-sales/data/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([])))
            .create_async()
            .await;

        let data = client_for(&server).energy_data("TX").await;
        assert!(data.is_degraded());
        assert_eq!(data.value().electricity_rate, dec!(0.11));
    }

    #[tokio::test]
    async fn test_missing_key_degrades_without_request() {
        let client = EiaClient::new(&EiaConfig::default(), &HttpConfig::default()).unwrap();
        let data = client.energy_data("WA").await;
        assert!(data.is_degraded());
        assert!(data.degradation_reason().unwrap().contains("API key"));
    }

    #[tokio::test]
    async fn test_rate_details_live() {
        let mut server = Server::new_async().await;

        let state = server
            .mock("GET", "/electricity/retail-sales/data/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("facets[state][]".into(), "WA".into()),
                Matcher::UrlEncoded("length".into(), "12".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([
                { "period": "2026-07", "price": 10.0 },
                { "period": "2026-06", "price": 9.8 },
                { "period": "2026-05" }
            ])))
            .create_async()
            .await;
        let regional = server
            .mock("GET", "/electricity/retail-sales/data/")
            .match_query(Matcher::UrlEncoded(
                "facets[census_division_name][]".into(),
                "Pacific".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([{ "period": "2026-07", "price": 14.0 }])))
            .create_async()
            .await;

        let details = client_for(&server)
            .rate_details("WA", Some("King County"))
            .await;
        assert!(!details.is_degraded());
        let details = details.into_inner();

        assert_eq!(details.total_rate, dec!(0.10));
        assert_eq!(details.regional_average, dec!(0.14));
        assert_eq!(details.escalation_rate, dec!(3.9));
        assert_eq!(details.historical_rates.len(), 3);
        assert_eq!(details.historical_rates[2].rate, Decimal::ZERO);
        assert_eq!(details.projected_rates.len(), 25);

        state.assert_async().await;
        regional.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_details_fallback() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/electricity/retail-sales/data/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let details = client_for(&server).rate_details("NY", None).await;
        assert!(details.is_degraded());
        assert_eq!(details.value().total_rate, dec!(0.12));
        assert_eq!(details.value().escalation_rate, dec!(4.23));
    }

    #[tokio::test]
    async fn test_zero_price_treated_as_missing() {
        let mut server = Server::new_async().await;
        let _price = server
            .mock("GET", "/electricity/retail-sales/data/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([{ "period": "2026-07", "price": 0 }])))
            .create_async()
            .await;
        let _consumption = server
            .mock("GET", "/consumption/commercial/data/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([{ "period": "2026-07", "consumption": 1.1 }])))
            .create_async()
            .await;
        let _sun = server
            .mock("GET", "/solar/data/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rows(json!([{ "period": "2025", "value": 4.8 }])))
            .create_async()
            .await;

        let client = client_for(&server);
        let data = client.energy_data("AZ").await;
        assert!(!data.is_degraded());
        assert_eq!(data.value().electricity_rate, dec!(0.12));

        let details = client.rate_details("AZ", None).await;
        assert!(!details.is_degraded());
        let details = details.into_inner();
        assert_eq!(details.total_rate, dec!(0.12));
        assert_eq!(details.regional_average, Decimal::ZERO);
        assert_eq!(details.historical_rates[0].rate, Decimal::ZERO);
    }
}
