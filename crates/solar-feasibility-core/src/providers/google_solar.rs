use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{check_status, http_client, provider_error, BuildingInsightsProvider};
use crate::config::{GoogleSolarConfig, HttpConfig};
use crate::production::solar_metrics::{BuildingProfile, SiteAddress};
use crate::types::GeoPoint;
use crate::SolarResult;

const PROVIDER: &str = "google_solar";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildingInsightsResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    administrative_area: Option<String>,
    #[serde(default)]
    building_stats: Option<AreaStats>,
    solar_potential: SolarPotential,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolarPotential {
    panel_capacity_watts: Decimal,
    whole_roof_stats: AreaStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AreaStats {
    area_meters2: Decimal,
}

impl From<BuildingInsightsResponse> for BuildingProfile {
    fn from(r: BuildingInsightsResponse) -> Self {
        BuildingProfile {
            name: r.name,
            roof_area_m2: r.solar_potential.whole_roof_stats.area_meters2,
            building_area_m2: r.building_stats.map(|s| s.area_meters2),
            panel_capacity_watts: r.solar_potential.panel_capacity_watts,
            address: SiteAddress {
                state: r.administrative_area.unwrap_or_default(),
                ..SiteAddress::default()
            },
            industry: None,
        }
    }
}

/// Google Maps Platform Solar API, `buildingInsights:findClosest`.
pub struct GoogleSolarClient {
    client: reqwest::Client,
    config: GoogleSolarConfig,
}

impl GoogleSolarClient {
    pub fn new(config: &GoogleSolarConfig, http: &HttpConfig) -> SolarResult<Self> {
        Ok(Self {
            client: http_client(http)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl BuildingInsightsProvider for GoogleSolarClient {
    async fn building_insights(&self, location: GeoPoint) -> SolarResult<BuildingProfile> {
        if self.config.api_key.is_empty() {
            return Err(provider_error(PROVIDER, "API key not configured"));
        }

        let url = format!(
            "{}/buildingInsights:findClosest",
            self.config.base_url.trim_end_matches('/')
        );
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        debug!(%latitude, %longitude, "requesting building insights");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("location.latitude", latitude.as_str()),
                ("location.longitude", longitude.as_str()),
                ("requiredQuality", self.config.required_quality.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| provider_error(PROVIDER, format!("Request failed: {e}")))?;
        let response = check_status(PROVIDER, response).await?;

        let insights: BuildingInsightsResponse = response
            .json()
            .await
            .map_err(|e| provider_error(PROVIDER, format!("Failed to parse response: {e}")))?;

        if insights.solar_potential.whole_roof_stats.area_meters2 <= Decimal::ZERO {
            return Err(provider_error(PROVIDER, "Building has no usable roof area"));
        }

        Ok(insights.into())
    }
}
