//! End-to-end site assessment.
//!
//! Runs the one-way flow from a map coordinate to a feasibility report:
//! building insights, roof layout, regional energy data, facility metrics,
//! rate details, cash-flow analysis, sizing advice and a facility cost
//! estimate. Every input that fell back to defaults is reported in
//! `data_quality` and in the warnings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use crate::config::SolarConfig;
use crate::error::SolarError;
use crate::financial::cash_flow::{compute_metrics, FinancialMetrics, FinancialParameters, FinancingTerms};
use crate::financial::sizing::{optimal_system_size, SizingInput, SizingOutput};
use crate::layout::roof::{
    calculate_layout, RoofLayoutInput, RoofLayoutResult, RoofObstruction, SetbackRules,
    INSTALL_COST_PER_WATT,
};
use crate::production::solar_metrics::{
    calculate_solar_metrics, BuildingProfile, EnergyData, SiteAddress, SolarCalculationResult,
    SolarMetricsInput, SolarSystemSpecs,
};
use crate::providers::{
    BuildingInsightsProvider, EiaClient, EnergyDataProvider, FacilityCostProvider,
    FacilityLocation, GoogleSolarClient, PerplexityClient,
};
use crate::rates::details::EnergyRateDetails;
use crate::types::{
    with_metadata, ComputationOutput, GeoPoint, Kwh, Money, Percent, Sourced, SQ_FT_PER_SQ_M,
    ANNUAL_YIELD_PER_KW,
};
use crate::SolarResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

fn default_panel_width() -> Decimal {
    dec!(3.2)
}

fn default_panel_height() -> Decimal {
    dec!(5.5)
}

fn default_degradation() -> Percent {
    dec!(0.5)
}

fn default_target_payback() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub location: GeoPoint,
    /// Organization name used for the facility cost lookup; defaults to the
    /// building name
    #[serde(default)]
    pub organization: Option<String>,
    /// Replaces the address returned with the building insights
    #[serde(default)]
    pub address: Option<SiteAddress>,
    #[serde(default = "default_panel_width")]
    pub panel_width_ft: Decimal,
    #[serde(default = "default_panel_height")]
    pub panel_height_ft: Decimal,
    #[serde(default)]
    pub obstructions: Vec<RoofObstruction>,
    #[serde(default)]
    pub setback_rules: SetbackRules,
    #[serde(default)]
    pub financing_terms: Option<FinancingTerms>,
    /// First-year production; capacity × 1400 kWh/kW when absent
    #[serde(default)]
    pub annual_production_kwh: Option<Kwh>,
    /// Overrides the escalation found with the rate details
    #[serde(default)]
    pub rate_escalation_pct: Option<Percent>,
    #[serde(default = "default_degradation")]
    pub panel_degradation_pct: Percent,
    #[serde(default = "default_target_payback")]
    pub target_payback_years: u32,
}

impl AssessmentRequest {
    pub fn at(location: GeoPoint) -> Self {
        Self {
            location,
            organization: None,
            address: None,
            panel_width_ft: default_panel_width(),
            panel_height_ft: default_panel_height(),
            obstructions: Vec::new(),
            setback_rules: SetbackRules::default(),
            financing_terms: None,
            annual_production_kwh: None,
            rate_escalation_pct: None,
            panel_degradation_pct: default_degradation(),
            target_payback_years: default_target_payback(),
        }
    }
}

/// The external sources an assessment reads from.
pub struct Providers<'a> {
    pub building: &'a dyn BuildingInsightsProvider,
    pub energy: &'a dyn EnergyDataProvider,
    pub facility: &'a dyn FacilityCostProvider,
}

/// HTTP-backed providers built from configuration.
pub struct LiveProviders {
    pub google_solar: GoogleSolarClient,
    pub eia: EiaClient,
    pub perplexity: PerplexityClient,
}

impl LiveProviders {
    pub fn from_config(config: &SolarConfig) -> SolarResult<Self> {
        Ok(Self {
            google_solar: GoogleSolarClient::new(&config.google_solar, &config.http)?,
            eia: EiaClient::new(&config.eia, &config.http)?,
            perplexity: PerplexityClient::new(&config.perplexity, &config.http)?,
        })
    }

    pub fn providers(&self) -> Providers<'_> {
        Providers {
            building: &self.google_solar,
            energy: &self.eia,
            facility: &self.perplexity,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DataQuality {
    Live,
    Degraded { reason: String },
}

impl<T> From<&Sourced<T>> for DataQuality {
    fn from(sourced: &Sourced<T>) -> Self {
        match sourced.degradation_reason() {
            None => DataQuality::Live,
            Some(reason) => DataQuality::Degraded {
                reason: reason.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeasibilityReport {
    pub building: BuildingProfile,
    pub layout: RoofLayoutResult,
    pub energy_data: EnergyData,
    pub solar_metrics: SolarCalculationResult,
    pub rate_details: EnergyRateDetails,
    pub financial: FinancialMetrics,
    pub sizing: SizingOutput,
    pub facility_annual_cost: Money,
    pub data_quality: BTreeMap<String, DataQuality>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub async fn assess_site(
    request: &AssessmentRequest,
    providers: &Providers<'_>,
    config: &SolarConfig,
) -> SolarResult<ComputationOutput<FeasibilityReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let mut data_quality: BTreeMap<String, DataQuality> = BTreeMap::new();

    // Building insights
    info!(
        latitude = %request.location.latitude,
        longitude = %request.location.longitude,
        "assessing site"
    );
    let mut building = providers
        .building
        .building_insights(request.location)
        .await?;
    if let Some(address) = &request.address {
        building.address = address.clone();
    }
    data_quality.insert("building_insights".into(), DataQuality::Live);

    let state = building.address.state.clone();
    if state.trim().is_empty() {
        return Err(SolarError::invalid(
            "address.state",
            "State is required for regional energy data",
        ));
    }
    let county = building.address.county.clone();

    // Roof layout
    let layout = calculate_layout(&RoofLayoutInput {
        roof_area_sq_ft: building.roof_area_m2 * SQ_FT_PER_SQ_M,
        panel_width_ft: request.panel_width_ft,
        panel_height_ft: request.panel_height_ft,
        panel_capacity_watts: building.panel_capacity_watts,
        obstructions: request.obstructions.clone(),
        setback_rules: request.setback_rules.clone(),
    })?;
    warnings.extend(layout.warnings.iter().map(|w| format!("Roof layout: {w}")));
    let layout = layout.result;
    info!(panels = layout.max_panel_count, capacity_kw = %layout.total_capacity_kw, "roof layout done");

    if layout.max_panel_count == 0 {
        return Err(SolarError::InsufficientData(
            "No panels fit on the roof after setbacks and obstructions".into(),
        ));
    }

    // Regional energy data and facility metrics
    let energy = providers.energy.energy_data(&state).await;
    record(&mut data_quality, &mut warnings, "energy_data", &energy);
    let energy = energy.into_inner();

    let metrics = calculate_solar_metrics(&SolarMetricsInput {
        building: building.clone(),
        energy: energy.clone(),
        specs: SolarSystemSpecs::default(),
    })?;
    warnings.extend(metrics.warnings.iter().map(|w| format!("Solar metrics: {w}")));
    let solar_metrics = metrics.result;

    // Rates
    let rate_details = providers.energy.rate_details(&state, county.as_deref()).await;
    record(&mut data_quality, &mut warnings, "rate_details", &rate_details);
    let rate_details = rate_details.into_inner();
    let escalation = request
        .rate_escalation_pct
        .unwrap_or(rate_details.escalation_rate);

    // Cash flow
    let annual_production = request
        .annual_production_kwh
        .unwrap_or(layout.total_capacity_kw * ANNUAL_YIELD_PER_KW);
    let params = FinancialParameters {
        system_cost: layout.installation_cost_usd,
        system_capacity_kw: layout.total_capacity_kw,
        annual_production_kwh: annual_production,
        electricity_rate: rate_details.total_rate,
        rate_escalation_pct: escalation,
        panel_degradation_pct: request.panel_degradation_pct,
        financing_terms: request.financing_terms.clone(),
        bill_components: Some(rate_details.components.clone()),
    };
    let financial = compute_metrics(&params, &config.analysis)?;
    warnings.extend(financial.warnings.iter().map(|w| format!("Cash flow: {w}")));
    let financial = financial.result;
    info!(
        payback_years = financial.payback_period_years,
        npv = %financial.npv_25_year,
        "cash-flow analysis done"
    );

    // Sizing
    let sizing = optimal_system_size(&SizingInput {
        target_payback_years: request.target_payback_years,
        electricity_rate: rate_details.total_rate,
        annual_consumption_kwh: solar_metrics.facility_monthly_consumption_kwh * dec!(12),
        cost_per_watt: INSTALL_COST_PER_WATT,
        rate_escalation_pct: escalation,
    })?;
    warnings.extend(sizing.warnings.iter().map(|w| format!("Sizing: {w}")));
    let sizing = sizing.result;

    // Facility cost estimate
    let location = FacilityLocation {
        organization: request
            .organization
            .clone()
            .unwrap_or_else(|| building.name.clone()),
        city: building.address.city.clone(),
        county: county.unwrap_or_default(),
        state,
    };
    let facility_cost = providers.facility.annual_facility_cost(&location).await;
    record(&mut data_quality, &mut warnings, "facility_cost", &facility_cost);

    let report = FeasibilityReport {
        building,
        layout,
        energy_data: energy,
        solar_metrics,
        rate_details,
        financial,
        sizing,
        facility_annual_cost: facility_cost.into_inner(),
        data_quality,
    };

    Ok(with_metadata(
        "Site assessment: building insights, roof layout, EIA energy data, \
         cash-flow ledger and payback-driven sizing",
        request,
        warnings,
        start.elapsed().as_micros() as u64,
        report,
    ))
}

fn record<T>(
    data_quality: &mut BTreeMap<String, DataQuality>,
    warnings: &mut Vec<String>,
    key: &str,
    sourced: &Sourced<T>,
) {
    if let Some(reason) = sourced.degradation_reason() {
        warnings.push(format!("Using default {key}: {reason}"));
    }
    data_quality.insert(key.to_string(), DataQuality::from(sourced));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::eia::fallback_energy_data;
    use crate::rates::details::fallback_rate_details;
    use async_trait::async_trait;

    struct FakeBuilding(Option<BuildingProfile>);

    #[async_trait]
    impl BuildingInsightsProvider for FakeBuilding {
        async fn building_insights(&self, _location: GeoPoint) -> SolarResult<BuildingProfile> {
            self.0.clone().ok_or_else(|| SolarError::Provider {
                provider: "fake".into(),
                reason: "no building".into(),
            })
        }
    }

    struct FakeEnergy {
        degraded: bool,
    }

    #[async_trait]
    impl EnergyDataProvider for FakeEnergy {
        async fn energy_data(&self, _state: &str) -> Sourced<EnergyData> {
            if self.degraded {
                Sourced::degraded(fallback_energy_data(), "offline")
            } else {
                Sourced::live(EnergyData {
                    electricity_rate: dec!(0.18),
                    consumption_benchmark: dec!(1.1),
                    sun_hours_per_day: dec!(5.5),
                })
            }
        }

        async fn rate_details(&self, _state: &str, _county: Option<&str>) -> Sourced<EnergyRateDetails> {
            let details = fallback_rate_details(2026);
            if self.degraded {
                Sourced::degraded(details, "offline")
            } else {
                Sourced::live(details)
            }
        }
    }

    struct FakeFacility;

    #[async_trait]
    impl FacilityCostProvider for FakeFacility {
        async fn annual_facility_cost(&self, location: &FacilityLocation) -> Sourced<Money> {
            assert_eq!(location.state, "CA");
            Sourced::live(dec!(250000))
        }
    }

    fn warehouse() -> BuildingProfile {
        BuildingProfile {
            name: "buildings/warehouse".into(),
            roof_area_m2: dec!(2000),
            building_area_m2: None,
            panel_capacity_watts: dec!(400),
            address: SiteAddress {
                city: "Fresno".into(),
                state: "CA".into(),
                county: None,
            },
            industry: Some("Logistics".into()),
        }
    }

    fn request() -> AssessmentRequest {
        AssessmentRequest::at(GeoPoint {
            latitude: dec!(36.7),
            longitude: dec!(-119.8),
        })
    }

    #[tokio::test]
    async fn test_live_assessment() {
        let building = FakeBuilding(Some(warehouse()));
        let energy = FakeEnergy { degraded: false };
        let providers = Providers {
            building: &building,
            energy: &energy,
            facility: &FakeFacility,
        };

        let out = assess_site(&request(), &providers, &SolarConfig::default())
            .await
            .unwrap();
        let report = out.result;

        assert!(report.layout.max_panel_count > 0);
        assert_eq!(report.financial.cash_flow.len(), 25);
        assert_eq!(
            report.financial.cash_flow[0].energy_production_kwh,
            report.layout.total_capacity_kw * dec!(1400)
        );
        assert_eq!(report.facility_annual_cost, dec!(250000));
        assert!(report
            .data_quality
            .values()
            .all(|q| *q == DataQuality::Live));
        assert!(report.sizing.optimal_size_kw <= report.sizing.max_size_kw);
    }

    #[tokio::test]
    async fn test_degraded_inputs_are_flagged() {
        let building = FakeBuilding(Some(warehouse()));
        let energy = FakeEnergy { degraded: true };
        let providers = Providers {
            building: &building,
            energy: &energy,
            facility: &FakeFacility,
        };

        let out = assess_site(&request(), &providers, &SolarConfig::default())
            .await
            .unwrap();

        assert!(matches!(
            out.result.data_quality.get("energy_data"),
            Some(DataQuality::Degraded { .. })
        ));
        assert!(matches!(
            out.result.data_quality.get("rate_details"),
            Some(DataQuality::Degraded { .. })
        ));
        assert_eq!(out.result.energy_data.electricity_rate, dec!(0.11));
        assert!(out.warnings.iter().any(|w| w.starts_with("Using default energy_data")));
    }

    #[tokio::test]
    async fn test_building_failure_propagates() {
        let building = FakeBuilding(None);
        let energy = FakeEnergy { degraded: false };
        let providers = Providers {
            building: &building,
            energy: &energy,
            facility: &FakeFacility,
        };

        let err = assess_site(&request(), &providers, &SolarConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SolarError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_production_override() {
        let building = FakeBuilding(Some(warehouse()));
        let energy = FakeEnergy { degraded: false };
        let providers = Providers {
            building: &building,
            energy: &energy,
            facility: &FakeFacility,
        };
        let mut req = request();
        req.annual_production_kwh = Some(dec!(123456));

        let out = assess_site(&req, &providers, &SolarConfig::default())
            .await
            .unwrap();
        assert_eq!(
            out.result.financial.cash_flow[0].energy_production_kwh,
            dec!(123456)
        );
    }
}
