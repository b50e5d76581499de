use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::bill::BillComponents;
use super::escalation::{
    project_rates, ProjectedRate, RateEscalationTable, FALLBACK_RATE, NATIONAL_ESCALATION_PCT,
};
use crate::types::{Percent, Rate};

/// Years of projected rates carried in rate details
pub const PROJECTION_YEARS: u32 = 25;

/// Monthly decline applied to synthetic history when real data is missing
const SYNTHETIC_MONTHLY_DECLINE: Decimal = dec!(0.005);

/// Regional average as a share of the local rate when real data is missing
const SYNTHETIC_REGIONAL_SHARE: Decimal = dec!(0.95);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRate {
    /// Period label, `YYYY-MM`
    pub date: String,
    pub rate: Rate,
}

/// Everything known about a location's electricity pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRateDetails {
    pub total_rate: Rate,
    pub components: BillComponents,
    pub historical_rates: Vec<HistoricalRate>,
    pub projected_rates: Vec<ProjectedRate>,
    pub regional_average: Rate,
    pub escalation_rate: Percent,
}

/// Assemble rate details from fetched data. `current_rate` is $/kWh.
pub fn build_rate_details(
    current_rate: Rate,
    historical_rates: Vec<HistoricalRate>,
    regional_average: Rate,
    county: Option<&str>,
    state: &str,
    table: &RateEscalationTable,
    base_year: i32,
) -> EnergyRateDetails {
    let escalation_rate = table.escalation_for(county, state);
    EnergyRateDetails {
        total_rate: current_rate,
        components: BillComponents::from_total_rate(current_rate),
        historical_rates,
        projected_rates: project_rates(current_rate, escalation_rate, base_year, PROJECTION_YEARS),
        regional_average,
        escalation_rate,
    }
}

/// Conservative details used when the rate source cannot be reached.
pub fn fallback_rate_details(base_year: i32) -> EnergyRateDetails {
    let rate = FALLBACK_RATE;
    let historical_rates = (0..12u32)
        .map(|i| HistoricalRate {
            date: format!("{}-{:02}", base_year - 1, 12 - i),
            rate: rate * (Decimal::ONE - Decimal::from(i) * SYNTHETIC_MONTHLY_DECLINE),
        })
        .collect();

    EnergyRateDetails {
        total_rate: rate,
        components: BillComponents::from_total_rate(rate),
        historical_rates,
        projected_rates: project_rates(rate, NATIONAL_ESCALATION_PCT, base_year, PROJECTION_YEARS),
        regional_average: rate * SYNTHETIC_REGIONAL_SHARE,
        escalation_rate: NATIONAL_ESCALATION_PCT,
    }
}
