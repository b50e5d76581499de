use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarError;
use crate::types::{
    with_metadata, ComputationOutput, Kw, Kwh, Money, Rate, SqFt, ANNUAL_YIELD_PER_KW,
    SQ_FT_PER_SQ_M,
};
use crate::SolarResult;

/// Share of modelled consumption kept after efficiency measures
const CONSUMPTION_FACTOR: Decimal = dec!(0.85);
/// Uplift on the energy bill for demand charges
const DEMAND_CHARGE_UPLIFT: Decimal = dec!(1.2);
/// Share of the month the array is producing
const AVAILABILITY: Decimal = dec!(0.95);
const DAYS_PER_MONTH: Decimal = dec!(30);
/// Output retained per month of operation
const MONTHLY_RETENTION: Decimal = dec!(0.996);
/// Payback search window (20 years)
const PAYBACK_WINDOW_MONTHS: u32 = 240;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarSystemSpecs {
    pub panel_area_sq_ft: SqFt,
    pub panel_capacity_kw: Kw,
    /// Share of the roof that can carry panels
    pub roof_usability_factor: Decimal,
    /// Inverter, wiring and soiling losses folded into one factor
    pub system_efficiency: Decimal,
    pub cost_per_watt: Money,
}

impl Default for SolarSystemSpecs {
    fn default() -> Self {
        Self {
            panel_area_sq_ft: dec!(17.6),
            panel_capacity_kw: dec!(0.4),
            roof_usability_factor: dec!(0.7),
            system_efficiency: dec!(0.75),
            cost_per_watt: dec!(2.85),
        }
    }
}

/// Regional energy figures for a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyData {
    /// $/kWh
    pub electricity_rate: Rate,
    /// kWh per sq ft per month
    pub consumption_benchmark: Decimal,
    pub sun_hours_per_day: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteAddress {
    pub city: String,
    /// Two-letter state code
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

impl SiteAddress {
    pub fn short(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

/// What is known about a building from its aerial survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingProfile {
    pub name: String,
    pub roof_area_m2: Decimal,
    /// Floor area; estimated from the roof when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_area_m2: Option<Decimal>,
    /// Rating of the panel model the survey assumed (W)
    pub panel_capacity_watts: Decimal,
    #[serde(default)]
    pub address: SiteAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarMetricsInput {
    pub building: BuildingProfile,
    pub energy: EnergyData,
    #[serde(default)]
    pub specs: SolarSystemSpecs,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityDetails {
    pub facility_name: String,
    pub address: String,
    pub industry: String,
    pub building_area_sq_ft: SqFt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarCalculationResult {
    pub facility_monthly_consumption_kwh: Kwh,
    pub monthly_electricity_cost: Money,
    pub usable_rooftop_area_sq_ft: SqFt,
    pub number_of_solar_panels: u32,
    pub system_capacity_kw: Kw,
    pub monthly_solar_generation_kwh: Kwh,
    pub energy_offset_percentage: Decimal,
    pub monthly_savings: Money,
    pub installation_cost: Money,
    /// Month in which cumulative degraded savings cover the installation;
    /// `None` when that takes longer than 20 years
    pub roi_months: Option<u32>,
    pub details: FacilityDetails,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Facility-level sizing: consumption from floor area, panel count bounded
/// by both roof space and demand, and a monthly payback search.
pub fn calculate_solar_metrics(
    input: &SolarMetricsInput,
) -> SolarResult<ComputationOutput<SolarCalculationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let SolarMetricsInput {
        building,
        energy,
        specs,
    } = input;

    let roof_area = building.roof_area_m2 * SQ_FT_PER_SQ_M;
    let usable_area = roof_area * specs.roof_usability_factor;

    let building_area = match building.building_area_m2 {
        Some(area) => area * SQ_FT_PER_SQ_M,
        None => {
            warnings.push("Building floor area unavailable; estimated as twice the roof area".into());
            roof_area * dec!(2)
        }
    };

    let monthly_consumption = building_area * energy.consumption_benchmark * CONSUMPTION_FACTOR;
    if monthly_consumption.is_zero() {
        return Err(SolarError::invalid(
            "consumption_benchmark",
            "Modelled facility consumption is zero",
        ));
    }
    let monthly_cost = monthly_consumption * energy.electricity_rate * DEMAND_CHARGE_UPLIFT;

    // Panels: whichever runs out first, roof space or demand
    let roof_limit = (usable_area / specs.panel_area_sq_ft).floor();
    let demand_limit =
        (monthly_consumption * dec!(12) / (specs.panel_capacity_kw * ANNUAL_YIELD_PER_KW)).ceil();
    let panels = roof_limit
        .min(demand_limit)
        .to_u32()
        .ok_or_else(|| SolarError::invalid("roof_area_m2", "Panel count exceeds u32 range"))?;
    if roof_limit < demand_limit {
        warnings.push(format!(
            "Roof space limits the array to {panels} panels; demand would support {demand_limit}"
        ));
    }

    let capacity = Decimal::from(panels) * specs.panel_capacity_kw;
    let daily_generation = capacity * energy.sun_hours_per_day * specs.system_efficiency;
    let monthly_generation = daily_generation * DAYS_PER_MONTH * AVAILABILITY;

    let offset_kwh = monthly_generation.min(monthly_consumption);
    let offset_pct = offset_kwh / monthly_consumption * dec!(100);
    let monthly_savings = offset_kwh * energy.electricity_rate;

    let installation_cost = capacity * dec!(1000) * specs.cost_per_watt;
    let roi_months = payback_month(monthly_savings, installation_cost);
    if roi_months.is_none() {
        warnings.push(format!(
            "Savings do not recover the installation cost within {PAYBACK_WINDOW_MONTHS} months"
        ));
    }

    tracing::debug!(
        panels,
        capacity_kw = %capacity,
        offset_pct = %offset_pct,
        "calculated facility solar metrics"
    );

    let output = SolarCalculationResult {
        facility_monthly_consumption_kwh: monthly_consumption,
        monthly_electricity_cost: monthly_cost,
        usable_rooftop_area_sq_ft: usable_area,
        number_of_solar_panels: panels,
        system_capacity_kw: capacity,
        monthly_solar_generation_kwh: monthly_generation,
        energy_offset_percentage: offset_pct,
        monthly_savings,
        installation_cost,
        roi_months,
        details: FacilityDetails {
            facility_name: building.name.clone(),
            address: building.address.short(),
            industry: building
                .industry
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            building_area_sq_ft: building_area,
        },
    };

    Ok(with_metadata(
        "Benchmark consumption, demand-bounded panel count, sun-hour generation, \
         monthly degraded payback",
        input,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

fn payback_month(monthly_savings: Money, installation_cost: Money) -> Option<u32> {
    let mut retention = Decimal::ONE;
    let mut cumulative = Decimal::ZERO;
    for month in 1..=PAYBACK_WINDOW_MONTHS {
        retention *= MONTHLY_RETENTION;
        cumulative += monthly_savings * retention;
        if cumulative >= installation_cost {
            return Some(month);
        }
    }
    None
}

fn validate_input(input: &SolarMetricsInput) -> SolarResult<()> {
    let b = &input.building;
    if b.roof_area_m2 <= Decimal::ZERO {
        return Err(SolarError::invalid("roof_area_m2", "Roof area must be positive"));
    }
    if let Some(area) = b.building_area_m2 {
        if area <= Decimal::ZERO {
            return Err(SolarError::invalid("building_area_m2", "Building area must be positive"));
        }
    }

    let e = &input.energy;
    if e.electricity_rate < Decimal::ZERO {
        return Err(SolarError::invalid("electricity_rate", "Electricity rate cannot be negative"));
    }
    if e.consumption_benchmark <= Decimal::ZERO {
        return Err(SolarError::invalid(
            "consumption_benchmark",
            "Consumption benchmark must be positive",
        ));
    }
    if e.sun_hours_per_day < Decimal::ZERO {
        return Err(SolarError::invalid("sun_hours_per_day", "Sun hours cannot be negative"));
    }

    let s = &input.specs;
    for (field, value) in [
        ("panel_area_sq_ft", s.panel_area_sq_ft),
        ("panel_capacity_kw", s.panel_capacity_kw),
        ("roof_usability_factor", s.roof_usability_factor),
        ("system_efficiency", s.system_efficiency),
        ("cost_per_watt", s.cost_per_watt),
    ] {
        if value <= Decimal::ZERO {
            return Err(SolarError::invalid(field, "Must be positive"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warehouse(rate: Rate) -> SolarMetricsInput {
        SolarMetricsInput {
            building: BuildingProfile {
                name: "Warehouse 7".into(),
                roof_area_m2: dec!(1000),
                building_area_m2: None,
                panel_capacity_watts: dec!(400),
                address: SiteAddress {
                    city: "Fresno".into(),
                    state: "CA".into(),
                    county: None,
                },
                industry: None,
            },
            energy: EnergyData {
                electricity_rate: rate,
                consumption_benchmark: dec!(1),
                sun_hours_per_day: dec!(5),
            },
            specs: SolarSystemSpecs::default(),
        }
    }

    #[test]
    fn test_demand_bounded_sizing() {
        let out = calculate_solar_metrics(&warehouse(dec!(0.10))).unwrap();
        let r = &out.result;

        assert_eq!(r.facility_monthly_consumption_kwh, dec!(18298.8));
        assert_eq!(r.monthly_electricity_cost, dec!(2195.856));
        assert_eq!(r.usable_rooftop_area_sq_ft, dec!(7534.8));
        // roof allows 428, demand needs 393
        assert_eq!(r.number_of_solar_panels, 393);
        assert_eq!(r.system_capacity_kw, dec!(157.2));
        assert_eq!(r.monthly_solar_generation_kwh, dec!(16800.75));
        assert_eq!(r.installation_cost, dec!(448020));
        assert!((r.energy_offset_percentage - dec!(91.8134)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_cheap_power_never_pays_back() {
        let out = calculate_solar_metrics(&warehouse(dec!(0.10))).unwrap();
        assert_eq!(out.result.roi_months, None);
        assert!(out.warnings.iter().any(|w| w.contains("240 months")));
    }

    #[test]
    fn test_expensive_power_pays_back() {
        let out = calculate_solar_metrics(&warehouse(dec!(0.30))).unwrap();
        assert_eq!(out.result.roi_months, Some(111));
    }

    #[test]
    fn test_details_defaults() {
        let out = calculate_solar_metrics(&warehouse(dec!(0.10))).unwrap().result;
        assert_eq!(out.details.address, "Fresno, CA");
        assert_eq!(out.details.industry, "Unknown");
        assert_eq!(out.details.building_area_sq_ft, dec!(21528));
    }

    #[test]
    fn test_offset_capped_at_full() {
        let mut input = warehouse(dec!(0.10));
        input.energy.sun_hours_per_day = dec!(12);
        let out = calculate_solar_metrics(&input).unwrap().result;
        assert_eq!(out.energy_offset_percentage, dec!(100));
    }

    #[test]
    fn test_zero_benchmark_rejected() {
        let mut input = warehouse(dec!(0.10));
        input.energy.consumption_benchmark = Decimal::ZERO;
        assert!(calculate_solar_metrics(&input).is_err());
    }
}
