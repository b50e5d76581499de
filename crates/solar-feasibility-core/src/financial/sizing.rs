use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarError;
use crate::rates::escalation::NATIONAL_ESCALATION_PCT;
use crate::time_value::{checked_add, checked_div, checked_mul, checked_pow};
use crate::types::{
    with_metadata, ComputationOutput, Kw, Kwh, Money, Percent, Rate, ANNUAL_YIELD_PER_KW,
    MAX_ANALYSIS_YEARS,
};
use crate::SolarResult;

fn default_escalation() -> Percent {
    NATIONAL_ESCALATION_PCT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingInput {
    pub target_payback_years: u32,
    /// Current electricity rate ($/kWh)
    pub electricity_rate: Rate,
    pub annual_consumption_kwh: Kwh,
    /// Installed cost per watt ($/W)
    pub cost_per_watt: Money,
    #[serde(default = "default_escalation")]
    pub rate_escalation_pct: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingOutput {
    /// Recommended size after the 100%-offset cap
    pub optimal_size_kw: Kw,
    pub uncapped_size_kw: Kw,
    /// Size that offsets all annual consumption
    pub max_size_kw: Kw,
    /// Mean escalated rate over the payback horizon
    pub average_rate: Rate,
    pub capped: bool,
}

/// Size a system so its savings recover the per-kW investment within the
/// target payback period, never exceeding full consumption offset.
pub fn optimal_system_size(input: &SizingInput) -> SolarResult<ComputationOutput<SizingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let years = input.target_payback_years;
    let growth = Decimal::ONE + input.rate_escalation_pct / dec!(100);
    let mut factor_sum = Decimal::ZERO;
    for i in 0..years {
        let factor = checked_pow(growth, i, "rate_escalation_pct")?;
        factor_sum = checked_add(factor_sum, factor, "rate_escalation_pct")?;
    }
    let average_factor = factor_sum / Decimal::from(years);
    let average_rate = checked_mul(input.electricity_rate, average_factor, "electricity_rate")?;

    if average_rate.is_zero() {
        return Err(SolarError::DivisionByZero {
            context: "average electricity rate over payback horizon".into(),
        });
    }

    let required_savings =
        checked_mul(input.cost_per_watt, dec!(1000), "cost_per_watt")? / Decimal::from(years);
    let required_production = checked_div(required_savings, average_rate, "cost_per_watt")?;
    let uncapped_size_kw = required_production / ANNUAL_YIELD_PER_KW;
    let max_size_kw = input.annual_consumption_kwh / ANNUAL_YIELD_PER_KW;

    let capped = uncapped_size_kw > max_size_kw;
    let optimal_size_kw = if capped {
        warnings.push(format!(
            "Recommended size capped at 100% offset ({max_size_kw} kW); \
             payback target alone suggests {uncapped_size_kw} kW"
        ));
        max_size_kw
    } else {
        uncapped_size_kw
    };

    tracing::debug!(optimal_kw = %optimal_size_kw, capped, "sized solar system");

    let output = SizingOutput {
        optimal_size_kw,
        uncapped_size_kw,
        max_size_kw,
        average_rate,
        capped,
    };

    Ok(with_metadata(
        "Payback-driven sizing at 1400 kWh/kW/yr, capped at consumption offset",
        input,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

fn validate_input(input: &SizingInput) -> SolarResult<()> {
    if input.target_payback_years == 0 || input.target_payback_years > MAX_ANALYSIS_YEARS {
        return Err(SolarError::invalid(
            "target_payback_years",
            format!("Target payback must be between 1 and {MAX_ANALYSIS_YEARS} years"),
        ));
    }
    if input.electricity_rate <= Decimal::ZERO {
        return Err(SolarError::invalid(
            "electricity_rate",
            "Electricity rate must be positive",
        ));
    }
    if input.annual_consumption_kwh < Decimal::ZERO {
        return Err(SolarError::invalid(
            "annual_consumption_kwh",
            "Annual consumption cannot be negative",
        ));
    }
    if input.cost_per_watt <= Decimal::ZERO {
        return Err(SolarError::invalid("cost_per_watt", "Cost per watt must be positive"));
    }
    if input.rate_escalation_pct <= dec!(-100) {
        return Err(SolarError::invalid(
            "rate_escalation_pct",
            "Rate escalation must be greater than -100%",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(years: u32, consumption: Kwh) -> SizingInput {
        SizingInput {
            target_payback_years: years,
            electricity_rate: dec!(0.12),
            annual_consumption_kwh: consumption,
            cost_per_watt: dec!(2.85),
            rate_escalation_pct: Decimal::ZERO,
        }
    }

    #[test]
    fn test_flat_rate_average_equals_rate() {
        let out = optimal_system_size(&input(10, dec!(1000000))).unwrap().result;
        assert_eq!(out.average_rate, dec!(0.12));
        // 2850 / 10 = 285 $/yr; 285 / 0.12 = 2375 kWh; / 1400
        assert_eq!(out.uncapped_size_kw, dec!(2375) / dec!(1400));
        assert!(!out.capped);
    }

    #[test]
    fn test_escalation_raises_average_rate() {
        let mut sizing = input(10, dec!(1000000));
        sizing.rate_escalation_pct = dec!(4.23);
        let out = optimal_system_size(&sizing).unwrap().result;
        assert!(out.average_rate > dec!(0.12));
    }

    #[test]
    fn test_never_exceeds_full_offset() {
        for years in [1u32, 5, 20] {
            for consumption in [dec!(0), dec!(100), dec!(5000)] {
                let out = optimal_system_size(&input(years, consumption)).unwrap();
                assert!(out.result.optimal_size_kw <= consumption / dec!(1400));
            }
        }
    }

    #[test]
    fn test_cap_emits_warning() {
        let out = optimal_system_size(&input(1, dec!(1400))).unwrap();
        assert!(out.result.capped);
        assert_eq!(out.result.optimal_size_kw, Decimal::ONE);
        assert!(out.warnings.iter().any(|w| w.contains("capped")));
    }

    #[test]
    fn test_escalation_defaults_when_missing() {
        let json = r#"{
            "target_payback_years": 8,
            "electricity_rate": "0.15",
            "annual_consumption_kwh": "20000",
            "cost_per_watt": "2.85"
        }"#;
        let parsed: SizingInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.rate_escalation_pct, dec!(4.23));
    }

    #[test]
    fn test_zero_payback_rejected() {
        assert!(optimal_system_size(&input(0, dec!(1000))).is_err());
    }

    #[test]
    fn test_overlong_payback_rejected() {
        let err = optimal_system_size(&input(2000, dec!(1000))).unwrap_err();
        assert!(matches!(err, SolarError::InvalidInput { ref field, .. } if field == "target_payback_years"));
    }

    #[test]
    fn test_longest_payback_with_national_escalation() {
        let mut sizing = input(MAX_ANALYSIS_YEARS, dec!(5000));
        sizing.rate_escalation_pct = dec!(4.23);
        let out = optimal_system_size(&sizing).unwrap().result;
        assert!(out.optimal_size_kw <= dec!(5000) / dec!(1400));
    }

    #[test]
    fn test_runaway_escalation_is_an_error() {
        let mut sizing = input(MAX_ANALYSIS_YEARS, dec!(5000));
        sizing.rate_escalation_pct = dec!(10000);
        let err = optimal_system_size(&sizing).unwrap_err();
        assert!(matches!(err, SolarError::InvalidInput { ref field, .. } if field == "rate_escalation_pct"));
    }
}
