use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Percent, Rate, MAX_ANALYSIS_YEARS};

/// National default annual electricity-rate escalation (percent)
pub const NATIONAL_ESCALATION_PCT: Decimal = dec!(4.23);

/// Rate used when no upstream rate data is available ($/kWh)
pub const FALLBACK_RATE: Rate = dec!(0.12);

/// Annual escalation reference data: a national default plus overrides
/// keyed by `"{county}, {state}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEscalationTable {
    pub national_pct: Percent,
    pub county: BTreeMap<String, Percent>,
}

impl Default for RateEscalationTable {
    fn default() -> Self {
        let county = [
            ("Los Angeles County, CA", dec!(5.2)),
            ("Cook County, IL", dec!(4.8)),
            ("King County, WA", dec!(3.9)),
            ("Harris County, TX", dec!(3.7)),
            ("Maricopa County, AZ", dec!(4.5)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            national_pct: NATIONAL_ESCALATION_PCT,
            county,
        }
    }
}

impl RateEscalationTable {
    /// County override when one exists for `"{county}, {state}"`, otherwise
    /// the national default.
    pub fn escalation_for(&self, county: Option<&str>, state: &str) -> Percent {
        county
            .and_then(|c| self.county.get(&format!("{c}, {state}")))
            .copied()
            .unwrap_or(self.national_pct)
    }
}

/// One projected year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedRate {
    pub year: i32,
    pub rate: Rate,
}

/// Project `current_rate` forward with compound annual escalation.
///
/// Offset `i` (0 = `start_year`) gets `current_rate × (1 + pct/100)^i`.
/// Never fails: `years` is capped at [`MAX_ANALYSIS_YEARS`], escalation
/// below -100% is treated as a collapse to zero, and a rate that outgrows
/// the decimal range saturates at `Decimal::MAX`.
pub fn project_rates(
    current_rate: Rate,
    escalation_pct: Percent,
    start_year: i32,
    years: u32,
) -> Vec<ProjectedRate> {
    let growth = (Decimal::ONE + escalation_pct / dec!(100)).max(Decimal::ZERO);
    let saturated = if current_rate.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    };

    (0..years.min(MAX_ANALYSIS_YEARS))
        .map(|i| ProjectedRate {
            year: start_year.saturating_add(i as i32),
            rate: growth
                .checked_powi(i as i64)
                .and_then(|factor| current_rate.checked_mul(factor))
                .unwrap_or(saturated),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_county_override() {
        let table = RateEscalationTable::default();
        assert_eq!(table.escalation_for(Some("Cook County"), "IL"), dec!(4.8));
        assert_eq!(
            table.escalation_for(Some("Los Angeles County"), "CA"),
            dec!(5.2)
        );
    }

    #[test]
    fn test_unknown_county_falls_back_to_national() {
        let table = RateEscalationTable::default();
        assert_eq!(
            table.escalation_for(Some("Cook County"), "WA"),
            NATIONAL_ESCALATION_PCT
        );
        assert_eq!(table.escalation_for(None, "IL"), NATIONAL_ESCALATION_PCT);
    }

    #[test]
    fn test_first_year_is_current_rate() {
        let projected = project_rates(dec!(0.15), dec!(4.23), 2026, 25);
        assert_eq!(projected.len(), 25);
        assert_eq!(projected[0].year, 2026);
        assert_eq!(projected[0].rate, dec!(0.15));
        assert_eq!(projected[24].year, 2050);
    }

    #[test]
    fn test_compounding() {
        let projected = project_rates(dec!(0.10), dec!(10), 2026, 3);
        assert_eq!(projected[1].rate, dec!(0.11));
        assert_eq!(projected[2].rate, dec!(0.121));
    }

    #[test]
    fn test_zero_years_is_empty() {
        assert!(project_rates(dec!(0.12), dec!(4.23), 2026, 0).is_empty());
    }

    #[test]
    fn test_long_projection_is_capped() {
        let projected = project_rates(dec!(0.12), dec!(4.23), 2026, 2000);
        assert_eq!(projected.len(), MAX_ANALYSIS_YEARS as usize);
        assert!(projected.windows(2).all(|w| w[1].rate >= w[0].rate));
    }

    #[test]
    fn test_runaway_escalation_saturates() {
        let projected = project_rates(dec!(0.12), dec!(10000), 2026, 30);
        assert_eq!(projected.len(), 30);
        assert_eq!(projected[29].rate, Decimal::MAX);
        assert!(projected.windows(2).all(|w| w[1].rate >= w[0].rate));
    }

    #[test]
    fn test_escalation_below_minus_100_collapses_to_zero() {
        let projected = project_rates(dec!(0.12), dec!(-250), 2026, 3);
        assert_eq!(projected[0].rate, dec!(0.12));
        assert_eq!(projected[1].rate, Decimal::ZERO);
        assert_eq!(projected[2].rate, Decimal::ZERO);
    }
}
