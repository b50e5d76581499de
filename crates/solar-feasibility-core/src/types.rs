use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values (USD). Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%) or unit prices ($/kWh).
pub type Rate = Decimal;

/// Percentages as written by users (4.23 = 4.23%).
pub type Percent = Decimal;

/// Energy in kilowatt-hours
pub type Kwh = Decimal;

/// Power in kilowatts
pub type Kw = Decimal;

/// Area in square feet
pub type SqFt = Decimal;

/// Square feet per square meter, used wherever provider data arrives in m².
pub const SQ_FT_PER_SQ_M: Decimal = rust_decimal_macros::dec!(10.764);

/// Assumed annual yield per installed kW (kWh/kW/year)
pub const ANNUAL_YIELD_PER_KW: Kwh = rust_decimal_macros::dec!(1400);

/// Longest period, in years, any ledger, loan, payback target or rate
/// projection may span
pub const MAX_ANALYSIS_YEARS: u32 = 100;

/// Geographic position (WGS84 degrees)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

/// A value obtained from an external provider.
///
/// `Degraded` means the fetch failed and `value` holds the documented
/// conservative default instead of real data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Sourced<T> {
    Live { value: T },
    Degraded { value: T, reason: String },
}

impl<T> Sourced<T> {
    pub fn live(value: T) -> Self {
        Sourced::Live { value }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Sourced::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Sourced::Live { value } | Sourced::Degraded { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Sourced::Live { value } | Sourced::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Sourced::Degraded { .. })
    }

    pub fn degradation_reason(&self) -> Option<&str> {
        match self {
            Sourced::Live { .. } => None,
            Sourced::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        match self {
            Sourced::Live { value } => Sourced::Live { value: f(value) },
            Sourced::Degraded { value, reason } => Sourced::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sourced_exposes_value_either_way() {
        let live = Sourced::live(dec!(0.14));
        let degraded = Sourced::degraded(dec!(0.12), "timeout");

        assert_eq!(*live.value(), dec!(0.14));
        assert_eq!(*degraded.value(), dec!(0.12));
        assert!(!live.is_degraded());
        assert!(degraded.is_degraded());
        assert_eq!(degraded.degradation_reason(), Some("timeout"));
    }

    #[test]
    fn test_sourced_serializes_with_tag() {
        let degraded = Sourced::degraded(5u32, "no data");
        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["source"], "degraded");
        assert_eq!(json["value"], 5);
        assert_eq!(json["reason"], "no data");
    }

    #[test]
    fn test_sourced_map_keeps_reason() {
        let mapped = Sourced::degraded(dec!(12), "fallback").map(|c| c / dec!(100));
        assert_eq!(mapped.degradation_reason(), Some("fallback"));
        assert_eq!(mapped.into_inner(), dec!(0.12));
    }
}
