use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

/// Tilt (degrees from horizontal) treated as ideal at mid latitudes
pub const OPTIMAL_TILT_DEG: Decimal = dec!(35);

/// Lower bound on the yield factor
pub const MIN_YIELD_FACTOR: Decimal = dec!(0.6);

const AZIMUTH_WEIGHT: Decimal = dec!(0.7);
const TILT_WEIGHT: Decimal = dec!(0.3);

fn to_radians(degrees: Decimal) -> Decimal {
    degrees * Decimal::PI / dec!(180)
}

/// Yield adjustment for a panel plane, 1.0 being a south-facing panel at
/// the optimal tilt.
///
/// `orientation_deg` is a compass azimuth (0 = north, 90 = east,
/// 180 = south, 270 = west) and may be any value; it is normalized into
/// [0, 360) first.
pub fn orientation_yield_factor(orientation_deg: Decimal, tilt_deg: Decimal) -> Decimal {
    let normalized = ((orientation_deg % dec!(360)) + dec!(360)) % dec!(360);

    let azimuth_factor = to_radians(normalized - dec!(180)).cos();
    let tilt_factor = to_radians(tilt_deg - OPTIMAL_TILT_DEG).cos();

    let combined = azimuth_factor * AZIMUTH_WEIGHT + tilt_factor * TILT_WEIGHT;
    combined.max(MIN_YIELD_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < dec!(0.000001)
    }

    #[test]
    fn test_south_at_optimal_tilt_is_unity() {
        assert!(close(orientation_yield_factor(dec!(180), dec!(35)), Decimal::ONE));
    }

    #[test]
    fn test_north_hits_floor() {
        assert_eq!(orientation_yield_factor(dec!(0), dec!(35)), dec!(0.6));
    }

    #[test]
    fn test_orientation_is_normalized() {
        let base = orientation_yield_factor(dec!(180), dec!(20));
        assert!(close(orientation_yield_factor(dec!(540), dec!(20)), base));
        assert!(close(orientation_yield_factor(dec!(-180), dec!(20)), base));
    }

    #[test]
    fn test_east_west_symmetric() {
        let east = orientation_yield_factor(dec!(135), dec!(35));
        let west = orientation_yield_factor(dec!(225), dec!(35));
        assert!(close(east, west));
        // 0.7 * cos(45deg) + 0.3
        assert!(close(east, dec!(0.794974746830583)));
    }

    #[test]
    fn test_tilt_penalty() {
        let flat = orientation_yield_factor(dec!(180), dec!(0));
        assert!(flat < Decimal::ONE);
        assert!(flat > dec!(0.9));
    }
}
