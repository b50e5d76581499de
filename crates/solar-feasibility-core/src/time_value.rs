use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::SolarError;
use crate::types::{Money, Rate};
use crate::SolarResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Error for arithmetic whose result would leave the decimal range.
pub(crate) fn out_of_range(field: &str) -> SolarError {
    SolarError::invalid(field, "Result exceeds the representable decimal range")
}

pub(crate) fn checked_pow(base: Decimal, exp: u32, field: &str) -> SolarResult<Decimal> {
    base.checked_powi(exp as i64).ok_or_else(|| out_of_range(field))
}

pub(crate) fn checked_mul(a: Decimal, b: Decimal, field: &str) -> SolarResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| out_of_range(field))
}

pub(crate) fn checked_add(a: Decimal, b: Decimal, field: &str) -> SolarResult<Decimal> {
    a.checked_add(b).ok_or_else(|| out_of_range(field))
}

/// Also fails on a zero divisor.
pub(crate) fn checked_div(a: Decimal, b: Decimal, field: &str) -> SolarResult<Decimal> {
    a.checked_div(b).ok_or_else(|| out_of_range(field))
}

/// Net Present Value of a series of cash flows. `cash_flows[0]` is
/// undiscounted (t = 0).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SolarResult<Money> {
    if rate <= dec!(-1) {
        return Err(SolarError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = checked_mul(discount, one_plus_r, "rate")?;
        }
        if discount.is_zero() {
            return Err(SolarError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = checked_add(result, checked_div(*cf, discount, "rate")?, "rate")?;
    }

    Ok(result)
}

/// Coarse IRR bracket search.
///
/// Scans `start, start + step, ...` up to and including `end` and returns
/// the rate one step below the first rate whose NPV is non-positive.
/// Returns zero when NPV stays positive across the whole range. Precision
/// is one `step`.
pub fn bracket_irr(cash_flows: &[Money], start: Rate, end: Rate, step: Rate) -> SolarResult<Rate> {
    if step <= Decimal::ZERO {
        return Err(SolarError::InvalidInput {
            field: "step".into(),
            reason: "Scan step must be positive".into(),
        });
    }

    let mut rate = start;
    while rate <= end {
        if npv(rate, cash_flows)? <= Decimal::ZERO {
            return Ok(rate - step);
        }
        rate += step;
    }

    Ok(Decimal::ZERO)
}

/// Internal Rate of Return using Newton-Raphson
pub fn irr(cash_flows: &[Money], guess: Rate) -> SolarResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(SolarError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let failure = |last_delta: Decimal| SolarError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: i,
            last_delta,
        };

        let (npv_val, dnpv) = npv_and_slope(rate, cash_flows).ok_or_else(|| failure(Decimal::MAX))?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        if dnpv.is_zero() {
            return Err(failure(npv_val));
        }

        let step = npv_val
            .checked_div(dnpv)
            .ok_or_else(|| failure(npv_val))?;
        rate = rate.checked_sub(step).ok_or_else(|| failure(npv_val))?;

        // Guard against divergence
        if rate < dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > dec!(100.0) {
            rate = dec!(100.0);
        }
    }

    Err(SolarError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv(rate, cash_flows).unwrap_or(Decimal::MAX),
    })
}

/// NPV and its derivative with respect to the rate; `None` when a term
/// leaves the decimal range.
fn npv_and_slope(rate: Rate, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let discount = one_plus_r.checked_powi(t as i64)?;
        if discount.is_zero() {
            continue;
        }
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let slope = Decimal::from(t as i64)
                .checked_mul(*cf)?
                .checked_div(discount.checked_mul(one_plus_r)?)?;
            dnpv = dnpv.checked_sub(slope)?;
        }
    }

    Some((npv_val, dnpv))
}

/// Level payment that amortizes `present_value` over `nper` periods at the
/// periodic `rate`. Returned as a positive outflow.
pub fn level_payment(rate: Rate, nper: u32, present_value: Money) -> SolarResult<Money> {
    if nper == 0 {
        return Err(SolarError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(present_value / Decimal::from(nper));
    }

    let factor = checked_pow(Decimal::ONE + rate, nper, "interest_rate_pct")?;
    let denominator = factor - Decimal::ONE;

    if denominator.is_zero() {
        return Err(SolarError::DivisionByZero {
            context: "level payment annuity factor".into(),
        });
    }

    // factor / denominator tends to 1 as factor grows, so divide first
    let growth_ratio = checked_div(factor, denominator, "interest_rate_pct")?;
    let periodic = checked_mul(present_value, rate, "loan_amount")?;
    checked_mul(periodic, growth_ratio, "loan_amount")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_100pct() {
        assert!(npv(dec!(-1), &[dec!(1)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_bracket_irr_within_one_step_of_newton() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let coarse = bracket_irr(&cfs, dec!(0.01), dec!(0.25), dec!(0.0025)).unwrap();
        let exact = irr(&cfs, dec!(0.10)).unwrap();
        assert!(coarse <= exact);
        assert!(exact - coarse <= dec!(0.0025));
    }

    #[test]
    fn test_bracket_irr_zero_when_npv_stays_positive() {
        // Pays back 10x in one year; NPV positive at every scanned rate
        let cfs = vec![dec!(-100), dec!(1000)];
        let result = bracket_irr(&cfs, dec!(0.01), dec!(0.25), dec!(0.0025)).unwrap();
        assert_eq!(result, Decimal::ZERO);
    }

    #[test]
    fn test_level_payment_standard_mortgage() {
        // 20,000 at 6%/12 over 120 months ≈ 222.04
        let pmt = level_payment(dec!(0.005), 120, dec!(20000)).unwrap();
        assert!((pmt - dec!(222.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_level_payment_zero_rate_is_linear() {
        let pmt = level_payment(Decimal::ZERO, 10, dec!(1000)).unwrap();
        assert_eq!(pmt, dec!(100));
    }

    #[test]
    fn test_level_payment_requires_periods() {
        assert!(level_payment(dec!(0.01), 0, dec!(1000)).is_err());
    }
}
