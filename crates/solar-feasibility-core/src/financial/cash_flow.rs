use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::amortization::{monthly_loan_payment, validate_loan, LoanInput};
use crate::config::AnalysisConfig;
use crate::error::SolarError;
use crate::rates::bill::BillComponents;
use crate::time_value::{bracket_irr, checked_add, checked_div, checked_mul, checked_pow, irr, npv};
use crate::types::{with_metadata, ComputationOutput, Kw, Kwh, Money, Percent, Rate};
use crate::SolarResult;

/// IRR bracket scan bounds (decimal rates). Result precision is one step.
const IRR_SCAN_START: Rate = dec!(0.01);
const IRR_SCAN_END: Rate = dec!(0.25);
const IRR_SCAN_STEP: Rate = dec!(0.0025);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Loan and incentive terms for a financed installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingTerms {
    /// Total loan amount
    pub loan_amount: Money,
    /// Down payment (informational; the ledger starts from the full cost)
    pub down_payment: Money,
    /// Annual interest rate in percent
    pub interest_rate_pct: Percent,
    /// Loan term in years
    pub loan_term_years: u32,
    /// Federal / state / local incentives received up front
    pub incentive_amount: Money,
}

/// Inputs for a single cash-flow analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialParameters {
    /// Total installed system cost
    pub system_cost: Money,
    /// Nameplate capacity in kW
    pub system_capacity_kw: Kw,
    /// First-year production in kWh
    pub annual_production_kwh: Kwh,
    /// Current electricity rate ($/kWh)
    pub electricity_rate: Rate,
    /// Annual rate escalation in percent
    pub rate_escalation_pct: Percent,
    /// Annual panel degradation in percent
    pub panel_degradation_pct: Percent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_terms: Option<FinancingTerms>,
    /// Breakdown of `electricity_rate`; validated against it when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_components: Option<BillComponents>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One ledger row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowYear {
    /// Year number, 1-based
    pub year: u32,
    /// Degraded production (kWh)
    pub energy_production_kwh: Kwh,
    /// Production valued at the escalated rate
    pub energy_savings: Money,
    /// Annual loan service (zero after the term or without financing)
    pub loan_payment: Money,
    pub net_cash_flow: Money,
    pub cumulative_cash_flow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialMetrics {
    /// First year in which cumulative cash flow is positive; the horizon
    /// length when that never happens
    pub payback_period_years: u32,
    pub payback_reached: bool,
    /// Lifetime savings as a percentage of system cost
    pub roi_25_year: Percent,
    /// Net present value at the configured discount rate
    pub npv_25_year: Money,
    /// Bracket-scan IRR in percent, precise to ±0.25
    pub irr_25_year: Percent,
    /// Newton-Raphson IRR in percent on the same flows, when it converges
    pub irr_refined_pct: Option<Percent>,
    /// Levelized cost of energy ($/kWh)
    pub lcoe: Rate,
    pub first_year_savings: Money,
    pub lifetime_savings: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_loan_payment: Option<Money>,
    pub cash_flow: Vec<CashFlowYear>,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Build the year-by-year cash-flow ledger for a solar installation and
/// derive payback, ROI, NPV, IRR and LCOE from it.
pub fn compute_metrics(
    params: &FinancialParameters,
    analysis: &AnalysisConfig,
) -> SolarResult<ComputationOutput<FinancialMetrics>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_params(params)?;
    analysis.validate()?;

    let horizon = analysis.horizon_years;

    // ── Financing ────────────────────────────────────────────────────
    let mut monthly_payment = Decimal::ZERO;
    let mut cumulative = -params.system_cost;

    if let Some(terms) = &params.financing_terms {
        monthly_payment =
            monthly_loan_payment(terms.loan_amount, terms.interest_rate_pct, terms.loan_term_years)?;
        cumulative = checked_add(cumulative, terms.incentive_amount, "incentive_amount")?;

        let financed = checked_add(terms.loan_amount, terms.down_payment, "down_payment")?;
        if financed > params.system_cost {
            warnings.push(format!(
                "Loan plus down payment ({financed}) exceeds system cost ({})",
                params.system_cost
            ));
        }
    }
    let annual_loan_payment = checked_mul(monthly_payment, dec!(12), "loan_amount")?;

    // ── Ledger ───────────────────────────────────────────────────────
    let retention = Decimal::ONE - params.panel_degradation_pct / dec!(100);
    let growth = Decimal::ONE + params.rate_escalation_pct / dec!(100);

    let mut cash_flow: Vec<CashFlowYear> = Vec::with_capacity(horizon as usize);
    let mut total_savings = Decimal::ZERO;
    let mut total_production = Decimal::ZERO;
    let mut payback: Option<u32> = None;

    for year in 1..=horizon {
        let exponent = year - 1;
        let production = checked_mul(
            params.annual_production_kwh,
            checked_pow(retention, exponent, "panel_degradation_pct")?,
            "annual_production_kwh",
        )?;
        let rate = checked_mul(
            params.electricity_rate,
            checked_pow(growth, exponent, "rate_escalation_pct")?,
            "rate_escalation_pct",
        )?;
        let savings = checked_mul(production, rate, "rate_escalation_pct")?;

        let loan_payment = match &params.financing_terms {
            Some(terms) if year <= terms.loan_term_years => annual_loan_payment,
            _ => Decimal::ZERO,
        };

        let net = checked_add(savings, -loan_payment, "rate_escalation_pct")?;
        cumulative = checked_add(cumulative, net, "rate_escalation_pct")?;

        if payback.is_none() && cumulative > Decimal::ZERO {
            payback = Some(year);
        }

        total_savings = checked_add(total_savings, savings, "rate_escalation_pct")?;
        total_production = checked_add(total_production, production, "annual_production_kwh")?;

        cash_flow.push(CashFlowYear {
            year,
            energy_production_kwh: production,
            energy_savings: savings,
            loan_payment,
            net_cash_flow: net,
            cumulative_cash_flow: cumulative,
        });
    }

    if payback.is_none() {
        warnings.push(format!(
            "Cumulative cash flow never turns positive within {horizon} years"
        ));
    }

    // ── Aggregates ───────────────────────────────────────────────────
    // Discounting always starts from the full system cost at t = 0.
    let mut flows: Vec<Money> = Vec::with_capacity(horizon as usize + 1);
    flows.push(-params.system_cost);
    flows.extend(cash_flow.iter().map(|cf| cf.net_cash_flow));

    let roi = checked_mul(
        checked_div(total_savings, params.system_cost, "system_cost")?,
        dec!(100),
        "system_cost",
    )?;
    let project_npv = npv(analysis.discount_rate, &flows)?;

    let scanned = bracket_irr(&flows, IRR_SCAN_START, IRR_SCAN_END, IRR_SCAN_STEP)?;
    if scanned.is_zero() {
        warnings.push(format!(
            "IRR exceeds the {}% scan ceiling; reported as 0",
            IRR_SCAN_END * dec!(100)
        ));
    } else if scanned < IRR_SCAN_START {
        warnings.push(format!(
            "IRR is below the {}% scan floor",
            IRR_SCAN_START * dec!(100)
        ));
    }
    let irr_refined_pct = irr(&flows, dec!(0.10)).ok().map(|r| r * dec!(100));

    if total_production.is_zero() {
        return Err(SolarError::DivisionByZero {
            context: "LCOE lifetime production".into(),
        });
    }
    let lcoe = checked_div(params.system_cost, total_production, "annual_production_kwh")?;

    let first_year_savings = cash_flow
        .first()
        .map(|cf| cf.energy_savings)
        .unwrap_or(Decimal::ZERO);

    let monthly_loan_payment = if monthly_payment > Decimal::ZERO {
        Some(monthly_payment)
    } else {
        None
    };

    tracing::debug!(
        payback_years = payback.unwrap_or(horizon),
        npv = %project_npv,
        lcoe = %lcoe,
        "computed solar cash-flow metrics"
    );

    let output = FinancialMetrics {
        payback_period_years: payback.unwrap_or(horizon),
        payback_reached: payback.is_some(),
        roi_25_year: roi,
        npv_25_year: project_npv,
        irr_25_year: scanned * dec!(100),
        irr_refined_pct,
        lcoe,
        first_year_savings,
        lifetime_savings: total_savings,
        monthly_loan_payment,
        cash_flow,
    };

    Ok(with_metadata(
        "Solar cash-flow ledger with degraded production and escalated rates; \
         NPV at fixed discount rate, IRR by bracket scan",
        params,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

fn validate_params(params: &FinancialParameters) -> SolarResult<()> {
    if params.system_cost <= Decimal::ZERO {
        return Err(SolarError::invalid("system_cost", "System cost must be positive"));
    }
    if params.system_capacity_kw <= Decimal::ZERO {
        return Err(SolarError::invalid(
            "system_capacity_kw",
            "System capacity must be positive",
        ));
    }
    if params.annual_production_kwh <= Decimal::ZERO {
        return Err(SolarError::invalid(
            "annual_production_kwh",
            "Annual production must be positive",
        ));
    }
    if params.electricity_rate < Decimal::ZERO {
        return Err(SolarError::invalid(
            "electricity_rate",
            "Electricity rate cannot be negative",
        ));
    }
    if params.rate_escalation_pct <= dec!(-100) {
        return Err(SolarError::invalid(
            "rate_escalation_pct",
            "Rate escalation must be greater than -100%",
        ));
    }
    if params.panel_degradation_pct < Decimal::ZERO || params.panel_degradation_pct >= dec!(100) {
        return Err(SolarError::invalid(
            "panel_degradation_pct",
            "Panel degradation must be in [0, 100)",
        ));
    }

    if let Some(terms) = &params.financing_terms {
        validate_loan(&LoanInput {
            loan_amount: terms.loan_amount,
            interest_rate_pct: terms.interest_rate_pct,
            loan_term_years: terms.loan_term_years,
        })?;
        if terms.down_payment < Decimal::ZERO {
            return Err(SolarError::invalid("down_payment", "Down payment cannot be negative"));
        }
        if terms.incentive_amount < Decimal::ZERO {
            return Err(SolarError::invalid(
                "incentive_amount",
                "Incentive amount cannot be negative",
            ));
        }
    }

    if let Some(components) = &params.bill_components {
        components.validate(params.electricity_rate)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residential_params() -> FinancialParameters {
        FinancialParameters {
            system_cost: dec!(20000),
            system_capacity_kw: dec!(6),
            annual_production_kwh: dec!(8400),
            electricity_rate: dec!(0.12),
            rate_escalation_pct: dec!(4.23),
            panel_degradation_pct: dec!(0.5),
            financing_terms: None,
            bill_components: None,
        }
    }

    fn run(params: &FinancialParameters) -> ComputationOutput<FinancialMetrics> {
        compute_metrics(params, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_ledger_has_one_row_per_year() {
        let out = run(&residential_params()).result;
        assert_eq!(out.cash_flow.len(), 25);
        for (i, row) in out.cash_flow.iter().enumerate() {
            assert_eq!(row.year, i as u32 + 1);
        }
    }

    #[test]
    fn test_first_year_is_undegraded() {
        let out = run(&residential_params()).result;
        assert_eq!(out.cash_flow[0].energy_production_kwh, dec!(8400));
        assert_eq!(out.first_year_savings, dec!(1008));
    }

    #[test]
    fn test_flat_inputs_give_exact_lifetime_savings() {
        let mut params = residential_params();
        params.rate_escalation_pct = Decimal::ZERO;
        params.panel_degradation_pct = Decimal::ZERO;
        let out = run(&params).result;
        assert_eq!(out.lifetime_savings, dec!(8400) * dec!(0.12) * dec!(25));
    }

    #[test]
    fn test_residential_scenario() {
        let out = run(&residential_params()).result;
        assert_eq!(out.payback_period_years, 16);
        assert!(out.payback_reached);
        assert!(out.lifetime_savings > dec!(20000));
        assert!(out.lcoe > dec!(0.09) && out.lcoe < dec!(0.11));
        assert!((out.roi_25_year - dec!(201.85)).abs() < dec!(0.01));
        assert!((out.npv_25_year - dec!(770.97)).abs() < dec!(0.01));
        assert_eq!(out.irr_25_year, dec!(5.25));
    }

    #[test]
    fn test_refined_irr_inside_bracket() {
        let out = run(&residential_params()).result;
        let refined = out.irr_refined_pct.unwrap();
        assert!(refined >= out.irr_25_year);
        assert!(refined - out.irr_25_year <= dec!(0.25));
    }

    #[test]
    fn test_payback_saturates_at_horizon() {
        let mut params = residential_params();
        params.system_cost = dec!(1000000);
        params.annual_production_kwh = dec!(100);
        let out = run(&params);
        assert_eq!(out.result.payback_period_years, 25);
        assert!(!out.result.payback_reached);
        assert!(out.warnings.iter().any(|w| w.contains("never turns positive")));
    }

    #[test]
    fn test_financing_applies_incentive_and_loan_service() {
        let mut params = residential_params();
        params.financing_terms = Some(FinancingTerms {
            loan_amount: dec!(20000),
            down_payment: Decimal::ZERO,
            interest_rate_pct: dec!(6),
            loan_term_years: 10,
            incentive_amount: dec!(6000),
        });
        let out = run(&params).result;

        let monthly = out.monthly_loan_payment.unwrap();
        assert!((monthly - dec!(222.04)).abs() < dec!(0.01));
        assert_eq!(out.cash_flow[9].loan_payment, monthly * dec!(12));
        assert_eq!(out.cash_flow[10].loan_payment, Decimal::ZERO);

        let year_one = &out.cash_flow[0];
        let expected = dec!(-20000) + dec!(6000) + year_one.energy_savings - monthly * dec!(12);
        assert_eq!(year_one.cumulative_cash_flow, expected);
    }

    #[test]
    fn test_zero_cost_rejected() {
        let mut params = residential_params();
        params.system_cost = Decimal::ZERO;
        let err = compute_metrics(&params, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, SolarError::InvalidInput { ref field, .. } if field == "system_cost"));
    }

    #[test]
    fn test_zero_production_rejected() {
        let mut params = residential_params();
        params.annual_production_kwh = Decimal::ZERO;
        assert!(compute_metrics(&params, &AnalysisConfig::default()).is_err());
    }

    #[test]
    fn test_inconsistent_bill_components_rejected() {
        let mut params = residential_params();
        params.bill_components = Some(BillComponents::from_total_rate(dec!(0.20)));
        assert!(compute_metrics(&params, &AnalysisConfig::default()).is_err());

        params.bill_components = Some(BillComponents::from_total_rate(dec!(0.12)));
        assert!(compute_metrics(&params, &AnalysisConfig::default()).is_ok());
    }

    #[test]
    fn test_discount_rate_comes_from_config() {
        let params = residential_params();
        let low = compute_metrics(
            &params,
            &AnalysisConfig {
                discount_rate: dec!(0.03),
                ..AnalysisConfig::default()
            },
        )
        .unwrap();
        let base = run(&params);
        assert!(low.result.npv_25_year > base.result.npv_25_year);
    }
}
