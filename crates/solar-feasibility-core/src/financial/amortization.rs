use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarError;
use crate::time_value::{checked_add, checked_mul, level_payment};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, MAX_ANALYSIS_YEARS};
use crate::SolarResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub loan_amount: Money,
    /// Annual interest rate in percent (6 = 6%)
    pub interest_rate_pct: Percent,
    pub loan_term_years: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub month: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub remaining_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub monthly_payment: Money,
    pub total_paid: Money,
    pub total_interest: Money,
    pub schedule: Vec<AmortizationRow>,
}

/// Fixed monthly payment for a fixed-rate loan.
pub fn monthly_loan_payment(
    loan_amount: Money,
    interest_rate_pct: Percent,
    loan_term_years: u32,
) -> SolarResult<Money> {
    if loan_term_years > MAX_ANALYSIS_YEARS {
        return Err(term_too_long());
    }
    let monthly_rate = interest_rate_pct / dec!(100) / dec!(12);
    level_payment(monthly_rate, loan_term_years * 12, loan_amount)
}

/// Month-by-month amortization of a fixed-rate loan.
pub fn amortization_schedule(input: &LoanInput) -> SolarResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    validate_loan(input)?;

    let months = input.loan_term_years * 12;
    let monthly_rate = input.interest_rate_pct / dec!(100) / dec!(12);
    let payment = monthly_loan_payment(input.loan_amount, input.interest_rate_pct, input.loan_term_years)?;

    let mut balance = input.loan_amount;
    let mut schedule = Vec::with_capacity(months as usize);
    let mut total_interest = Decimal::ZERO;

    for month in 1..=months {
        let interest = checked_mul(balance, monthly_rate, "interest_rate_pct")?;
        // Last month absorbs rounding so the loan closes at exactly zero
        let principal = if month == months {
            balance
        } else {
            payment - interest
        };
        balance -= principal;
        total_interest = checked_add(total_interest, interest, "interest_rate_pct")?;

        schedule.push(AmortizationRow {
            month,
            payment: principal + interest,
            interest,
            principal,
            remaining_balance: balance,
        });
    }

    let total_paid = schedule.iter().try_fold(Decimal::ZERO, |acc, row| {
        checked_add(acc, row.payment, "interest_rate_pct")
    })?;

    let output = AmortizationOutput {
        monthly_payment: payment,
        total_paid,
        total_interest,
        schedule,
    };

    Ok(with_metadata(
        "Fixed-rate loan amortization (level monthly payment)",
        input,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        output,
    ))
}

pub(crate) fn validate_loan(input: &LoanInput) -> SolarResult<()> {
    if input.loan_amount < Decimal::ZERO {
        return Err(SolarError::invalid("loan_amount", "Loan amount cannot be negative"));
    }
    if input.interest_rate_pct < Decimal::ZERO {
        return Err(SolarError::invalid("interest_rate_pct", "Interest rate cannot be negative"));
    }
    if input.loan_term_years == 0 {
        return Err(SolarError::invalid("loan_term_years", "Loan term must be at least 1 year"));
    }
    if input.loan_term_years > MAX_ANALYSIS_YEARS {
        return Err(term_too_long());
    }
    Ok(())
}

fn term_too_long() -> SolarError {
    SolarError::invalid(
        "loan_term_years",
        format!("Loan term cannot exceed {MAX_ANALYSIS_YEARS} years"),
    )
}
