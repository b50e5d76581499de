use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_feasibility_core::financial::amortization::{self, LoanInput};
use solar_feasibility_core::financial::cash_flow::{self, FinancialParameters, FinancingTerms};
use solar_feasibility_core::financial::sizing::{self, SizingInput};
use solar_feasibility_core::layout::roof::INSTALL_COST_PER_WATT;

use crate::commands::load_config;
use crate::input;

/// Arguments for the 25-year cash-flow analysis
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CashFlowArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// TOML configuration file (discount rate, horizon)
    #[arg(long)]
    pub config: Option<String>,

    /// Total installed system cost
    #[arg(long)]
    pub system_cost: Option<Decimal>,

    /// Nameplate capacity in kW
    #[arg(long)]
    pub capacity_kw: Option<Decimal>,

    /// First-year production in kWh
    #[arg(long)]
    pub annual_production: Option<Decimal>,

    /// Current electricity rate ($/kWh)
    #[arg(long)]
    pub electricity_rate: Option<Decimal>,

    /// Annual rate escalation in percent
    #[arg(long, default_value = "4.23")]
    pub escalation_pct: Decimal,

    /// Annual panel degradation in percent
    #[arg(long, default_value = "0.5")]
    pub degradation_pct: Decimal,

    /// Loan amount (enables financing when set)
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Down payment
    #[arg(long, default_value = "0")]
    pub down_payment: Decimal,

    /// Loan interest rate in percent
    #[arg(long, default_value = "6")]
    pub interest_rate_pct: Decimal,

    /// Loan term in years
    #[arg(long, default_value = "20")]
    pub loan_term_years: u32,

    /// Up-front incentives
    #[arg(long, default_value = "0")]
    pub incentive: Decimal,

    /// Discount rate for NPV (decimal), overrides the configuration
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Ledger length in years, overrides the configuration
    #[arg(long)]
    pub horizon_years: Option<u32>,
}

/// Arguments for a fixed-rate loan schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Principal
    #[arg(long)]
    pub loan_amount: Option<Decimal>,

    /// Annual interest rate in percent
    #[arg(long)]
    pub interest_rate_pct: Option<Decimal>,

    /// Term in years
    #[arg(long)]
    pub loan_term_years: Option<u32>,
}

/// Arguments for payback-targeted system sizing
#[derive(Args)]
pub struct OptimalSizeArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Target payback in years
    #[arg(long, default_value = "10")]
    pub target_payback_years: u32,

    /// Current electricity rate ($/kWh)
    #[arg(long)]
    pub electricity_rate: Option<Decimal>,

    /// Annual consumption in kWh
    #[arg(long)]
    pub annual_consumption: Option<Decimal>,

    /// Installed cost per watt
    #[arg(long)]
    pub cost_per_watt: Option<Decimal>,

    /// Annual rate escalation in percent
    #[arg(long, default_value = "4.23")]
    pub escalation_pct: Decimal,
}

pub fn run_cash_flow(args: CashFlowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(rate) = args.discount_rate {
        config.analysis.discount_rate = rate;
    }
    if let Some(years) = args.horizon_years {
        config.analysis.horizon_years = years;
    }
    config.analysis.validate()?;

    let params: FinancialParameters = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let financing_terms = args.loan_amount.map(|loan_amount| FinancingTerms {
            loan_amount,
            down_payment: args.down_payment,
            interest_rate_pct: args.interest_rate_pct,
            loan_term_years: args.loan_term_years,
            incentive_amount: args.incentive,
        });
        FinancialParameters {
            system_cost: args.system_cost
                .ok_or("--system-cost is required (or provide --input)")?,
            system_capacity_kw: args.capacity_kw
                .ok_or("--capacity-kw is required (or provide --input)")?,
            annual_production_kwh: args.annual_production
                .ok_or("--annual-production is required (or provide --input)")?,
            electricity_rate: args.electricity_rate
                .ok_or("--electricity-rate is required (or provide --input)")?,
            rate_escalation_pct: args.escalation_pct,
            panel_degradation_pct: args.degradation_pct,
            financing_terms,
            bill_components: None,
        }
    };

    let result = cash_flow::compute_metrics(&params, &config.analysis)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        LoanInput {
            loan_amount: args.loan_amount
                .ok_or("--loan-amount is required (or provide --input)")?,
            interest_rate_pct: args.interest_rate_pct
                .ok_or("--interest-rate-pct is required (or provide --input)")?,
            loan_term_years: args.loan_term_years
                .ok_or("--loan-term-years is required (or provide --input)")?,
        }
    };

    let result = amortization::amortization_schedule(&loan)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_optimal_size(args: OptimalSizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sizing_input: SizingInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        SizingInput {
            target_payback_years: args.target_payback_years,
            electricity_rate: args.electricity_rate
                .ok_or("--electricity-rate is required (or provide --input)")?,
            annual_consumption_kwh: args.annual_consumption
                .ok_or("--annual-consumption is required (or provide --input)")?,
            cost_per_watt: args.cost_per_watt.unwrap_or(INSTALL_COST_PER_WATT),
            rate_escalation_pct: args.escalation_pct,
        }
    };

    let result = sizing::optimal_system_size(&sizing_input)?;
    Ok(serde_json::to_value(result)?)
}
