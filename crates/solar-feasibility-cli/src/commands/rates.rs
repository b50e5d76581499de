use chrono::Datelike;
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use solar_feasibility_core::rates::bill::BillComponents;
use solar_feasibility_core::rates::census::census_division;
use solar_feasibility_core::rates::escalation::{project_rates, RateEscalationTable};

use crate::input;

/// Arguments for projecting an electricity rate forward
#[derive(Args)]
pub struct ProjectRatesArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Current rate ($/kWh)
    #[arg(long)]
    pub current_rate: Option<Decimal>,

    /// Annual escalation in percent; looked up by county/state when omitted
    #[arg(long)]
    pub escalation_pct: Option<Decimal>,

    /// Two-letter state code used for the escalation lookup
    #[arg(long)]
    pub state: Option<String>,

    /// County name, e.g. "Cook County"
    #[arg(long)]
    pub county: Option<String>,

    /// First projected year (defaults to the current year)
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Number of years to project
    #[arg(long, default_value = "25")]
    pub years: u32,
}

/// Arguments for splitting a rate into bill components
#[derive(Args)]
pub struct BillComponentsArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Total rate ($/kWh)
    #[arg(long)]
    pub total_rate: Option<Decimal>,
}

#[derive(Deserialize)]
struct ProjectionRequest {
    current_rate: Decimal,
    #[serde(default)]
    escalation_pct: Option<Decimal>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    county: Option<String>,
    #[serde(default)]
    start_year: Option<i32>,
    #[serde(default = "default_years")]
    years: u32,
}

fn default_years() -> u32 {
    25
}

#[derive(Deserialize)]
struct BillRequest {
    total_rate: Decimal,
}

pub fn run_project_rates(args: ProjectRatesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ProjectionRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ProjectionRequest {
            current_rate: args.current_rate
                .ok_or("--current-rate is required (or provide --input)")?,
            escalation_pct: args.escalation_pct,
            state: args.state,
            county: args.county,
            start_year: args.start_year,
            years: args.years,
        }
    };

    if request.current_rate < Decimal::ZERO {
        return Err("current rate must not be negative".into());
    }

    let escalation_pct = match request.escalation_pct {
        Some(pct) => pct,
        None => {
            let state = request.state.as_deref().unwrap_or_default();
            RateEscalationTable::default().escalation_for(request.county.as_deref(), state)
        }
    };
    let start_year = request.start_year.unwrap_or_else(|| chrono::Utc::now().year());
    let projected = project_rates(request.current_rate, escalation_pct, start_year, request.years);

    let mut out = json!({
        "escalation_pct": escalation_pct,
        "results": projected,
    });
    if let Some(state) = request.state.as_deref() {
        out["census_division"] = json!(census_division(state));
    }
    Ok(out)
}

pub fn run_bill_components(args: BillComponentsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let total_rate = if let Some(ref path) = args.input {
        input::file::read_json::<BillRequest>(path)?.total_rate
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value::<BillRequest>(data)?.total_rate
    } else {
        args.total_rate
            .ok_or("--total-rate is required (or provide --input)")?
    };

    let components = BillComponents::from_total_rate(total_rate);
    components.validate(total_rate)?;

    let mut out = serde_json::to_value(&components)?;
    out["energy_rate_total"] = json!(components.energy_rate_total());
    Ok(out)
}
