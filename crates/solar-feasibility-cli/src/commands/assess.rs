use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_feasibility_core::assessment::{assess_site, AssessmentRequest, LiveProviders};
use solar_feasibility_core::types::GeoPoint;

use crate::commands::load_config;
use crate::input;

/// Arguments for a full site assessment against the live data sources
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct AssessArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// TOML configuration file; API keys may also come from the environment
    #[arg(long)]
    pub config: Option<String>,

    /// Site latitude
    #[arg(long)]
    pub lat: Option<Decimal>,

    /// Site longitude
    #[arg(long)]
    pub lng: Option<Decimal>,

    /// Organization name for the facility cost estimate
    #[arg(long)]
    pub organization: Option<String>,

    /// Target payback in years for the sizing advice
    #[arg(long, default_value = "10")]
    pub target_payback_years: u32,
}

pub fn run_assess(args: AssessArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;

    let request: AssessmentRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let mut request = AssessmentRequest::at(GeoPoint {
            latitude: args.lat.ok_or("--lat is required (or provide --input)")?,
            longitude: args.lng.ok_or("--lng is required (or provide --input)")?,
        });
        request.organization = args.organization;
        request.target_payback_years = args.target_payback_years;
        request
    };

    let live = LiveProviders::from_config(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(assess_site(&request, &live.providers(), &config))?;

    Ok(serde_json::to_value(report)?)
}
