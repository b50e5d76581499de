pub mod assess;
pub mod financial;
pub mod layout;
pub mod production;
pub mod rates;

use solar_feasibility_core::config::SolarConfig;
use std::path::Path;

/// Configuration from `--config` when given, otherwise defaults plus the
/// API keys found in the environment.
pub fn load_config(path: Option<&str>) -> Result<SolarConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => SolarConfig::load(Path::new(p))?,
        None => SolarConfig::from_env(),
    };
    tracing::debug!(
        discount_rate = %config.analysis.discount_rate,
        horizon_years = config.analysis.horizon_years,
        "configuration ready"
    );
    Ok(config)
}
