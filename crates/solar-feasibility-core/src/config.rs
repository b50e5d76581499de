//! Runtime configuration: analysis constants and provider credentials.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//! API keys are never compiled in and are normally supplied through the
//! environment (`EIA_API_KEY`, `GOOGLE_SOLAR_API_KEY`, `PERPLEXITY_API_KEY`).

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SolarError;
use crate::types::{Rate, MAX_ANALYSIS_YEARS};
use crate::SolarResult;

pub const EIA_API_KEY_ENV: &str = "EIA_API_KEY";
pub const GOOGLE_SOLAR_API_KEY_ENV: &str = "GOOGLE_SOLAR_API_KEY";
pub const PERPLEXITY_API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarConfig {
    pub analysis: AnalysisConfig,
    pub eia: EiaConfig,
    pub google_solar: GoogleSolarConfig,
    pub perplexity: PerplexityConfig,
    pub http: HttpConfig,
}

/// Constants the cash-flow engine treats as inputs rather than hardcoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Annual discount rate for NPV (decimal, 0.05 = 5%)
    pub discount_rate: Rate,
    /// Number of years in the cash-flow ledger
    pub horizon_years: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            discount_rate: dec!(0.05),
            horizon_years: 25,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> SolarResult<()> {
        if self.discount_rate <= dec!(-1) {
            return Err(SolarError::invalid(
                "discount_rate",
                "Discount rate must be greater than -100%",
            ));
        }
        if self.horizon_years == 0 || self.horizon_years > MAX_ANALYSIS_YEARS {
            return Err(SolarError::invalid(
                "horizon_years",
                format!("Analysis horizon must be between 1 and {MAX_ANALYSIS_YEARS} years"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EiaConfig {
    pub api_key: String,
    pub base_url: String,
    /// EIA sector id: RES, COM, IND
    pub sector: String,
}

impl Default for EiaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.eia.gov/v2".to_string(),
            sector: "COM".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSolarConfig {
    pub api_key: String,
    pub base_url: String,
    pub required_quality: String,
}

impl Default for GoogleSolarConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://solar.googleapis.com/v1".to_string(),
            required_quality: "HIGH".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerplexityConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.perplexity.ai".to_string(),
            model: "sonar-pro".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 20 }
    }
}

impl SolarConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> SolarResult<Self> {
        let config: SolarConfig = toml::from_str(contents)?;
        config.analysis.validate()?;
        Ok(config)
    }

    /// Read a TOML file and apply environment overrides.
    pub fn load(path: &Path) -> SolarResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SolarError::Config(format!("Failed to read '{}': {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides();
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty(EIA_API_KEY_ENV) {
            self.eia.api_key = key;
        }
        if let Some(key) = non_empty(GOOGLE_SOLAR_API_KEY_ENV) {
            self.google_solar.api_key = key;
        }
        if let Some(key) = non_empty(PERPLEXITY_API_KEY_ENV) {
            self.perplexity.api_key = key;
        }
    }
}
