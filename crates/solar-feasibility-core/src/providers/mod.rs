//! Clients for the external data sources a site assessment draws on.
//!
//! Each source sits behind a trait so the assessment pipeline can run
//! against in-memory fakes. Sources with a documented conservative default
//! never fail: they return [`Sourced::Degraded`] and log a warning instead.
//! Building insights have no sensible default and propagate errors.

pub mod eia;
pub mod google_solar;
pub mod perplexity;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::SolarError;
use crate::production::solar_metrics::{BuildingProfile, EnergyData};
use crate::rates::details::EnergyRateDetails;
use crate::types::{GeoPoint, Money, Sourced};
use crate::SolarResult;

pub use eia::EiaClient;
pub use google_solar::GoogleSolarClient;
pub use perplexity::{FacilityLocation, PerplexityClient};

#[async_trait]
pub trait BuildingInsightsProvider: Send + Sync {
    async fn building_insights(&self, location: GeoPoint) -> SolarResult<BuildingProfile>;
}

#[async_trait]
pub trait EnergyDataProvider: Send + Sync {
    async fn energy_data(&self, state: &str) -> Sourced<EnergyData>;

    async fn rate_details(&self, state: &str, county: Option<&str>) -> Sourced<EnergyRateDetails>;
}

#[async_trait]
pub trait FacilityCostProvider: Send + Sync {
    /// Estimated annual electricity spend for the facility
    async fn annual_facility_cost(&self, location: &FacilityLocation) -> Sourced<Money>;
}

/// Shared reqwest client carrying the configured timeout.
pub(crate) fn http_client(config: &HttpConfig) -> SolarResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| SolarError::Config(format!("Failed to build HTTP client: {e}")))
}

pub(crate) fn provider_error(provider: &str, reason: impl std::fmt::Display) -> SolarError {
    SolarError::Provider {
        provider: provider.to_string(),
        reason: reason.to_string(),
    }
}

/// Turn a non-success status into a provider error, keeping the body for
/// diagnostics.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> SolarResult<reqwest::Response> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        return Err(provider_error(provider, format!("HTTP {status}: {body}")));
    }
    Ok(response)
}
