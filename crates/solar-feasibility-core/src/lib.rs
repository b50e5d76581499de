pub mod config;
pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "rates")]
pub mod rates;

#[cfg(feature = "financial")]
pub mod financial;

#[cfg(feature = "layout")]
pub mod layout;

#[cfg(feature = "production")]
pub mod production;

#[cfg(feature = "providers")]
pub mod providers;

#[cfg(feature = "providers")]
pub mod assessment;

pub use error::SolarError;
pub use types::*;

/// Standard result type for all solar feasibility operations
pub type SolarResult<T> = Result<T, SolarError>;
