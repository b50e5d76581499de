use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use solar_feasibility_core::config::AnalysisConfig;
use solar_feasibility_core::financial::cash_flow::FinancialParameters;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Financial
// ---------------------------------------------------------------------------

/// Cash-flow parameters with an optional `analysis` block
/// (`discount_rate`, `horizon_years`).
#[derive(Deserialize)]
struct CashFlowRequest {
    #[serde(flatten)]
    params: FinancialParameters,
    #[serde(default)]
    analysis: AnalysisConfig,
}

#[napi]
pub fn compute_financial_metrics(input_json: String) -> NapiResult<String> {
    let request: CashFlowRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    request.analysis.validate().map_err(to_napi_error)?;
    let output =
        solar_feasibility_core::financial::cash_flow::compute_metrics(&request.params, &request.analysis)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: solar_feasibility_core::financial::amortization::LoanInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = solar_feasibility_core::financial::amortization::amortization_schedule(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn optimal_system_size(input_json: String) -> NapiResult<String> {
    let input: solar_feasibility_core::financial::sizing::SizingInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = solar_feasibility_core::financial::sizing::optimal_system_size(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProjectionRequest {
    current_rate: Decimal,
    escalation_pct: Decimal,
    start_year: i32,
    #[serde(default = "default_projection_years")]
    years: u32,
}

fn default_projection_years() -> u32 {
    25
}

#[napi]
pub fn project_rates(input_json: String) -> NapiResult<String> {
    let request: ProjectionRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = solar_feasibility_core::rates::escalation::project_rates(
        request.current_rate,
        request.escalation_pct,
        request.start_year,
        request.years,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn bill_components(total_rate: String) -> NapiResult<String> {
    let total_rate: Decimal = total_rate.trim().parse().map_err(to_napi_error)?;
    let components = solar_feasibility_core::rates::bill::BillComponents::from_total_rate(total_rate);
    components.validate(total_rate).map_err(to_napi_error)?;
    serde_json::to_string(&components).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_roof_layout(input_json: String) -> NapiResult<String> {
    let input: solar_feasibility_core::layout::roof::RoofLayoutInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        solar_feasibility_core::layout::roof::calculate_layout(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Yield factor as a decimal string.
#[napi]
pub fn orientation_yield_factor(orientation_deg: String, tilt_deg: String) -> NapiResult<String> {
    let orientation: Decimal = orientation_deg.trim().parse().map_err(to_napi_error)?;
    let tilt: Decimal = tilt_deg.trim().parse().map_err(to_napi_error)?;
    let factor =
        solar_feasibility_core::layout::orientation::orientation_yield_factor(orientation, tilt);
    Ok(factor.to_string())
}

// ---------------------------------------------------------------------------
// Production
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_solar_metrics(input_json: String) -> NapiResult<String> {
    let input: solar_feasibility_core::production::solar_metrics::SolarMetricsInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = solar_feasibility_core::production::solar_metrics::calculate_solar_metrics(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
