use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use solar_feasibility_core::production::solar_metrics::{
    self, BuildingProfile, SiteAddress, SolarMetricsInput, SolarSystemSpecs,
};
use solar_feasibility_core::providers::eia::fallback_energy_data;

use crate::input;

/// Arguments for facility-level solar metrics
#[derive(Args)]
pub struct SolarMetricsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Facility name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Roof area in square meters
    #[arg(long)]
    pub roof_area_m2: Option<Decimal>,

    /// Floor area in square meters (estimated from the roof when omitted)
    #[arg(long)]
    pub building_area_m2: Option<Decimal>,

    /// Panel rating in watts
    #[arg(long, default_value = "400")]
    pub panel_watts: Decimal,

    /// City
    #[arg(long, default_value = "")]
    pub city: String,

    /// Two-letter state code
    #[arg(long, default_value = "")]
    pub state: String,

    /// Electricity rate ($/kWh); regional fallback when omitted
    #[arg(long)]
    pub electricity_rate: Option<Decimal>,

    /// Monthly consumption benchmark (kWh per sq ft)
    #[arg(long)]
    pub consumption_benchmark: Option<Decimal>,

    /// Peak sun hours per day
    #[arg(long)]
    pub sun_hours: Option<Decimal>,
}

pub fn run_solar_metrics(args: SolarMetricsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let metrics_input: SolarMetricsInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let mut energy = fallback_energy_data();
        if let Some(rate) = args.electricity_rate {
            energy.electricity_rate = rate;
        }
        if let Some(benchmark) = args.consumption_benchmark {
            energy.consumption_benchmark = benchmark;
        }
        if let Some(hours) = args.sun_hours {
            energy.sun_hours_per_day = hours;
        }

        SolarMetricsInput {
            building: BuildingProfile {
                name: args.name,
                roof_area_m2: args.roof_area_m2
                    .ok_or("--roof-area-m2 is required (or provide --input)")?,
                building_area_m2: args.building_area_m2,
                panel_capacity_watts: args.panel_watts,
                address: SiteAddress {
                    city: args.city,
                    state: args.state,
                    county: None,
                },
                industry: None,
            },
            energy,
            specs: SolarSystemSpecs::default(),
        }
    };

    let result = solar_metrics::calculate_solar_metrics(&metrics_input)?;
    Ok(serde_json::to_value(result)?)
}
