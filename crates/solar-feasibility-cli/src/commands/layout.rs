use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use solar_feasibility_core::layout::orientation::orientation_yield_factor;
use solar_feasibility_core::layout::roof::{self, RoofLayoutInput, SetbackRules};

use crate::input;

/// Arguments for roof layout estimation
#[derive(Args)]
pub struct RoofLayoutArgs {
    /// Path to JSON input file (obstructions and setbacks need this)
    #[arg(long)]
    pub input: Option<String>,

    /// Roof area in square feet
    #[arg(long, conflicts_with = "roof_area_m2")]
    pub roof_area: Option<Decimal>,

    /// Roof area in square meters
    #[arg(long)]
    pub roof_area_m2: Option<Decimal>,

    /// Panel width in feet
    #[arg(long, default_value = "3.2")]
    pub panel_width: Decimal,

    /// Panel height in feet
    #[arg(long, default_value = "5.5")]
    pub panel_height: Decimal,

    /// Panel rating in watts
    #[arg(long, default_value = "400")]
    pub panel_watts: Decimal,
}

/// Arguments for the orientation yield factor
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct OrientationArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Compass azimuth in degrees (180 = south)
    #[arg(long)]
    pub azimuth: Option<Decimal>,

    /// Tilt from horizontal in degrees
    #[arg(long)]
    pub tilt: Option<Decimal>,
}

#[derive(Deserialize)]
struct OrientationRequest {
    orientation_deg: Decimal,
    tilt_deg: Decimal,
}

pub fn run_roof_layout(args: RoofLayoutArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let layout_input: RoofLayoutInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        match (args.roof_area, args.roof_area_m2) {
            (Some(roof_area_sq_ft), _) => RoofLayoutInput {
                roof_area_sq_ft,
                panel_width_ft: args.panel_width,
                panel_height_ft: args.panel_height,
                panel_capacity_watts: args.panel_watts,
                obstructions: Vec::new(),
                setback_rules: SetbackRules::default(),
            },
            (None, Some(m2)) => RoofLayoutInput::from_roof_area_m2(
                m2,
                args.panel_width,
                args.panel_height,
                args.panel_watts,
            ),
            (None, None) => {
                return Err("--roof-area or --roof-area-m2 is required (or provide --input)".into())
            }
        }
    };

    let result = roof::calculate_layout(&layout_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_orientation_factor(args: OrientationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: OrientationRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        OrientationRequest {
            orientation_deg: args.azimuth.ok_or("--azimuth is required (or provide --input)")?,
            tilt_deg: args.tilt.ok_or("--tilt is required (or provide --input)")?,
        }
    };

    let factor = orientation_yield_factor(request.orientation_deg, request.tilt_deg);
    Ok(json!({
        "orientation_deg": request.orientation_deg,
        "tilt_deg": request.tilt_deg,
        "yield_factor": factor,
    }))
}
