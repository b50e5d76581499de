use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SolarError;
use crate::types::{
    with_metadata, ComputationOutput, GeoPoint, Kw, Money, SqFt, SQ_FT_PER_SQ_M,
};
use crate::SolarResult;

/// Roof width covered by a single maintenance walkway (ft)
const FT_PER_WALKWAY: Decimal = dec!(20);

/// Installation labour (hours per kW)
pub const INSTALL_HOURS_PER_KW: Decimal = dec!(3);

/// Installed cost ($/W)
pub const INSTALL_COST_PER_WATT: Money = dec!(2.85);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Fire-code and maintenance clearances (ft).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetbackRules {
    pub edge_setback_ft: Decimal,
    pub obstruction_setback_ft: Decimal,
    pub walkway_width_ft: Decimal,
}

impl Default for SetbackRules {
    fn default() -> Self {
        Self {
            edge_setback_ft: dec!(4.0),
            obstruction_setback_ft: dec!(4.0),
            walkway_width_ft: dec!(3.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstructionKind {
    Vent,
    Hvac,
    Skylight,
    Chimney,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ObstructionShape {
    Circular { radius_ft: Decimal },
    Rectangular { width_ft: Decimal, height_ft: Decimal },
}

impl ObstructionShape {
    /// Footprint including the clearance ring around it.
    pub fn cleared_area(&self, clearance_ft: Decimal) -> SqFt {
        match self {
            ObstructionShape::Circular { radius_ft } => {
                let r = *radius_ft + clearance_ft;
                Decimal::PI * r * r
            }
            ObstructionShape::Rectangular {
                width_ft,
                height_ft,
            } => (*width_ft + dec!(2) * clearance_ft) * (*height_ft + dec!(2) * clearance_ft),
        }
    }
}

/// Something on the roof that panels must avoid. `position` is carried for
/// display and does not enter the area math.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoofObstruction {
    pub kind: ObstructionKind,
    #[serde(default)]
    pub position: GeoPoint,
    #[serde(flatten)]
    pub shape: ObstructionShape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoofLayoutInput {
    pub roof_area_sq_ft: SqFt,
    pub panel_width_ft: Decimal,
    pub panel_height_ft: Decimal,
    /// Nameplate rating of one panel (W)
    pub panel_capacity_watts: Decimal,
    #[serde(default)]
    pub obstructions: Vec<RoofObstruction>,
    #[serde(default)]
    pub setback_rules: SetbackRules,
}

impl RoofLayoutInput {
    /// Build an input from a roof area reported in square meters.
    pub fn from_roof_area_m2(
        roof_area_m2: Decimal,
        panel_width_ft: Decimal,
        panel_height_ft: Decimal,
        panel_capacity_watts: Decimal,
    ) -> Self {
        Self {
            roof_area_sq_ft: roof_area_m2 * SQ_FT_PER_SQ_M,
            panel_width_ft,
            panel_height_ft,
            panel_capacity_watts,
            obstructions: Vec::new(),
            setback_rules: SetbackRules::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Relative yield by roof face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationEfficiency {
    pub south: Decimal,
    pub west: Decimal,
    pub east: Decimal,
    pub north: Decimal,
}

impl OrientationEfficiency {
    pub const STANDARD: OrientationEfficiency = OrientationEfficiency {
        south: dec!(1.0),
        west: dec!(0.85),
        east: dec!(0.8),
        north: dec!(0.65),
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoofLayoutResult {
    pub usable_area_sq_ft: SqFt,
    pub max_panel_count: u32,
    pub panel_rows: u32,
    pub panel_columns: u32,
    pub walkway_area_sq_ft: SqFt,
    pub setback_area_sq_ft: SqFt,
    pub obstruction_area_sq_ft: SqFt,
    pub orientation_efficiency: OrientationEfficiency,
    pub total_capacity_kw: Kw,
    pub installation_time_hours: Decimal,
    pub installation_cost_usd: Money,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Estimate how many panels fit on a roof once edge setbacks, obstruction
/// clearances and walkways are removed.
///
/// The roof is modelled as a square of the given area, so perimeter and
/// width both derive from `sqrt(area)`.
pub fn calculate_layout(input: &RoofLayoutInput) -> SolarResult<ComputationOutput<RoofLayoutResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let rules = &input.setback_rules;
    let roof_area = input.roof_area_sq_ft;
    let roof_width = roof_area
        .sqrt()
        .ok_or_else(|| SolarError::invalid("roof_area_sq_ft", "Roof width is undefined"))?;

    // Edge setback
    let perimeter = roof_width * dec!(4);
    let setback_area = perimeter * rules.edge_setback_ft;

    // Obstructions (overlaps are counted twice)
    let obstruction_area: SqFt = input
        .obstructions
        .iter()
        .map(|o| o.shape.cleared_area(rules.obstruction_setback_ft))
        .sum();

    // Walkways
    let walkway_count = (roof_width / FT_PER_WALKWAY).floor().max(Decimal::ONE);
    let walkway_area = roof_width * rules.walkway_width_ft * walkway_count;

    let usable_area =
        (roof_area - setback_area - obstruction_area - walkway_area).max(Decimal::ZERO);
    if usable_area.is_zero() {
        warnings.push(
            "Setbacks, obstructions and walkways consume the entire roof; no panels fit".into(),
        );
    }

    let panel_area = input.panel_width_ft * input.panel_height_ft;
    let max_panel_count = (usable_area / panel_area)
        .floor()
        .to_u32()
        .ok_or_else(|| SolarError::invalid("roof_area_sq_ft", "Panel count exceeds u32 range"))?;

    // Grid on a square roof (aspect ratio 1)
    let panel_columns = isqrt(max_panel_count);
    let panel_rows = if panel_columns == 0 {
        0
    } else {
        max_panel_count / panel_columns
    };
    if panel_rows * panel_columns < max_panel_count {
        warnings.push(format!(
            "Grid of {panel_rows} x {panel_columns} under-reports the {max_panel_count} panels that fit by area"
        ));
    }

    let total_capacity_kw = Decimal::from(max_panel_count) * input.panel_capacity_watts / dec!(1000);
    let installation_time_hours = total_capacity_kw * INSTALL_HOURS_PER_KW;
    let installation_cost_usd = total_capacity_kw * dec!(1000) * INSTALL_COST_PER_WATT;

    tracing::debug!(
        usable_sq_ft = %usable_area,
        panels = max_panel_count,
        capacity_kw = %total_capacity_kw,
        "estimated roof layout"
    );

    let output = RoofLayoutResult {
        usable_area_sq_ft: usable_area,
        max_panel_count,
        panel_rows,
        panel_columns,
        walkway_area_sq_ft: walkway_area,
        setback_area_sq_ft: setback_area,
        obstruction_area_sq_ft: obstruction_area,
        orientation_efficiency: OrientationEfficiency::STANDARD,
        total_capacity_kw,
        installation_time_hours,
        installation_cost_usd,
    };

    Ok(with_metadata(
        "Square-roof area budget: edge setback, cleared obstructions, walkways",
        input,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

fn validate_input(input: &RoofLayoutInput) -> SolarResult<()> {
    if input.roof_area_sq_ft <= Decimal::ZERO {
        return Err(SolarError::invalid("roof_area_sq_ft", "Roof area must be positive"));
    }
    if input.panel_width_ft <= Decimal::ZERO {
        return Err(SolarError::invalid("panel_width_ft", "Panel width must be positive"));
    }
    if input.panel_height_ft <= Decimal::ZERO {
        return Err(SolarError::invalid("panel_height_ft", "Panel height must be positive"));
    }
    if input.panel_capacity_watts < Decimal::ZERO {
        return Err(SolarError::invalid(
            "panel_capacity_watts",
            "Panel capacity cannot be negative",
        ));
    }

    let rules = &input.setback_rules;
    for (field, value) in [
        ("edge_setback_ft", rules.edge_setback_ft),
        ("obstruction_setback_ft", rules.obstruction_setback_ft),
        ("walkway_width_ft", rules.walkway_width_ft),
    ] {
        if value < Decimal::ZERO {
            return Err(SolarError::invalid(field, "Setback cannot be negative"));
        }
    }

    for obstruction in &input.obstructions {
        let negative = match obstruction.shape {
            ObstructionShape::Circular { radius_ft } => radius_ft < Decimal::ZERO,
            ObstructionShape::Rectangular {
                width_ft,
                height_ft,
            } => width_ft < Decimal::ZERO || height_ft < Decimal::ZERO,
        };
        if negative {
            return Err(SolarError::invalid(
                "obstructions",
                "Obstruction dimensions cannot be negative",
            ));
        }
    }
    Ok(())
}

/// Largest `r` with `r * r <= n`.
fn isqrt(n: u32) -> u32 {
    let n = n as u64;
    let mut lo = 0u64;
    let mut hi = n + 1;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if mid * mid <= n {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo as u32
}
