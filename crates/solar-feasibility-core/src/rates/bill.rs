use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SolarError;
use crate::types::{Money, Rate};
use crate::SolarResult;

/// Share of the unit rate attributed to each per-kWh component.
const BASE_ENERGY_SHARE: Decimal = dec!(0.55);
const DELIVERY_SHARE: Decimal = dec!(0.25);
const REGULATORY_SHARE: Decimal = dec!(0.12);
const SURCHARGE_SHARE: Decimal = dec!(0.08);

/// Flat commercial demand charge ($/kW per month)
pub const DEFAULT_DEMAND_CHARGE: Money = dec!(10.5);

/// Maximum gap ($/kWh) between the component sum and the total rate.
pub const COMPONENT_SUM_TOLERANCE: Rate = dec!(0.0001);

/// Decomposition of a unit electricity rate.
///
/// All fields are $/kWh except `demand_charges`, which is $/kW and does not
/// take part in the sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillComponents {
    pub base_energy_rate: Rate,
    pub delivery_charges: Rate,
    pub demand_charges: Money,
    pub regulatory_fees: Rate,
    pub location_surcharges: Rate,
}

impl BillComponents {
    /// Split a total rate with the typical commercial bill shares.
    pub fn from_total_rate(total_rate: Rate) -> Self {
        Self {
            base_energy_rate: total_rate * BASE_ENERGY_SHARE,
            delivery_charges: total_rate * DELIVERY_SHARE,
            demand_charges: DEFAULT_DEMAND_CHARGE,
            regulatory_fees: total_rate * REGULATORY_SHARE,
            location_surcharges: total_rate * SURCHARGE_SHARE,
        }
    }

    /// Sum of the per-kWh components
    pub fn energy_rate_total(&self) -> Rate {
        self.base_energy_rate + self.delivery_charges + self.regulatory_fees + self.location_surcharges
    }

    pub fn validate(&self, total_rate: Rate) -> SolarResult<()> {
        let parts = [
            ("base_energy_rate", self.base_energy_rate),
            ("delivery_charges", self.delivery_charges),
            ("demand_charges", self.demand_charges),
            ("regulatory_fees", self.regulatory_fees),
            ("location_surcharges", self.location_surcharges),
        ];
        for (field, value) in parts {
            if value < Decimal::ZERO {
                return Err(SolarError::invalid(field, "Bill component cannot be negative"));
            }
        }

        let sum = self.energy_rate_total();
        if (sum - total_rate).abs() > COMPONENT_SUM_TOLERANCE {
            return Err(SolarError::InvalidInput {
                field: "bill_components".into(),
                reason: format!(
                    "Per-kWh components sum to {sum} but the total rate is {total_rate}"
                ),
            });
        }
        Ok(())
    }
}
