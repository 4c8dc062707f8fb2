use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use skybook_core::{check_money_scale, CoreError, CoreResult};

/// Fare components of a route. The total is always derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFare {
    pub base_price: Decimal,
    pub gst: Decimal,
}

impl RouteFare {
    pub fn new(base_price: Decimal, gst: Decimal) -> CoreResult<Self> {
        if base_price <= Decimal::ZERO {
            return Err(CoreError::ValidationError("base_price must be greater than 0".to_string()));
        }
        if gst < Decimal::ZERO {
            return Err(CoreError::ValidationError("gst must not be negative".to_string()));
        }
        check_money_scale("base_price", base_price)?;
        check_money_scale("gst", gst)?;
        Ok(Self { base_price, gst })
    }

    pub fn total(&self) -> Decimal {
        self.base_price + self.gst
    }

    /// Merges a partial update; components that are not supplied keep their current value.
    pub fn with_changes(&self, base_price: Option<Decimal>, gst: Option<Decimal>) -> CoreResult<Self> {
        Self::new(base_price.unwrap_or(self.base_price), gst.unwrap_or(self.gst))
    }
}
