//! Order line value object.

use common::{OrderId, Sku};
use serde::{Deserialize, Serialize};

/// A line of a customer order: a quantity of one SKU.
///
/// Value object with structural equality; two lines with the same fields are
/// the same line, which is what makes batch allocation idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    orderid: OrderId,
    sku: Sku,
    qty: u32,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(orderid: impl Into<OrderId>, sku: impl Into<Sku>, qty: u32) -> Self {
        Self {
            orderid: orderid.into(),
            sku: sku.into(),
            qty,
        }
    }

    /// Returns the order id.
    pub fn orderid(&self) -> &OrderId {
        &self.orderid
    }

    /// Returns the SKU.
    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Returns the quantity.
    pub fn qty(&self) -> u32 {
        self.qty
    }
}
