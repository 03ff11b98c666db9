//! Domain events raised by the product aggregate.

use common::{BatchRef, OrderId, Sku};
use serde::{Deserialize, Serialize};

use crate::model::OrderLine;

/// Facts that already happened in the domain. Zero or more handlers may be
/// interested in each variant; their failures are isolated from one another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// An order line was allocated to a batch.
    Allocated(AllocatedData),

    /// An order line lost its allocation.
    Deallocated(DeallocatedData),

    /// No batch could satisfy an order line.
    OutOfStock(OutOfStockData),
}

impl Event {
    /// Returns the event name.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Allocated(_) => "Allocated",
            Event::Deallocated(_) => "Deallocated",
            Event::OutOfStock(_) => "OutOfStock",
        }
    }

    /// Returns the variant tag used for registry lookup.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Allocated(_) => EventKind::Allocated,
            Event::Deallocated(_) => EventKind::Deallocated,
            Event::OutOfStock(_) => EventKind::OutOfStock,
        }
    }

    pub(crate) fn allocated(line: &OrderLine, batchref: BatchRef) -> Self {
        Event::Allocated(AllocatedData {
            orderid: line.orderid().clone(),
            sku: line.sku().clone(),
            qty: line.qty(),
            batchref,
        })
    }

    pub(crate) fn deallocated(line: &OrderLine) -> Self {
        Event::Deallocated(DeallocatedData {
            orderid: line.orderid().clone(),
            sku: line.sku().clone(),
            qty: line.qty(),
        })
    }

    pub(crate) fn out_of_stock(sku: Sku) -> Self {
        Event::OutOfStock(OutOfStockData { sku })
    }
}

/// Fieldless tag for each event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Allocated,
    Deallocated,
    OutOfStock,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Allocated => "Allocated",
            EventKind::Deallocated => "Deallocated",
            EventKind::OutOfStock => "OutOfStock",
        };
        write!(f, "{name}")
    }
}

/// Data for the Allocated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedData {
    /// Order the line belongs to.
    pub orderid: OrderId,

    /// Allocated SKU.
    pub sku: Sku,

    /// Allocated quantity.
    pub qty: u32,

    /// Batch the line was allocated to.
    pub batchref: BatchRef,
}

/// Data for the Deallocated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeallocatedData {
    /// Order that lost its allocation.
    pub orderid: OrderId,

    /// SKU of the deallocated line.
    pub sku: Sku,

    /// Quantity of the deallocated line.
    pub qty: u32,
}

/// Data for the OutOfStock event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStockData {
    /// SKU with no remaining allocatable stock.
    pub sku: Sku,
}
