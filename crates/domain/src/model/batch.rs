//! Stock batch entity.

use chrono::NaiveDate;
use common::{BatchRef, Sku};
use serde::{Deserialize, Serialize};

use super::OrderLine;

/// A batch of stock for a single SKU, either already in the warehouse
/// (`eta == None`) or on its way.
///
/// Identity is the batch reference; allocations are a set of order lines,
/// so allocating the same line twice is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    reference: BatchRef,
    sku: Sku,
    purchased_quantity: u32,
    eta: Option<NaiveDate>,
    allocations: Vec<OrderLine>,
}

impl Batch {
    /// Creates a new batch with no allocations.
    pub fn new(
        reference: impl Into<BatchRef>,
        sku: impl Into<Sku>,
        qty: u32,
        eta: Option<NaiveDate>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            purchased_quantity: qty,
            eta,
            allocations: Vec::new(),
        }
    }

    /// Reconstructs a batch from persisted state.
    ///
    /// Used by repositories; allocations are taken as-is, in the order they
    /// were allocated.
    pub fn rehydrate(
        reference: BatchRef,
        sku: Sku,
        purchased_quantity: u32,
        eta: Option<NaiveDate>,
        allocations: Vec<OrderLine>,
    ) -> Self {
        Self {
            reference,
            sku,
            purchased_quantity,
            eta,
            allocations,
        }
    }

    /// Returns the batch reference.
    pub fn reference(&self) -> &BatchRef {
        &self.reference
    }

    /// Returns the SKU this batch holds stock for.
    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Returns the estimated arrival date, `None` for warehouse stock.
    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    /// Returns the purchased quantity.
    pub fn purchased_quantity(&self) -> u32 {
        self.purchased_quantity
    }

    /// Returns the allocated order lines, oldest first.
    pub fn allocations(&self) -> &[OrderLine] {
        &self.allocations
    }

    /// Returns the total quantity allocated to order lines.
    pub fn allocated_quantity(&self) -> u32 {
        self.allocations.iter().map(OrderLine::qty).sum()
    }

    /// Returns the quantity still available for allocation.
    ///
    /// Negative while the purchased quantity has been reduced below what is
    /// already allocated; the aggregate deallocates lines until it is
    /// non-negative again.
    pub fn available_quantity(&self) -> i64 {
        i64::from(self.purchased_quantity) - i64::from(self.allocated_quantity())
    }

    /// Returns true if the line's SKU matches and enough stock is available.
    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == *line.sku() && self.available_quantity() >= i64::from(line.qty())
    }

    /// Allocates a line to this batch. Allocating an already-allocated line
    /// is a no-op.
    pub fn allocate(&mut self, line: OrderLine) {
        if !self.allocations.contains(&line) {
            self.allocations.push(line);
        }
    }

    /// Removes a line from this batch's allocations.
    ///
    /// Returns false if the line was not allocated here.
    pub fn deallocate(&mut self, line: &OrderLine) -> bool {
        match self.allocations.iter().position(|l| l == line) {
            Some(index) => {
                self.allocations.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_purchased_quantity(&mut self, qty: u32) {
        self.purchased_quantity = qty;
    }

    /// Removes and returns the most recently allocated line.
    pub(crate) fn deallocate_one(&mut self) -> Option<OrderLine> {
        self.allocations.pop()
    }
}
