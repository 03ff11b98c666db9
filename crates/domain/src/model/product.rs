//! Product aggregate root.

use common::{BatchRef, Sku};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::events::Event;

use super::{Batch, OrderLine};

/// Aggregate root for all batches of one SKU.
///
/// The product is the consistency boundary for allocation: every change to
/// its batches goes through this type, which raises the corresponding domain
/// events into an internal buffer. The unit of work drains that buffer after
/// each handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    sku: Sku,
    batches: Vec<Batch>,
    version_number: u64,
    #[serde(skip)]
    events: Vec<Event>,
}

impl Product {
    /// Creates a product with no batches.
    pub fn new(sku: impl Into<Sku>) -> Self {
        Self {
            sku: sku.into(),
            batches: Vec::new(),
            version_number: 0,
            events: Vec::new(),
        }
    }

    /// Reconstructs a product from persisted state.
    pub fn rehydrate(sku: Sku, version_number: u64, batches: Vec<Batch>) -> Self {
        Self {
            sku,
            batches,
            version_number,
            events: Vec::new(),
        }
    }

    /// Returns the SKU this product tracks.
    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    /// Returns the version used for optimistic concurrency control.
    pub fn version_number(&self) -> u64 {
        self.version_number
    }

    /// Returns all batches, in insertion order.
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Returns the batch with the given reference.
    pub fn batch(&self, reference: &BatchRef) -> Option<&Batch> {
        self.batches.iter().find(|b| b.reference() == reference)
    }

    /// Adds a batch to this product.
    pub fn add_batch(&mut self, batch: Batch) {
        self.batches.push(batch);
    }

    /// Allocates an order line to the preferred batch.
    ///
    /// Warehouse stock is preferred over shipments, earlier ETAs over later.
    /// Returns the chosen batch reference and raises [`Event::Allocated`];
    /// when no batch can satisfy the line, raises [`Event::OutOfStock`] and
    /// returns `None`.
    pub fn allocate(&mut self, line: OrderLine) -> Option<BatchRef> {
        let mut preference: Vec<usize> = (0..self.batches.len()).collect();
        preference.sort_by_key(|&i| self.batches[i].eta());

        let Some(chosen) = preference
            .into_iter()
            .find(|&i| self.batches[i].can_allocate(&line))
        else {
            self.events.push(Event::out_of_stock(line.sku().clone()));
            return None;
        };

        let batchref = self.batches[chosen].reference().clone();
        self.events.push(Event::allocated(&line, batchref.clone()));
        self.batches[chosen].allocate(line);
        self.version_number += 1;
        Some(batchref)
    }

    /// Changes a batch's purchased quantity.
    ///
    /// While the batch is over-allocated, lines are deallocated one at a
    /// time, most recent first, each raising [`Event::Deallocated`] so the
    /// bus can reallocate them.
    pub fn change_batch_quantity(
        &mut self,
        reference: &BatchRef,
        qty: u32,
    ) -> Result<(), DomainError> {
        let batch = self
            .batches
            .iter_mut()
            .find(|b| b.reference() == reference)
            .ok_or_else(|| DomainError::UnknownBatch {
                reference: reference.clone(),
                sku: self.sku.clone(),
            })?;

        batch.set_purchased_quantity(qty);
        while batch.available_quantity() < 0 {
            let Some(line) = batch.deallocate_one() else {
                break;
            };
            self.events.push(Event::deallocated(&line));
        }
        Ok(())
    }

    /// Drains the events raised since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::events::{AllocatedData, DeallocatedData, OutOfStockData};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn prefers_warehouse_batches_to_shipments() {
        let mut product = Product::new("RETRO-CLOCK");
        product.add_batch(Batch::new("in-stock-batch", "RETRO-CLOCK", 100, None));
        product.add_batch(Batch::new(
            "shipment-batch",
            "RETRO-CLOCK",
            100,
            Some(date(2026, 8, 10)),
        ));

        let batchref = product.allocate(OrderLine::new("oref", "RETRO-CLOCK", 10));

        assert_eq!(batchref.unwrap().as_str(), "in-stock-batch");
        assert_eq!(product.batch(&"in-stock-batch".into()).unwrap().available_quantity(), 90);
        assert_eq!(product.batch(&"shipment-batch".into()).unwrap().available_quantity(), 100);
    }

    #[test]
    fn prefers_earlier_batches() {
        let mut product = Product::new("MINIMALIST-SPOON");
        product.add_batch(Batch::new("speedy", "MINIMALIST-SPOON", 100, Some(date(2026, 8, 6))));
        product.add_batch(Batch::new("normal", "MINIMALIST-SPOON", 100, Some(date(2026, 8, 7))));
        product.add_batch(Batch::new("slow", "MINIMALIST-SPOON", 100, Some(date(2026, 9, 6))));

        let batchref = product.allocate(OrderLine::new("order1", "MINIMALIST-SPOON", 10));

        assert_eq!(batchref.unwrap().as_str(), "speedy");
    }

    #[test]
    fn allocation_raises_allocated_event_and_bumps_version() {
        let mut product = Product::new("LAMP");
        product.add_batch(Batch::new("batch-001", "LAMP", 100, None));
        assert_eq!(product.version_number(), 0);

        product.allocate(OrderLine::new("order-1", "LAMP", 10));

        assert_eq!(product.version_number(), 1);
        assert_eq!(
            product.take_events(),
            vec![Event::Allocated(AllocatedData {
                orderid: "order-1".into(),
                sku: "LAMP".into(),
                qty: 10,
                batchref: "batch-001".into(),
            })]
        );
    }

    #[test]
    fn records_out_of_stock_event_if_cannot_allocate() {
        let mut product = Product::new("SMALL-FORK");
        product.add_batch(Batch::new("batch1", "SMALL-FORK", 10, None));
        product.allocate(OrderLine::new("order1", "SMALL-FORK", 10));

        let result = product.allocate(OrderLine::new("order2", "SMALL-FORK", 1));

        assert_eq!(result, None);
        assert_eq!(
            product.take_events().last(),
            Some(&Event::OutOfStock(OutOfStockData {
                sku: "SMALL-FORK".into(),
            }))
        );
    }

    #[test]
    fn out_of_stock_does_not_bump_version() {
        let mut product = Product::new("SMALL-FORK");
        product.allocate(OrderLine::new("order1", "SMALL-FORK", 1));
        assert_eq!(product.version_number(), 0);
    }

    #[test]
    fn changing_quantity_below_allocations_deallocates() {
        let mut product = Product::new("INDIFFERENT-TABLE");
        product.add_batch(Batch::new("batch1", "INDIFFERENT-TABLE", 50, None));
        product.allocate(OrderLine::new("order1", "INDIFFERENT-TABLE", 20));
        product.take_events();

        product
            .change_batch_quantity(&"batch1".into(), 10)
            .unwrap();

        assert_eq!(
            product.take_events(),
            vec![Event::Deallocated(DeallocatedData {
                orderid: "order1".into(),
                sku: "INDIFFERENT-TABLE".into(),
                qty: 20,
            })]
        );
        assert_eq!(product.batch(&"batch1".into()).unwrap().available_quantity(), 10);
    }

    #[test]
    fn changing_quantity_deallocates_most_recent_lines_first() {
        let mut product = Product::new("DESK");
        product.add_batch(Batch::new("batch1", "DESK", 30, None));
        product.allocate(OrderLine::new("order1", "DESK", 10));
        product.allocate(OrderLine::new("order2", "DESK", 10));
        product.allocate(OrderLine::new("order3", "DESK", 10));
        product.take_events();

        product.change_batch_quantity(&"batch1".into(), 15).unwrap();

        let deallocated: Vec<String> = product
            .take_events()
            .into_iter()
            .map(|e| match e {
                Event::Deallocated(data) => data.orderid.to_string(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(deallocated, vec!["order3", "order2"]);
    }

    #[test]
    fn changing_quantity_of_unknown_batch_fails() {
        let mut product = Product::new("DESK");
        let err = product
            .change_batch_quantity(&"no-such-batch".into(), 5)
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownBatch { .. }));
    }
}
