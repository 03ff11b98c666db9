//! Allocations read model — which batch each order line ended up on.

use std::collections::HashMap;
use std::sync::Arc;

use common::{BatchRef, OrderId, Sku};
use serde::Serialize;
use tokio::sync::RwLock;

/// One row of the allocations view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub sku: Sku,
    pub batchref: BatchRef,
}

/// Read model view answering "where did order X get allocated?".
///
/// Kept current by the `Allocated`/`Deallocated` event handlers; after a
/// reallocation it reflects only the final assignment.
#[derive(Clone, Default)]
pub struct AllocationsView {
    entries: Arc<RwLock<HashMap<OrderId, HashMap<Sku, BatchRef>>>>,
}

impl AllocationsView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that an order line is allocated to a batch.
    ///
    /// A later allocation for the same `(orderid, sku)` replaces the
    /// earlier one.
    pub async fn add(&self, orderid: OrderId, sku: Sku, batchref: BatchRef) {
        self.entries
            .write()
            .await
            .entry(orderid)
            .or_default()
            .insert(sku, batchref);
    }

    /// Removes the allocation for an order line, if any.
    pub async fn remove(&self, orderid: &OrderId, sku: &Sku) {
        let mut entries = self.entries.write().await;
        if let Some(rows) = entries.get_mut(orderid) {
            rows.remove(sku);
            if rows.is_empty() {
                entries.remove(orderid);
            }
        }
    }

    /// Returns the allocations for an order, sorted by SKU.
    pub async fn allocations(&self, orderid: &OrderId) -> Vec<Allocation> {
        let entries = self.entries.read().await;
        let mut rows: Vec<Allocation> = entries
            .get(orderid)
            .map(|rows| {
                rows.iter()
                    .map(|(sku, batchref)| Allocation {
                        sku: sku.clone(),
                        batchref: batchref.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| a.sku.as_str().cmp(b.sku.as_str()));
        rows
    }
}
