//! Product repository abstraction.

use async_trait::async_trait;
use common::{BatchRef, Sku};
use domain::{Event, Product};

use crate::Result;

/// Storage for product aggregates within one unit of work.
///
/// `add` and `save` persist the aggregate state and stage the events it
/// raised; [`ProductRepository::collect_new_events`] drains that staging
/// buffer. Each call returns only the events staged since the previous
/// drain, which is what lets the bus interleave handler invocations and
/// queue appends.
#[async_trait]
pub trait ProductRepository: Send {
    /// Persists a product seen for the first time.
    async fn add(&mut self, product: Product) -> Result<()>;

    /// Loads the product for a SKU, or `None` if the SKU is unknown.
    async fn get(&mut self, sku: &Sku) -> Result<Option<Product>>;

    /// Loads the product owning the batch with the given reference.
    async fn get_by_batchref(&mut self, reference: &BatchRef) -> Result<Option<Product>>;

    /// Persists a previously loaded product.
    async fn save(&mut self, product: Product) -> Result<()>;

    /// Drains the events staged by `add`/`save` since the last drain.
    fn collect_new_events(&mut self) -> Vec<Event>;
}
