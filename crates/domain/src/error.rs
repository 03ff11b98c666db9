//! Domain error types.

use common::{BatchRef, Sku};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The batch reference does not belong to this product.
    #[error("Batch {reference} not found for product {sku}")]
    UnknownBatch { reference: BatchRef, sku: Sku },
}
