//! Shared identifier types used across the allocation service.

mod types;

pub use types::{BatchRef, OrderId, Sku};
