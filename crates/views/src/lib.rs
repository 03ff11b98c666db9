//! Read models for the allocation query side.
//!
//! Views are denormalized projections kept up to date by event handlers on
//! the message bus and queried by the HTTP layer without touching the
//! domain model.

mod allocations;

pub use allocations::{Allocation, AllocationsView};
