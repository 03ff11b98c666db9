//! Domain layer for the allocation service.
//!
//! This crate provides the core domain types:
//! - Product aggregate allocating order lines to stock batches
//! - Command and Event enums forming the closed message hierarchy
//! - Message union consumed by the message bus

pub mod commands;
pub mod error;
pub mod events;
pub mod message;
pub mod model;

pub use commands::{
    AllocateData, ChangeBatchQuantityData, Command, CommandKind, CreateBatchData,
};
pub use error::DomainError;
pub use events::{AllocatedData, DeallocatedData, Event, EventKind, OutOfStockData};
pub use message::Message;
pub use model::{Batch, OrderLine, Product};
