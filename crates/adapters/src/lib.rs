//! Persistence and notification adapters for the allocation service.
//!
//! This crate provides:
//! - The [`ProductRepository`] and [`UnitOfWork`] abstractions the service
//!   layer is written against
//! - An in-memory implementation, also used as the test fake
//! - A PostgreSQL implementation backed by sqlx transactions
//! - The outbound [`Notifications`] port

pub mod error;
pub mod in_memory;
pub mod notifications;
pub mod postgres;
pub mod repository;
pub mod unit_of_work;

pub use error::AdapterError;
pub use in_memory::{
    InMemoryProductRepository, InMemoryStore, InMemoryUnitOfWork, InMemoryUnitOfWorkFactory,
};
pub use notifications::{InMemoryNotifications, Notifications, TracingNotifications};
pub use postgres::{PostgresProductRepository, PostgresUnitOfWork, PostgresUnitOfWorkFactory};
pub use repository::ProductRepository;
pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
