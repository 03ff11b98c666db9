use common::Sku;
use thiserror::Error;

/// Errors that can occur in the persistence and notification adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The product was modified concurrently since it was loaded.
    #[error("Concurrency conflict for product {sku}: version {expected} is no longer current")]
    ConcurrencyConflict { sku: Sku, expected: u64 },

    /// The unit of work was already committed or rolled back.
    #[error("Unit of work is closed")]
    UnitOfWorkClosed,

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
