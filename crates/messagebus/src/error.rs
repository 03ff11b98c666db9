//! Service-layer error types.

use adapters::AdapterError;
use common::{BatchRef, Sku};
use domain::{CommandKind, DomainError};
use thiserror::Error;

/// Errors raised by individual message handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No product exists for the requested SKU.
    #[error("Invalid sku {sku}")]
    InvalidSku { sku: Sku },

    /// No batch exists with the given reference.
    #[error("Unknown batch {reference}")]
    UnknownBatch { reference: BatchRef },

    /// The domain model rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence or notification failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// A handler was invoked with a message variant it is not wired for.
    /// Indicates a registry wiring bug, not a domain condition.
    #[error("Handler {handler} received unexpected message {message}")]
    UnexpectedMessage {
        handler: &'static str,
        message: &'static str,
    },
}

/// Errors surfaced to the caller of [`crate::MessageBus::handle`].
///
/// Event-handler failures never appear here; they are retried, then logged
/// and dropped.
#[derive(Debug, Error)]
pub enum MessageBusError {
    /// Every command variant must have a registered handler; a miss is a
    /// configuration fault, not a runtime condition.
    #[error("No handler registered for command {command}")]
    MissingCommandHandler { command: CommandKind },

    /// A command handler failed; the whole `handle` call was aborted.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}
