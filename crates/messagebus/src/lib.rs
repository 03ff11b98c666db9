//! In-process message bus for the allocation service.
//!
//! The bus unifies two message kinds behind one entry point:
//! - **Commands** are imperative and must succeed or fail synchronously;
//!   each has exactly one handler and no retry.
//! - **Events** are facts with zero or more independent handlers; each
//!   handler gets bounded exponential-backoff retry and its failure never
//!   aborts siblings, the queue, or the triggering command.
//!
//! Handlers may raise further events through the unit of work; the bus
//! drains them after every handler invocation and appends them to its FIFO
//! queue, so they are processed breadth-first before later messages.

pub mod bootstrap;
pub mod bus;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod retry;

pub use bootstrap::message_bus;
pub use bus::MessageBus;
pub use error::{HandlerError, MessageBusError};
pub use registry::{CommandHandler, EventHandler, HandlerRegistry};
pub use retry::{Exhausted, RetryPolicy, with_retry};
