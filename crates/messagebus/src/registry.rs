//! Static mapping from message variant to handlers.

use std::collections::HashMap;

use adapters::UnitOfWork;
use async_trait::async_trait;
use common::BatchRef;
use domain::{Command, CommandKind, Event, EventKind};

use crate::error::HandlerError;

/// Handles one command variant.
///
/// Invoked at most once per dispatch; its return value is surfaced to the
/// original caller.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handler identity used in logs.
    fn name(&self) -> &'static str;

    /// Executes the command within the given unit of work.
    async fn handle(
        &self,
        command: Command,
        uow: &mut dyn UnitOfWork,
    ) -> Result<Option<BatchRef>, HandlerError>;
}

/// Handles one event variant.
///
/// Fan-out consumers are independent: a failure here is retried by the bus
/// and, once exhausted, logged and dropped.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handler identity used in logs.
    fn name(&self) -> &'static str;

    /// Reacts to the event within the given unit of work.
    async fn handle(&self, event: Event, uow: &mut dyn UnitOfWork) -> Result<(), HandlerError>;
}

/// Process-wide handler configuration.
///
/// Built once at startup (see [`crate::bootstrap`]), injected into
/// [`crate::MessageBus::new`], and never mutated during dispatch. Exactly
/// one handler per command variant, zero or more ordered handlers per
/// event variant.
#[derive(Default)]
pub struct HandlerRegistry {
    commands: HashMap<CommandKind, Box<dyn CommandHandler>>,
    events: HashMap<EventKind, Vec<Box<dyn EventHandler>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for a command variant, replacing any previous
    /// registration.
    pub fn register_command(&mut self, kind: CommandKind, handler: Box<dyn CommandHandler>) {
        self.commands.insert(kind, handler);
    }

    /// Appends a handler to an event variant's ordered handler list.
    pub fn register_event(&mut self, kind: EventKind, handler: Box<dyn EventHandler>) {
        self.events.entry(kind).or_default().push(handler);
    }

    /// Returns the handler for a command variant, if registered.
    pub fn command_handler(&self, kind: CommandKind) -> Option<&dyn CommandHandler> {
        self.commands.get(&kind).map(Box::as_ref)
    }

    /// Returns the handlers for an event variant, in registration order.
    pub fn event_handlers(&self, kind: EventKind) -> &[Box<dyn EventHandler>] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the command variants that have no handler.
    ///
    /// The production wiring checks this is empty at startup.
    pub fn missing_commands(&self) -> Vec<CommandKind> {
        CommandKind::ALL
            .into_iter()
            .filter(|kind| !self.commands.contains_key(kind))
            .collect()
    }
}
