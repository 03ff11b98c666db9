//! Production wiring of the handler registry.

use std::sync::Arc;

use adapters::Notifications;
use domain::{CommandKind, EventKind};
use views::AllocationsView;

use crate::bus::MessageBus;
use crate::handlers::{
    AddAllocationToReadModel, AddBatch, Allocate, ChangeBatchQuantity, Reallocate,
    RemoveAllocationFromReadModel, SendOutOfStockNotification,
};
use crate::registry::HandlerRegistry;

/// Builds the fully wired message bus.
///
/// Handler dependencies are bound here, once, at startup; the registry is
/// immutable afterwards. Tests that need different wiring build their own
/// [`HandlerRegistry`] instead.
pub fn message_bus(view: AllocationsView, notifications: Arc<dyn Notifications>) -> MessageBus {
    let mut registry = HandlerRegistry::new();

    registry.register_command(CommandKind::CreateBatch, Box::new(AddBatch));
    registry.register_command(CommandKind::Allocate, Box::new(Allocate));
    registry.register_command(CommandKind::ChangeBatchQuantity, Box::new(ChangeBatchQuantity));

    registry.register_event(
        EventKind::Allocated,
        Box::new(AddAllocationToReadModel::new(view.clone())),
    );
    registry.register_event(
        EventKind::Deallocated,
        Box::new(RemoveAllocationFromReadModel::new(view)),
    );
    registry.register_event(EventKind::Deallocated, Box::new(Reallocate));
    registry.register_event(
        EventKind::OutOfStock,
        Box::new(SendOutOfStockNotification::new(notifications)),
    );

    debug_assert!(registry.missing_commands().is_empty());

    MessageBus::new(registry)
}
