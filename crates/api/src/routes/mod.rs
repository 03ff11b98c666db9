//! HTTP route handlers.

pub mod allocations;
pub mod batches;
pub mod health;
pub mod metrics;

use adapters::UnitOfWorkFactory;
use messagebus::MessageBus;
use views::AllocationsView;

/// Shared application state accessible from all handlers.
pub struct AppState<F: UnitOfWorkFactory> {
    pub bus: MessageBus,
    pub uow_factory: F,
    pub allocations: AllocationsView,
}
