//! Unit-of-work abstraction.

use async_trait::async_trait;
use domain::Event;

use crate::Result;
use crate::repository::ProductRepository;

/// Transactional scope around one top-level message-bus `handle` call.
///
/// A unit of work is created per request by a [`UnitOfWorkFactory`],
/// threaded explicitly through every handler, and discarded when `handle`
/// returns. Work that was never committed is discarded with it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Returns the product repository bound to this unit of work.
    fn products(&mut self) -> &mut dyn ProductRepository;

    /// Commits the work done so far.
    async fn commit(&mut self) -> Result<()>;

    /// Discards uncommitted work.
    async fn rollback(&mut self) -> Result<()>;

    /// Drains the domain events raised since the previous drain.
    fn collect_new_events(&mut self) -> Vec<Event> {
        self.products().collect_new_events()
    }
}

/// Creates a fresh unit of work per top-level request.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// The concrete unit-of-work type produced by this factory.
    type Uow: UnitOfWork + 'static;

    /// Opens a new transactional scope.
    async fn begin(&self) -> Result<Self::Uow>;
}
