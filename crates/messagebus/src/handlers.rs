//! Command and event handlers for the allocation service.
//!
//! Handlers hold their collaborators (view, notifications) and are bound
//! into the registry by [`crate::bootstrap`]; the unit of work arrives as
//! an explicit parameter on every call.

use std::sync::Arc;

use adapters::{Notifications, UnitOfWork};
use async_trait::async_trait;
use common::BatchRef;
use domain::{AllocateData, Batch, Command, Event, OrderLine, Product};
use views::AllocationsView;

use crate::error::HandlerError;
use crate::registry::{CommandHandler, EventHandler};

/// Destination for stock alerts.
const STOCK_ALERTS_DESTINATION: &str = "stock@example.com";

/// Allocates a line to the best batch for its SKU.
///
/// Shared by the `Allocate` command handler and the reallocation event
/// handler.
async fn allocate_line(
    data: AllocateData,
    uow: &mut dyn UnitOfWork,
) -> Result<Option<BatchRef>, HandlerError> {
    let line = OrderLine::new(data.orderid, data.sku, data.qty);
    let mut product = uow
        .products()
        .get(line.sku())
        .await?
        .ok_or_else(|| HandlerError::InvalidSku {
            sku: line.sku().clone(),
        })?;
    let batchref = product.allocate(line);
    uow.products().save(product).await?;
    uow.commit().await?;
    Ok(batchref)
}

/// Registers a new stock batch, creating the product on first sight of the
/// SKU.
pub struct AddBatch;

#[async_trait]
impl CommandHandler for AddBatch {
    fn name(&self) -> &'static str {
        "AddBatch"
    }

    async fn handle(
        &self,
        command: Command,
        uow: &mut dyn UnitOfWork,
    ) -> Result<Option<BatchRef>, HandlerError> {
        let data = match command {
            Command::CreateBatch(data) => data,
            other => {
                return Err(HandlerError::UnexpectedMessage {
                    handler: self.name(),
                    message: other.name(),
                });
            }
        };

        let batch = Batch::new(data.reference, data.sku.clone(), data.qty, data.eta);
        match uow.products().get(&data.sku).await? {
            Some(mut product) => {
                product.add_batch(batch);
                uow.products().save(product).await?;
            }
            None => {
                let mut product = Product::new(data.sku);
                product.add_batch(batch);
                uow.products().add(product).await?;
            }
        }
        uow.commit().await?;
        Ok(None)
    }
}

/// Handles the `Allocate` command.
pub struct Allocate;

#[async_trait]
impl CommandHandler for Allocate {
    fn name(&self) -> &'static str {
        "Allocate"
    }

    async fn handle(
        &self,
        command: Command,
        uow: &mut dyn UnitOfWork,
    ) -> Result<Option<BatchRef>, HandlerError> {
        let data = match command {
            Command::Allocate(data) => data,
            other => {
                return Err(HandlerError::UnexpectedMessage {
                    handler: self.name(),
                    message: other.name(),
                });
            }
        };

        allocate_line(data, uow).await
    }
}

/// Handles the `ChangeBatchQuantity` command.
///
/// Shrinking a batch below its allocated quantity raises `Deallocated`
/// events, which the bus feeds back into reallocation.
pub struct ChangeBatchQuantity;

#[async_trait]
impl CommandHandler for ChangeBatchQuantity {
    fn name(&self) -> &'static str {
        "ChangeBatchQuantity"
    }

    async fn handle(
        &self,
        command: Command,
        uow: &mut dyn UnitOfWork,
    ) -> Result<Option<BatchRef>, HandlerError> {
        let data = match command {
            Command::ChangeBatchQuantity(data) => data,
            other => {
                return Err(HandlerError::UnexpectedMessage {
                    handler: self.name(),
                    message: other.name(),
                });
            }
        };

        let mut product = uow
            .products()
            .get_by_batchref(&data.reference)
            .await?
            .ok_or_else(|| HandlerError::UnknownBatch {
                reference: data.reference.clone(),
            })?;
        product.change_batch_quantity(&data.reference, data.qty)?;
        uow.products().save(product).await?;
        uow.commit().await?;
        Ok(None)
    }
}

/// Projects `Allocated` events into the allocations view.
pub struct AddAllocationToReadModel {
    view: AllocationsView,
}

impl AddAllocationToReadModel {
    /// Creates the projection handler over the given view.
    pub fn new(view: AllocationsView) -> Self {
        Self { view }
    }
}

#[async_trait]
impl EventHandler for AddAllocationToReadModel {
    fn name(&self) -> &'static str {
        "AddAllocationToReadModel"
    }

    async fn handle(&self, event: Event, _uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
        let data = match event {
            Event::Allocated(data) => data,
            other => {
                return Err(HandlerError::UnexpectedMessage {
                    handler: self.name(),
                    message: other.name(),
                });
            }
        };

        self.view.add(data.orderid, data.sku, data.batchref).await;
        Ok(())
    }
}

/// Removes `Deallocated` lines from the allocations view.
pub struct RemoveAllocationFromReadModel {
    view: AllocationsView,
}

impl RemoveAllocationFromReadModel {
    /// Creates the projection handler over the given view.
    pub fn new(view: AllocationsView) -> Self {
        Self { view }
    }
}

#[async_trait]
impl EventHandler for RemoveAllocationFromReadModel {
    fn name(&self) -> &'static str {
        "RemoveAllocationFromReadModel"
    }

    async fn handle(&self, event: Event, _uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
        let data = match event {
            Event::Deallocated(data) => data,
            other => {
                return Err(HandlerError::UnexpectedMessage {
                    handler: self.name(),
                    message: other.name(),
                });
            }
        };

        self.view.remove(&data.orderid, &data.sku).await;
        Ok(())
    }
}

/// Re-allocates a line that lost its batch.
///
/// Runs the same logic as the `Allocate` command, but as an event reaction:
/// its result never reaches the caller's results list, and a failure is
/// retried like any other event handler.
pub struct Reallocate;

#[async_trait]
impl EventHandler for Reallocate {
    fn name(&self) -> &'static str {
        "Reallocate"
    }

    async fn handle(&self, event: Event, uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
        let data = match event {
            Event::Deallocated(data) => data,
            other => {
                return Err(HandlerError::UnexpectedMessage {
                    handler: self.name(),
                    message: other.name(),
                });
            }
        };

        allocate_line(
            AllocateData {
                orderid: data.orderid,
                sku: data.sku,
                qty: data.qty,
            },
            uow,
        )
        .await?;
        Ok(())
    }
}

/// Notifies the stock team when a SKU runs out.
pub struct SendOutOfStockNotification {
    notifications: Arc<dyn Notifications>,
}

impl SendOutOfStockNotification {
    /// Creates the notification handler over the given port.
    pub fn new(notifications: Arc<dyn Notifications>) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl EventHandler for SendOutOfStockNotification {
    fn name(&self) -> &'static str {
        "SendOutOfStockNotification"
    }

    async fn handle(&self, event: Event, _uow: &mut dyn UnitOfWork) -> Result<(), HandlerError> {
        let data = match event {
            Event::OutOfStock(data) => data,
            other => {
                return Err(HandlerError::UnexpectedMessage {
                    handler: self.name(),
                    message: other.name(),
                });
            }
        };

        self.notifications
            .send(
                STOCK_ALERTS_DESTINATION,
                &format!("Out of stock for {}", data.sku),
            )
            .await?;
        Ok(())
    }
}
