//! Commands accepted by the allocation service.

use chrono::NaiveDate;
use common::{BatchRef, OrderId, Sku};
use serde::{Deserialize, Serialize};

/// Imperative instructions from a caller who waits synchronously for the
/// outcome. Exactly one handler is registered per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Command {
    /// Register a new stock batch.
    CreateBatch(CreateBatchData),

    /// Allocate an order line to the best available batch.
    Allocate(AllocateData),

    /// Change the purchased quantity of an existing batch.
    ChangeBatchQuantity(ChangeBatchQuantityData),
}

impl Command {
    /// Returns the command name.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateBatch(_) => "CreateBatch",
            Command::Allocate(_) => "Allocate",
            Command::ChangeBatchQuantity(_) => "ChangeBatchQuantity",
        }
    }

    /// Returns the variant tag used for registry lookup.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateBatch(_) => CommandKind::CreateBatch,
            Command::Allocate(_) => CommandKind::Allocate,
            Command::ChangeBatchQuantity(_) => CommandKind::ChangeBatchQuantity,
        }
    }
}

/// Fieldless tag for each command variant.
///
/// Registry keys, enumerable so the wiring can be checked exhaustively at
/// startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateBatch,
    Allocate,
    ChangeBatchQuantity,
}

impl CommandKind {
    /// All command variants, in declaration order.
    pub const ALL: [CommandKind; 3] = [
        CommandKind::CreateBatch,
        CommandKind::Allocate,
        CommandKind::ChangeBatchQuantity,
    ];
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandKind::CreateBatch => "CreateBatch",
            CommandKind::Allocate => "Allocate",
            CommandKind::ChangeBatchQuantity => "ChangeBatchQuantity",
        };
        write!(f, "{name}")
    }
}

/// Data for the CreateBatch command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatchData {
    /// Reference of the new batch.
    pub reference: BatchRef,

    /// SKU the batch holds stock for.
    pub sku: Sku,

    /// Purchased quantity.
    pub qty: u32,

    /// Estimated arrival date; `None` for warehouse stock.
    pub eta: Option<NaiveDate>,
}

/// Data for the Allocate command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateData {
    /// Order the line belongs to.
    pub orderid: OrderId,

    /// Requested SKU.
    pub sku: Sku,

    /// Requested quantity.
    pub qty: u32,
}

/// Data for the ChangeBatchQuantity command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatchQuantityData {
    /// Batch whose purchased quantity changes.
    pub reference: BatchRef,

    /// New purchased quantity.
    pub qty: u32,
}

impl Command {
    /// Creates a CreateBatch command.
    pub fn create_batch(
        reference: impl Into<BatchRef>,
        sku: impl Into<Sku>,
        qty: u32,
        eta: Option<NaiveDate>,
    ) -> Self {
        Command::CreateBatch(CreateBatchData {
            reference: reference.into(),
            sku: sku.into(),
            qty,
            eta,
        })
    }

    /// Creates an Allocate command.
    pub fn allocate(orderid: impl Into<OrderId>, sku: impl Into<Sku>, qty: u32) -> Self {
        Command::Allocate(AllocateData {
            orderid: orderid.into(),
            sku: sku.into(),
            qty,
        })
    }

    /// Creates a ChangeBatchQuantity command.
    pub fn change_batch_quantity(reference: impl Into<BatchRef>, qty: u32) -> Self {
        Command::ChangeBatchQuantity(ChangeBatchQuantityData {
            reference: reference.into(),
            qty,
        })
    }
}
