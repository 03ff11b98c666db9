//! In-memory persistence for tests and development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BatchRef, Sku};
use domain::{Event, Product};
use tokio::sync::RwLock;

use crate::Result;
use crate::repository::ProductRepository;
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Shared committed state backing in-memory units of work.
///
/// Cloning the store is cheap and yields a handle to the same data, so the
/// API server and its units of work can observe each other's commits.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    products: Arc<RwLock<HashMap<Sku, Product>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed products.
    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }

    /// Returns a snapshot of the committed product for a SKU.
    pub async fn get(&self, sku: &Sku) -> Option<Product> {
        self.products.read().await.get(sku).cloned()
    }
}

/// In-memory product repository with staged writes.
///
/// Reads clone from the committed store; writes go to a staging area that
/// only becomes visible when the owning unit of work commits.
pub struct InMemoryProductRepository {
    store: InMemoryStore,
    staged: HashMap<Sku, Product>,
    pending_events: Vec<Event>,
}

impl InMemoryProductRepository {
    fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            staged: HashMap::new(),
            pending_events: Vec::new(),
        }
    }

    fn stage(&mut self, mut product: Product) {
        self.pending_events.extend(product.take_events());
        self.staged.insert(product.sku().clone(), product);
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn add(&mut self, product: Product) -> Result<()> {
        self.stage(product);
        Ok(())
    }

    async fn get(&mut self, sku: &Sku) -> Result<Option<Product>> {
        if let Some(product) = self.staged.get(sku) {
            return Ok(Some(product.clone()));
        }
        Ok(self.store.products.read().await.get(sku).cloned())
    }

    async fn get_by_batchref(&mut self, reference: &BatchRef) -> Result<Option<Product>> {
        if let Some(product) = self.staged.values().find(|p| p.batch(reference).is_some()) {
            return Ok(Some(product.clone()));
        }
        Ok(self
            .store
            .products
            .read()
            .await
            .values()
            .find(|p| p.batch(reference).is_some())
            .cloned())
    }

    async fn save(&mut self, product: Product) -> Result<()> {
        self.stage(product);
        Ok(())
    }

    fn collect_new_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }
}

/// In-memory unit of work over a shared [`InMemoryStore`].
///
/// Also serves as the test fake: `committed()` exposes whether a handler
/// committed, and dropping the unit of work without committing discards
/// the staged writes.
pub struct InMemoryUnitOfWork {
    products: InMemoryProductRepository,
    committed: bool,
}

impl InMemoryUnitOfWork {
    /// Opens a unit of work over the given store.
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            products: InMemoryProductRepository::new(store),
            committed: false,
        }
    }

    /// Returns true if `commit` was called at least once.
    pub fn committed(&self) -> bool {
        self.committed
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn products(&mut self) -> &mut dyn ProductRepository {
        &mut self.products
    }

    async fn commit(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.products.staged);
        self.products.store.products.write().await.extend(staged);
        self.committed = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.products.staged.clear();
        self.products.pending_events.clear();
        Ok(())
    }
}

/// Factory producing [`InMemoryUnitOfWork`] instances over one shared store.
#[derive(Clone, Default)]
pub struct InMemoryUnitOfWorkFactory {
    store: InMemoryStore,
}

impl InMemoryUnitOfWorkFactory {
    /// Creates a factory over the given store.
    pub fn new(store: InMemoryStore) -> Self {
        Self { store }
    }

    /// Returns a handle to the underlying store.
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<InMemoryUnitOfWork> {
        Ok(InMemoryUnitOfWork::new(self.store.clone()))
    }
}
