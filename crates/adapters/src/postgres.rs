//! PostgreSQL persistence backed by sqlx transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BatchRef, Sku};
use domain::{Batch, Event, OrderLine, Product};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::error::AdapterError;
use crate::repository::ProductRepository;
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::Result;

/// PostgreSQL-backed product repository.
///
/// Lives inside one database transaction. Optimistic concurrency is
/// enforced on `products.version_number`: saving a product whose version
/// moved since it was loaded fails with a conflict.
pub struct PostgresProductRepository {
    tx: Option<Transaction<'static, Postgres>>,
    loaded_versions: HashMap<Sku, u64>,
    pending_events: Vec<Event>,
}

impl PostgresProductRepository {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Some(tx),
            loaded_versions: HashMap::new(),
            pending_events: Vec::new(),
        }
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or(AdapterError::UnitOfWorkClosed)
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn add(&mut self, mut product: Product) -> Result<()> {
        let events = product.take_events();
        let tx = self.tx()?;

        sqlx::query("INSERT INTO products (sku, version_number) VALUES ($1, $2)")
            .bind(product.sku().as_str())
            .bind(product.version_number() as i64)
            .execute(&mut **tx)
            .await?;
        insert_batches(tx, &product).await?;

        self.loaded_versions
            .insert(product.sku().clone(), product.version_number());
        self.pending_events.extend(events);
        Ok(())
    }

    async fn get(&mut self, sku: &Sku) -> Result<Option<Product>> {
        let tx = self.tx()?;
        let Some(product) = load_product(tx, sku).await? else {
            return Ok(None);
        };
        self.loaded_versions
            .insert(sku.clone(), product.version_number());
        Ok(Some(product))
    }

    async fn get_by_batchref(&mut self, reference: &BatchRef) -> Result<Option<Product>> {
        let tx = self.tx()?;
        let sku: Option<String> =
            sqlx::query_scalar("SELECT sku FROM batches WHERE reference = $1")
                .bind(reference.as_str())
                .fetch_optional(&mut **tx)
                .await?;

        match sku {
            Some(sku) => self.get(&Sku::new(sku)).await,
            None => Ok(None),
        }
    }

    async fn save(&mut self, mut product: Product) -> Result<()> {
        let events = product.take_events();
        let sku = product.sku().clone();
        let expected = self.loaded_versions.get(&sku).copied();
        let tx = self.tx()?;

        match expected {
            Some(expected) => {
                let updated = sqlx::query(
                    "UPDATE products SET version_number = $1 WHERE sku = $2 AND version_number = $3",
                )
                .bind(product.version_number() as i64)
                .bind(sku.as_str())
                .bind(expected as i64)
                .execute(&mut **tx)
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(AdapterError::ConcurrencyConflict { sku, expected });
                }
            }
            None => {
                sqlx::query("INSERT INTO products (sku, version_number) VALUES ($1, $2)")
                    .bind(sku.as_str())
                    .bind(product.version_number() as i64)
                    .execute(&mut **tx)
                    .await?;
            }
        }

        sqlx::query(
            "DELETE FROM allocations WHERE batch_reference IN \
             (SELECT reference FROM batches WHERE sku = $1)",
        )
        .bind(sku.as_str())
        .execute(&mut **tx)
        .await?;
        sqlx::query("DELETE FROM batches WHERE sku = $1")
            .bind(sku.as_str())
            .execute(&mut **tx)
            .await?;
        insert_batches(tx, &product).await?;

        self.loaded_versions.insert(sku, product.version_number());
        self.pending_events.extend(events);
        Ok(())
    }

    fn collect_new_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending_events)
    }
}

async fn load_product(
    tx: &mut Transaction<'static, Postgres>,
    sku: &Sku,
) -> Result<Option<Product>> {
    let version: Option<i64> =
        sqlx::query_scalar("SELECT version_number FROM products WHERE sku = $1")
            .bind(sku.as_str())
            .fetch_optional(&mut **tx)
            .await?;
    let Some(version) = version else {
        return Ok(None);
    };

    let line_rows = sqlx::query(
        "SELECT a.batch_reference, a.orderid, a.sku, a.qty \
         FROM allocations a \
         JOIN batches b ON a.batch_reference = b.reference \
         WHERE b.sku = $1 ORDER BY a.id",
    )
    .bind(sku.as_str())
    .fetch_all(&mut **tx)
    .await?;

    let mut lines_by_batch: HashMap<String, Vec<OrderLine>> = HashMap::new();
    for row in line_rows {
        let reference: String = row.try_get("batch_reference")?;
        let orderid: String = row.try_get("orderid")?;
        let line_sku: String = row.try_get("sku")?;
        let qty: i32 = row.try_get("qty")?;
        lines_by_batch
            .entry(reference)
            .or_default()
            .push(OrderLine::new(orderid, line_sku, qty as u32));
    }

    let batch_rows = sqlx::query(
        "SELECT reference, purchased_quantity, eta FROM batches WHERE sku = $1 ORDER BY id",
    )
    .bind(sku.as_str())
    .fetch_all(&mut **tx)
    .await?;

    let mut batches = Vec::with_capacity(batch_rows.len());
    for row in batch_rows {
        let reference: String = row.try_get("reference")?;
        let purchased_quantity: i32 = row.try_get("purchased_quantity")?;
        let eta: Option<NaiveDate> = row.try_get("eta")?;
        let allocations = lines_by_batch.remove(&reference).unwrap_or_default();
        batches.push(Batch::rehydrate(
            BatchRef::new(reference),
            sku.clone(),
            purchased_quantity as u32,
            eta,
            allocations,
        ));
    }

    Ok(Some(Product::rehydrate(
        sku.clone(),
        version as u64,
        batches,
    )))
}

async fn insert_batches(
    tx: &mut Transaction<'static, Postgres>,
    product: &Product,
) -> Result<()> {
    for batch in product.batches() {
        sqlx::query(
            "INSERT INTO batches (reference, sku, purchased_quantity, eta) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(batch.reference().as_str())
        .bind(batch.sku().as_str())
        .bind(batch.purchased_quantity() as i32)
        .bind(batch.eta())
        .execute(&mut **tx)
        .await?;

        for line in batch.allocations() {
            sqlx::query(
                "INSERT INTO allocations (batch_reference, orderid, sku, qty) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(batch.reference().as_str())
            .bind(line.orderid().as_str())
            .bind(line.sku().as_str())
            .bind(line.qty() as i32)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

/// Unit of work over a PostgreSQL transaction.
///
/// `commit`/`rollback` end the current transaction and immediately begin a
/// fresh one, so event handlers running after a command handler committed
/// keep operating on the same unit of work. Dropping the unit of work
/// rolls back whatever transaction is still open.
pub struct PostgresUnitOfWork {
    pool: PgPool,
    products: PostgresProductRepository,
}

impl PostgresUnitOfWork {
    /// Wraps an open transaction in a unit of work.
    pub fn new(pool: PgPool, tx: Transaction<'static, Postgres>) -> Self {
        Self {
            pool,
            products: PostgresProductRepository::new(tx),
        }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn products(&mut self) -> &mut dyn ProductRepository {
        &mut self.products
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .products
            .tx
            .take()
            .ok_or(AdapterError::UnitOfWorkClosed)?;
        tx.commit().await?;
        self.products.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .products
            .tx
            .take()
            .ok_or(AdapterError::UnitOfWorkClosed)?;
        tx.rollback().await?;
        self.products.loaded_versions.clear();
        self.products.pending_events.clear();
        self.products.tx = Some(self.pool.begin().await?);
        Ok(())
    }
}

/// Factory producing [`PostgresUnitOfWork`] instances from a pool.
#[derive(Clone)]
pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
}

impl PostgresUnitOfWorkFactory {
    /// Creates a factory over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    type Uow = PostgresUnitOfWork;

    async fn begin(&self) -> Result<PostgresUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWork::new(self.pool.clone(), tx))
    }
}
