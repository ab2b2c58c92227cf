use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    IdempotencyKey, IdempotencyRecord, InventoryRecord, ProductId, Result, StoreError,
    store::{IdempotencyStore, InventoryLedger},
};

/// Runs the database migrations shared by both PostgreSQL stores.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed stock ledger.
///
/// Every operation is a single statement, so atomicity comes from PostgreSQL
/// row locking rather than from anything held in this process.
#[derive(Clone)]
pub struct PostgresInventoryLedger {
    pool: PgPool,
}

impl PostgresInventoryLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_record(row: PgRow) -> Result<InventoryRecord> {
        Ok(InventoryRecord {
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            version: row.try_get("version")?,
        })
    }
}

#[async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    async fn get_or_create(&self, product_id: ProductId) -> Result<InventoryRecord> {
        // The unique key turns a racing second insert into a no-op.
        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, quantity, version)
            VALUES ($1, 0, 0)
            ON CONFLICT (product_id) DO NOTHING
            "#,
        )
        .bind(product_id.as_i64())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT product_id, quantity, version
            FROM inventory
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_i64())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_record(row)
    }

    async fn set(&self, product_id: ProductId, quantity: i64) -> Result<InventoryRecord> {
        if quantity < 0 {
            return Err(StoreError::NegativeQuantity {
                product_id,
                quantity,
            });
        }

        let row = sqlx::query(
            r#"
            INSERT INTO inventory (product_id, quantity, version)
            VALUES ($1, $2, 0)
            ON CONFLICT (product_id) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                version = inventory.version + 1
            RETURNING product_id, quantity, version
            "#,
        )
        .bind(product_id.as_i64())
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_record(row)
    }

    async fn decrement_if_enough(&self, product_id: ProductId, quantity: i64) -> Result<bool> {
        if quantity <= 0 {
            return Err(StoreError::InvalidDecrement {
                product_id,
                quantity,
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity - $2, version = version + 1
            WHERE product_id = $1 AND quantity >= $2
            "#,
        )
        .bind(product_id.as_i64())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        if !applied {
            tracing::debug!(%product_id, quantity, "conditional decrement matched no row");
        }
        Ok(applied)
    }
}

/// PostgreSQL-backed idempotency store.
#[derive(Clone)]
pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

impl PostgresIdempotencyStore {
    /// Creates a new PostgreSQL idempotency store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<String>> {
        let response: Option<String> =
            sqlx::query_scalar("SELECT response FROM idempotency_keys WHERE key = $1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(response)
    }

    async fn record(&self, key: &IdempotencyKey, response: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO idempotency_keys (key, response, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key.as_str())
        .bind(response)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT key, response, created_at
            FROM idempotency_keys
            WHERE key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(IdempotencyRecord {
                key: key.clone(),
                response: row.try_get("response")?,
                created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            })),
            None => Ok(None),
        }
    }
}
