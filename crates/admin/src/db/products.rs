//! Product repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use shopdesk_core::{Price, ProductId, Quantity};

use super::{CrudRepository, DeleteOutcome, InsertOutcome, RepositoryError, UpdateOutcome};
use crate::models::{NewProduct, Product, ProductPatch};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    description: String,
    price: Decimal,
    quantity: i32,
    image: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        let quantity = Quantity::try_from(row.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity in database: {e}"))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            title: row.title,
            description: row.description,
            price,
            quantity,
            image: row.image,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UpdateCounts {
    matched: i64,
    modified: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `products` table.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrudRepository for PgProductRepository {
    type Entity = Product;
    type Id = ProductId;
    type New = NewProduct;
    type Patch = ProductPatch;

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, description, price, quantity, image, created_at
            FROM products
            ORDER BY created_at, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, description, price, quantity, image, created_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    async fn create(&self, new: &NewProduct) -> Result<InsertOutcome<ProductId>, RepositoryError> {
        let id = ProductId::generate();
        let result = sqlx::query(
            r"
            INSERT INTO products (id, title, description, price, quantity, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.quantity.as_i32())
        .bind(&new.image)
        .execute(&self.pool)
        .await?;

        Ok(InsertOutcome {
            acknowledged: result.rows_affected() == 1,
            inserted_id: id,
        })
    }

    #[instrument(skip(self, patch), fields(product_id = %id))]
    async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<UpdateOutcome, RepositoryError> {
        // `matched` and `modified` come from one statement so they agree.
        let counts = sqlx::query_as::<_, UpdateCounts>(
            r"
            WITH target AS (
                SELECT id FROM products WHERE id = $1
            ),
            updated AS (
                UPDATE products SET
                    title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    price = COALESCE($4, price),
                    quantity = COALESCE($5, quantity),
                    image = COALESCE($6, image)
                WHERE id = $1
                  AND (title, description, price, quantity, image) IS DISTINCT FROM
                      (COALESCE($2, title), COALESCE($3, description), COALESCE($4, price),
                       COALESCE($5, quantity), COALESCE($6, image))
                RETURNING id
            )
            SELECT (SELECT COUNT(*) FROM target) AS matched,
                   (SELECT COUNT(*) FROM updated) AS modified
            ",
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .bind(patch.quantity.map(|q| q.as_i32()))
        .bind(patch.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(UpdateOutcome {
            matched: u64::try_from(counts.matched).unwrap_or_default(),
            modified: u64::try_from(counts.modified).unwrap_or_default(),
        })
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete(&self, id: ProductId) -> Result<DeleteOutcome, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(DeleteOutcome {
            deleted: result.rows_affected(),
        })
    }
}
