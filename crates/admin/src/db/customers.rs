//! Customer repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use shopdesk_core::{CustomerId, Email};

use super::{CrudRepository, DeleteOutcome, InsertOutcome, RepositoryError, UpdateOutcome};
use crate::models::{Customer, CustomerPatch, NewCustomer};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    phone_number: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
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

/// Repository for the `customers` table.
#[derive(Debug, Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CrudRepository for PgCustomerRepository {
    type Entity = Customer;
    type Id = CustomerId;
    type New = NewCustomer;
    type Patch = CustomerPatch;

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, email, first_name, last_name, phone_number, created_at
            FROM customers
            ORDER BY created_at, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, email, first_name, last_name, phone_number, created_at
            FROM customers
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, new))]
    async fn create(
        &self,
        new: &NewCustomer,
    ) -> Result<InsertOutcome<CustomerId>, RepositoryError> {
        let id = CustomerId::generate();
        let result = sqlx::query(
            r"
            INSERT INTO customers (id, email, first_name, last_name, phone_number)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.phone_number)
        .execute(&self.pool)
        .await?;

        Ok(InsertOutcome {
            acknowledged: result.rows_affected() == 1,
            inserted_id: id,
        })
    }

    #[instrument(skip(self, patch), fields(customer_id = %id))]
    async fn update(
        &self,
        id: CustomerId,
        patch: &CustomerPatch,
    ) -> Result<UpdateOutcome, RepositoryError> {
        let counts = sqlx::query_as::<_, UpdateCounts>(
            r"
            WITH target AS (
                SELECT id FROM customers WHERE id = $1
            ),
            updated AS (
                UPDATE customers SET
                    email = COALESCE($2, email),
                    first_name = COALESCE($3, first_name),
                    last_name = COALESCE($4, last_name),
                    phone_number = COALESCE($5, phone_number)
                WHERE id = $1
                  AND (email, first_name, last_name, phone_number) IS DISTINCT FROM
                      (COALESCE($2, email), COALESCE($3, first_name),
                       COALESCE($4, last_name), COALESCE($5, phone_number))
                RETURNING id
            )
            SELECT (SELECT COUNT(*) FROM target) AS matched,
                   (SELECT COUNT(*) FROM updated) AS modified
            ",
        )
        .bind(id)
        .bind(patch.email.as_ref().map(Email::as_str))
        .bind(patch.first_name.as_deref())
        .bind(patch.last_name.as_deref())
        .bind(patch.phone_number.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(UpdateOutcome {
            matched: u64::try_from(counts.matched).unwrap_or_default(),
            modified: u64::try_from(counts.modified).unwrap_or_default(),
        })
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn delete(&self, id: CustomerId) -> Result<DeleteOutcome, RepositoryError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(DeleteOutcome {
            deleted: result.rows_affected(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ada() -> NewCustomer {
        NewCustomer {
            email: Email::parse("ada@example.com").unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: "+44 20 7946 0000".to_string(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_create_then_list_round_trips(pool: PgPool) {
        let repo = PgCustomerRepository::new(pool);
        let new = ada();

        let id = repo.create(&new).await.unwrap().into_id().unwrap();
        let listed = repo.list().await.unwrap();

        assert_eq!(listed.len(), 1);
        let stored = listed.first().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.email, new.email);
        assert_eq!(stored.first_name, "Ada");
        assert_eq!(stored.phone_number, new.phone_number);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_patch_counts_matched_and_modified(pool: PgPool) {
        let repo = PgCustomerRepository::new(pool);
        let new = ada();
        let id = repo.create(&new).await.unwrap().inserted_id;

        let rename = CustomerPatch {
            last_name: Some("Byron".to_string()),
            ..CustomerPatch::default()
        };
        assert_eq!(
            repo.update(id, &rename).await.unwrap(),
            UpdateOutcome { matched: 1, modified: 1 }
        );
        assert_eq!(
            repo.update(id, &rename).await.unwrap(),
            UpdateOutcome { matched: 1, modified: 0 }
        );

        let stored = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.last_name, "Byron");
        assert_eq!(stored.first_name, "Ada");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_delete_missing_id_deletes_nothing(pool: PgPool) {
        let repo = PgCustomerRepository::new(pool);
        repo.create(&ada()).await.unwrap();

        assert_eq!(repo.delete(CustomerId::generate()).await.unwrap().deleted, 0);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
