//! Data access for the dashboard.
//!
//! # Tables
//!
//! - `products` - Catalog entries
//! - `customers` - Customer records (no link to products)
//!
//! Both tables sit behind the same [`CrudRepository`] contract. The
//! `PostgreSQL` implementations are used in production; [`MemoryRepository`]
//! backs tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p shopdesk-cli -- migrate
//! ```

pub mod customers;
pub mod memory;
pub mod products;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use customers::PgCustomerRepository;
pub use memory::{MemoryRepository, Record};
pub use products::PgProductRepository;

use crate::models::{Customer, CustomerPatch, NewCustomer, NewProduct, Product, ProductPatch};
use shopdesk_core::{CustomerId, ProductId};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store did not acknowledge a write.
    #[error("write not acknowledged")]
    NotAcknowledged,
}

/// Result of [`CrudRepository::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome<Id> {
    pub acknowledged: bool,
    pub inserted_id: Id,
}

impl<Id> InsertOutcome<Id> {
    /// The new id, or `NotAcknowledged` if the store did not confirm the write.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotAcknowledged` for unacknowledged inserts.
    pub fn into_id(self) -> Result<Id, RepositoryError> {
        if self.acknowledged {
            Ok(self.inserted_id)
        } else {
            Err(RepositoryError::NotAcknowledged)
        }
    }
}

/// Result of [`CrudRepository::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Rows whose id matched.
    pub matched: u64,
    /// Rows whose stored values actually changed.
    pub modified: u64,
}

/// Result of [`CrudRepository::delete`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: u64,
}

/// Uniform create/read/update/delete over one entity kind.
///
/// Every call is a single statement. Concurrent updates to one entity are
/// last-write-wins.
#[async_trait]
pub trait CrudRepository: Send + Sync {
    type Entity: Send;
    type Id: Copy + Send + Sync;
    type New: Send + Sync;
    type Patch: Send + Sync;

    /// All entities, oldest first.
    async fn list(&self) -> Result<Vec<Self::Entity>, RepositoryError>;

    /// Number of stored entities.
    async fn count(&self) -> Result<u64, RepositoryError>;

    async fn get_by_id(&self, id: Self::Id) -> Result<Option<Self::Entity>, RepositoryError>;

    async fn create(&self, new: &Self::New) -> Result<InsertOutcome<Self::Id>, RepositoryError>;

    /// Write the `Some` fields of `patch`.
    async fn update(
        &self,
        id: Self::Id,
        patch: &Self::Patch,
    ) -> Result<UpdateOutcome, RepositoryError>;

    /// Hard delete.
    async fn delete(&self, id: Self::Id) -> Result<DeleteOutcome, RepositoryError>;
}

/// Product storage as held by the application state.
pub type DynProductRepository = dyn CrudRepository<
        Entity = Product,
        Id = ProductId,
        New = NewProduct,
        Patch = ProductPatch,
    >;

/// Customer storage as held by the application state.
pub type DynCustomerRepository = dyn CrudRepository<
        Entity = Customer,
        Id = CustomerId,
        New = NewCustomer,
        Patch = CustomerPatch,
    >;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_outcome_into_id() {
        let ok = InsertOutcome {
            acknowledged: true,
            inserted_id: 7,
        };
        assert_eq!(ok.into_id().ok(), Some(7));

        let lost = InsertOutcome {
            acknowledged: false,
            inserted_id: 7,
        };
        assert!(matches!(lost.into_id(), Err(RepositoryError::NotAcknowledged)));
    }
}
