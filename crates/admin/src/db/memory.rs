//! In-memory repository.
//!
//! Same contract as the `PostgreSQL` repositories, kept in a `Vec` in
//! insertion order. Used by tests and the integration-test harness.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use shopdesk_core::{CustomerId, ProductId};

use super::{CrudRepository, DeleteOutcome, InsertOutcome, RepositoryError, UpdateOutcome};
use crate::models::{Customer, CustomerPatch, NewCustomer, NewProduct, Product, ProductPatch};

/// An entity that [`MemoryRepository`] can store.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Send + Sync;
    type New: Send + Sync;
    type Patch: Send + Sync;

    fn id(&self) -> Self::Id;

    /// Build a stored record, assigning a fresh id.
    fn from_new(new: &Self::New) -> Self;

    /// Apply `patch` in place. Returns `true` if any stored value changed.
    fn apply(&mut self, patch: &Self::Patch) -> bool;
}

/// Vec-backed [`CrudRepository`].
#[derive(Debug)]
pub struct MemoryRepository<R> {
    records: RwLock<Vec<R>>,
    acknowledge_writes: bool,
    unavailable: bool,
}

impl<R: Record> Default for MemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> MemoryRepository<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Start with `records` already stored.
    #[must_use]
    pub fn with_records(records: Vec<R>) -> Self {
        Self {
            records: RwLock::new(records),
            acknowledge_writes: true,
            unavailable: false,
        }
    }

    /// Report every insert as not acknowledged, and store nothing.
    #[must_use]
    pub fn unacknowledged(mut self) -> Self {
        self.acknowledge_writes = false;
        self
    }

    /// Fail every call as if the database connection were lost.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    /// A copy of everything stored.
    pub async fn snapshot(&self) -> Vec<R> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl<R: Record> CrudRepository for MemoryRepository<R> {
    type Entity = R;
    type Id = R::Id;
    type New = R::New;
    type Patch = R::Patch;

    async fn list(&self) -> Result<Vec<R>, RepositoryError> {
        self.ensure_available()?;
        Ok(self.snapshot().await)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.ensure_available()?;
        Ok(self.records.read().await.len() as u64)
    }

    async fn get_by_id(&self, id: R::Id) -> Result<Option<R>, RepositoryError> {
        self.ensure_available()?;
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn create(&self, new: &R::New) -> Result<InsertOutcome<R::Id>, RepositoryError> {
        self.ensure_available()?;
        let record = R::from_new(new);
        let inserted_id = record.id();
        if self.acknowledge_writes {
            self.records.write().await.push(record);
        }
        Ok(InsertOutcome {
            acknowledged: self.acknowledge_writes,
            inserted_id,
        })
    }

    async fn update(&self, id: R::Id, patch: &R::Patch) -> Result<UpdateOutcome, RepositoryError> {
        self.ensure_available()?;
        let mut records = self.records.write().await;
        Ok(records
            .iter_mut()
            .find(|r| r.id() == id)
            .map_or_else(UpdateOutcome::default, |record| UpdateOutcome {
                matched: 1,
                modified: u64::from(record.apply(patch)),
            }))
    }

    async fn delete(&self, id: R::Id) -> Result<DeleteOutcome, RepositoryError> {
        self.ensure_available()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id() != id);
        Ok(DeleteOutcome {
            deleted: (before - records.len()) as u64,
        })
    }
}

/// Overwrite `field` with `value` if given and different.
fn assign<T: PartialEq + Clone>(field: &mut T, value: Option<&T>) -> bool {
    match value {
        Some(value) if value != field => {
            field.clone_from(value);
            true
        }
        _ => false,
    }
}

impl Record for Product {
    type Id = ProductId;
    type New = NewProduct;
    type Patch = ProductPatch;

    fn id(&self) -> ProductId {
        self.id
    }

    fn from_new(new: &NewProduct) -> Self {
        Self {
            id: ProductId::generate(),
            title: new.title.clone(),
            description: new.description.clone(),
            price: new.price,
            quantity: new.quantity,
            image: new.image.clone(),
            created_at: Utc::now(),
        }
    }

    fn apply(&mut self, patch: &ProductPatch) -> bool {
        assign(&mut self.title, patch.title.as_ref())
            | assign(&mut self.description, patch.description.as_ref())
            | assign(&mut self.price, patch.price.as_ref())
            | assign(&mut self.quantity, patch.quantity.as_ref())
            | assign(&mut self.image, patch.image.as_ref())
    }
}

impl Record for Customer {
    type Id = CustomerId;
    type New = NewCustomer;
    type Patch = CustomerPatch;

    fn id(&self) -> CustomerId {
        self.id
    }

    fn from_new(new: &NewCustomer) -> Self {
        Self {
            id: CustomerId::generate(),
            email: new.email.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            phone_number: new.phone_number.clone(),
            created_at: Utc::now(),
        }
    }

    fn apply(&mut self, patch: &CustomerPatch) -> bool {
        assign(&mut self.email, patch.email.as_ref())
            | assign(&mut self.first_name, patch.first_name.as_ref())
            | assign(&mut self.last_name, patch.last_name.as_ref())
            | assign(&mut self.phone_number, patch.phone_number.as_ref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopdesk_core::{Email, Price, Quantity};

    use super::*;

    fn mug() -> NewProduct {
        NewProduct {
            title: "Mug".to_string(),
            description: "Ceramic mug".to_string(),
            price: Price::from(12),
            quantity: Quantity::new(5).unwrap(),
            image: "https://img.example.com/mug.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_fields() {
        let repo = MemoryRepository::<Product>::new();
        let new = mug();

        let id = repo.create(&new).await.unwrap().into_id().unwrap();
        let stored = repo.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.title, new.title);
        assert_eq!(stored.description, new.description);
        assert_eq!(stored.price, new.price);
        assert_eq!(stored.quantity, new.quantity);
        assert_eq!(stored.image, new.image);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_none() {
        let repo = MemoryRepository::<Product>::new();
        let id = repo.create(&mug()).await.unwrap().inserted_id;

        assert_eq!(repo.delete(id).await.unwrap().deleted, 1);
        assert!(repo.get_by_id(id).await.unwrap().is_none());
        assert_eq!(repo.delete(id).await.unwrap().deleted, 0);
    }

    #[tokio::test]
    async fn test_update_price_only() {
        let repo = MemoryRepository::<Product>::new();
        let id = repo.create(&mug()).await.unwrap().inserted_id;
        let before = repo.get_by_id(id).await.unwrap().unwrap();

        let patch = ProductPatch {
            price: Some(Price::from(50)),
            ..ProductPatch::default()
        };
        let outcome = repo.update(id, &patch).await.unwrap();

        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });
        let after = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(after.price, Price::from(50));
        assert_eq!(
            Product {
                price: before.price,
                ..after
            },
            before
        );
    }

    #[tokio::test]
    async fn test_update_with_same_values_matches_without_modifying() {
        let repo = MemoryRepository::<Product>::new();
        let new = mug();
        let id = repo.create(&new).await.unwrap().inserted_id;

        let outcome = repo.update(id, &ProductPatch::from(new)).await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });
    }

    #[tokio::test]
    async fn test_update_missing_matches_nothing() {
        let repo = MemoryRepository::<Product>::new();
        let outcome = repo
            .update(ProductId::generate(), &ProductPatch::default())
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let repo = MemoryRepository::<Customer>::new();
        for email in ["a@b.com", "c@d.com", "e@f.com"] {
            repo.create(&NewCustomer::from_email(Email::parse(email).unwrap()))
                .await
                .unwrap();
        }

        let emails: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.email.into_inner())
            .collect();
        assert_eq!(emails, ["a@b.com", "c@d.com", "e@f.com"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unacknowledged_insert_stores_nothing() {
        let repo = MemoryRepository::<Product>::new().unacknowledged();
        let outcome = repo.create(&mug()).await.unwrap();

        assert!(!outcome.acknowledged);
        assert!(matches!(
            outcome.into_id(),
            Err(RepositoryError::NotAcknowledged)
        ));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_repository_fails_every_call() {
        let repo = MemoryRepository::<Product>::new().unavailable();

        assert!(matches!(repo.count().await, Err(RepositoryError::Database(_))));
        assert!(matches!(repo.list().await, Err(RepositoryError::Database(_))));
        assert!(repo.create(&mug()).await.is_err());
        assert!(repo.snapshot().await.is_empty());
    }
}
