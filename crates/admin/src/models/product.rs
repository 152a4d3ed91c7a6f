//! Product catalog entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{Price, ProductId, Quantity};

/// A product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub quantity: Quantity,
    /// Image URI, stored as entered.
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a product. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub quantity: Quantity,
    pub image: String,
}

/// Partial update for a product. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub image: Option<String>,
}

impl From<NewProduct> for ProductPatch {
    fn from(new: NewProduct) -> Self {
        Self {
            title: Some(new.title),
            description: Some(new.description),
            price: Some(new.price),
            quantity: Some(new.quantity),
            image: Some(new.image),
        }
    }
}
