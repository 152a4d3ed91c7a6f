//! Customer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::{CustomerId, Email};

/// A customer record. Not linked to products or orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// First and last name joined for display; falls back to the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }
}

/// Fields required to insert a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl NewCustomer {
    /// A customer known only by email, as created at signup.
    #[must_use]
    pub const fn from_email(email: Email) -> Self {
        Self {
            email,
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
        }
    }
}

/// Partial update for a customer. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerPatch {
    pub email: Option<Email>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl From<NewCustomer> for CustomerPatch {
    fn from(new: NewCustomer) -> Self {
        Self {
            email: Some(new.email),
            first_name: Some(new.first_name),
            last_name: Some(new.last_name),
            phone_number: Some(new.phone_number),
        }
    }
}
