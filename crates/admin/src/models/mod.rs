//! Domain models for the admin dashboard.

pub mod customer;
pub mod product;
pub mod session;

pub use customer::{Customer, CustomerPatch, NewCustomer};
pub use product::{NewProduct, Product, ProductPatch};
pub use session::{CurrentUser, Toast, ToastKind, keys as session_keys};
