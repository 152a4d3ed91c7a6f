//! Seed the database with demo products and customers.
//!
//! Seed data is YAML. Every entry is validated before the database is
//! touched, then inserted through the same repositories the dashboard uses.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use shopdesk_admin::db::{self, CrudRepository, PgCustomerRepository, PgProductRepository};
use shopdesk_admin::models::{NewCustomer, NewProduct};
use shopdesk_core::{Email, Price, Quantity};

/// Bundled demo data.
const DEMO_SEED: &str = include_str!("../../seed/demo.yaml");

/// A seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub customers: Vec<SeedCustomer>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub title: String,
    pub description: String,
    /// Decimal amount as text, e.g. `"12.50"`.
    pub price: String,
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedCustomer {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Seed data that passed validation.
#[derive(Debug, Default)]
pub struct ValidatedSeed {
    pub products: Vec<NewProduct>,
    pub customers: Vec<NewCustomer>,
}

/// Check every entry, collecting one message per bad entry.
///
/// # Errors
///
/// Returns the list of problems if any entry is invalid.
pub fn validate(seed: SeedFile) -> Result<ValidatedSeed, Vec<String>> {
    let mut errors = Vec::new();
    let mut validated = ValidatedSeed::default();

    for (i, product) in seed.products.into_iter().enumerate() {
        if product.title.trim().is_empty() {
            errors.push(format!("products[{i}]: title is required"));
            continue;
        }
        let price = Price::parse(&product.price)
            .map_err(|e| errors.push(format!("products[{i}] ({}): {e}", product.title)));
        let quantity = Quantity::new(product.quantity)
            .map_err(|e| errors.push(format!("products[{i}] ({}): {e}", product.title)));
        if let (Ok(price), Ok(quantity)) = (price, quantity) {
            validated.products.push(NewProduct {
                title: product.title,
                description: product.description,
                price,
                quantity,
                image: product.image,
            });
        }
    }

    for (i, customer) in seed.customers.into_iter().enumerate() {
        match Email::parse(customer.email.trim()) {
            Ok(email) => validated.customers.push(NewCustomer {
                email,
                first_name: customer.first_name,
                last_name: customer.last_name,
                phone_number: customer.phone_number,
            }),
            Err(e) => errors.push(format!("customers[{i}] ({}): {e}", customer.email)),
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}

/// Load, validate and insert seed data.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a database operation fails.
pub async fn run(file: Option<&str>, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let content = match file {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(format!("File not found: {file_path}").into());
            }
            info!(path = %file_path, "Loading seed data from file");
            tokio::fs::read_to_string(path).await?
        }
        None => {
            info!("Loading bundled demo data");
            DEMO_SEED.to_string()
        }
    };

    // Read and validate YAML before connecting to database
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    let seed = validate(seed).map_err(|errors| {
        error!("Seed data validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        format!("{} validation errors found", errors.len())
    })?;

    info!(
        products = seed.products.len(),
        customers = seed.customers.len(),
        "Seed data validated"
    );

    if dry_run {
        info!("Dry run, nothing inserted");
        return Ok(());
    }

    let database_url = super::database_url().ok_or("ADMIN_DATABASE_URL not set")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let products = PgProductRepository::new(pool.clone());
    for product in &seed.products {
        let id = products.create(product).await?.into_id()?;
        info!(%id, title = %product.title, "Inserted product");
    }

    let customers = PgCustomerRepository::new(pool.clone());
    for customer in &seed.customers {
        let id = customers.create(customer).await?.into_id()?;
        info!(%id, email = %customer.email, "Inserted customer");
    }

    info!("Seeding complete!");
    pool.close().await;
    Ok(())
}
