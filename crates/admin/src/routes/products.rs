//! Product catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Redirect, Response},
    routing::get,
};
use tracing::instrument;

use shopdesk_core::ProductId;

use super::{ActionFailedTemplate, Intent, PageContext, with_session};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireUser, Session};
use crate::models::{Product, ProductPatch};
use crate::state::AppState;
use crate::validation::{FieldErrors, PRODUCT_FORM_INVALID, ProductForm};

const LIST_PATH: &str = "/dashboard/products";

pub const PRODUCT_CREATED: &str = "Product created successfully";
pub const PRODUCT_UPDATED: &str = "Product updated successfully";
pub const PRODUCT_DELETED: &str = "Product deleted successfully";
pub const PRODUCT_DELETE_FAILED: &str = "An error occurred while deleting the product";

/// Product view for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub quantity: u32,
    pub image: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            quantity: product.quantity.get(),
            image: (!product.image.is_empty()).then(|| product.image.clone()),
        }
    }
}

/// Raw field values shown in the create/edit form.
#[derive(Debug, Clone, Default)]
pub struct ProductFormValues {
    pub name: String,
    pub description: String,
    pub price: String,
    pub quantity: String,
    pub image: String,
}

impl From<&Product> for ProductFormValues {
    fn from(product: &Product) -> Self {
        Self {
            name: product.title.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            quantity: product.quantity.to_string(),
            image: product.image.clone(),
        }
    }
}

impl From<&ProductForm> for ProductFormValues {
    fn from(form: &ProductForm) -> Self {
        Self {
            name: form.name.clone(),
            description: form.description.clone(),
            price: form.price.clone(),
            quantity: form.quantity.clone(),
            image: form.image.clone(),
        }
    }
}

/// Products list page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    /// Form target; also tells the template whether this is an edit.
    pub action: String,
    pub editing: bool,
    pub values: ProductFormValues,
    pub errors: FieldErrors,
    /// Form-level error banner.
    pub message: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LIST_PATH, get(index))
        .route("/dashboard/products/new", get(new_page).post(create))
        .route("/dashboard/products/{id}", get(edit_page).post(edit))
}

/// Look up a product from a raw path segment. Malformed ids are not found.
async fn find(state: &AppState, raw_id: &str) -> Result<Product, AppError> {
    let not_found = || AppError::NotFound("Product not found".to_string());
    let id = ProductId::parse(raw_id).ok_or_else(not_found)?;
    state.products().get_by_id(id).await?.ok_or_else(not_found)
}

/// Products list page handler.
///
/// GET /dashboard/products
#[instrument(skip_all)]
pub async fn index(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let products = state.products().list().await?;
    let template = ProductsIndexTemplate {
        page: PageContext::new(&mut session, Some(&user), LIST_PATH),
        products: products.iter().map(ProductView::from).collect(),
    };
    with_session(&state, &session, template)
}

/// GET /dashboard/products/new
#[instrument(skip_all)]
pub async fn new_page(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let template = ProductFormTemplate {
        page: PageContext::new(&mut session, Some(&user), "/dashboard/products/new"),
        action: "/dashboard/products/new".to_string(),
        editing: false,
        values: ProductFormValues::default(),
        errors: FieldErrors::new(),
        message: None,
    };
    with_session(&state, &session, template)
}

/// POST /dashboard/products/new
#[instrument(skip_all)]
pub async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let new = match form.validate() {
        Ok(new) => new,
        Err(errors) => {
            let template = ProductFormTemplate {
                page: PageContext::new(&mut session, Some(&user), "/dashboard/products/new"),
                action: "/dashboard/products/new".to_string(),
                editing: false,
                values: ProductFormValues::from(&form),
                errors,
                message: Some(PRODUCT_FORM_INVALID.to_string()),
            };
            return with_session(&state, &session, (StatusCode::BAD_REQUEST, template));
        }
    };

    let id = state.products().create(&new).await?.into_id()?;
    tracing::info!(product_id = %id, "Product created");

    session.set_success_message(PRODUCT_CREATED)?;
    with_session(&state, &session, Redirect::to(LIST_PATH))
}

/// GET /dashboard/products/{id}
#[instrument(skip_all)]
pub async fn edit_page(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let product = find(&state, &id).await?;
    let template = ProductFormTemplate {
        page: PageContext::new(&mut session, Some(&user), LIST_PATH),
        action: format!("{LIST_PATH}/{}", product.id),
        editing: true,
        values: ProductFormValues::from(&product),
        errors: FieldErrors::new(),
        message: None,
    };
    with_session(&state, &session, template)
}

/// Save or delete a product, depending on which button was pressed.
///
/// POST /dashboard/products/{id}
#[instrument(skip_all)]
pub async fn edit(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    match Intent::parse(form.intent.as_deref())? {
        Intent::Delete => {
            let deleted = match ProductId::parse(&id) {
                Some(product_id) => state.products().delete(product_id).await?.deleted,
                None => 0,
            };

            if deleted == 0 {
                tracing::warn!(product_id = %id, "Delete matched no product");
                let template = ActionFailedTemplate {
                    page: PageContext::new(&mut session, Some(&user), LIST_PATH),
                    message: PRODUCT_DELETE_FAILED.to_string(),
                    back_href: LIST_PATH.to_string(),
                };
                return with_session(&state, &session, (StatusCode::NOT_FOUND, template));
            }

            tracing::info!(product_id = %id, "Product deleted");
            session.set_success_message(PRODUCT_DELETED)?;
        }
        Intent::Save => {
            let product = find(&state, &id).await?;
            let new = match form.validate() {
                Ok(new) => new,
                Err(errors) => {
                    let template = ProductFormTemplate {
                        page: PageContext::new(&mut session, Some(&user), LIST_PATH),
                        action: format!("{LIST_PATH}/{}", product.id),
                        editing: true,
                        values: ProductFormValues::from(&form),
                        errors,
                        message: Some(PRODUCT_FORM_INVALID.to_string()),
                    };
                    return with_session(&state, &session, (StatusCode::BAD_REQUEST, template));
                }
            };

            let outcome = state
                .products()
                .update(product.id, &ProductPatch::from(new))
                .await?;
            if outcome.matched == 0 {
                return Err(AppError::NotFound("Product not found".to_string()));
            }

            tracing::info!(
                product_id = %product.id,
                modified = outcome.modified,
                "Product updated"
            );
            session.set_success_message(PRODUCT_UPDATED)?;
        }
    }

    with_session(&state, &session, Redirect::to(LIST_PATH))
}
