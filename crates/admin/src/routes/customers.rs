//! Customer route handlers.

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

use shopdesk_core::CustomerId;

use super::{ActionFailedTemplate, Intent, PageContext, with_session};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireUser, Session};
use crate::models::{Customer, CustomerPatch};
use crate::state::AppState;
use crate::validation::{CUSTOMER_FORM_INVALID, CustomerForm, FieldErrors};

const LIST_PATH: &str = "/dashboard/customer";
const NEW_PATH: &str = "/dashboard/customer/new";

pub const CUSTOMER_CREATED: &str = "Customer created successfully.";
pub const CUSTOMER_UPDATED: &str = "Customer updated successfully.";
pub const CUSTOMER_DELETED: &str = "Customer deleted successfully.";
pub const CUSTOMER_DELETE_FAILED: &str = "Failed to delete the customer.";

/// Customer view for templates.
#[derive(Debug, Clone)]
pub struct CustomerView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub created_at: String,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.to_string(),
            name: customer.display_name(),
            email: customer.email.to_string(),
            phone_number: customer.phone_number.clone(),
            created_at: customer.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Raw field values shown in the create/edit form.
#[derive(Debug, Clone, Default)]
pub struct CustomerFormValues {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
}

impl From<&Customer> for CustomerFormValues {
    fn from(customer: &Customer) -> Self {
        Self {
            email: customer.email.to_string(),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            phone_number: customer.phone_number.clone(),
        }
    }
}

impl From<&CustomerForm> for CustomerFormValues {
    fn from(form: &CustomerForm) -> Self {
        Self {
            email: form.email.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            phone_number: form.phone_number.clone(),
        }
    }
}

/// Customers list page template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersIndexTemplate {
    pub page: PageContext,
    pub customers: Vec<CustomerView>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/form.html")]
pub struct CustomerFormTemplate {
    pub page: PageContext,
    pub action: String,
    pub editing: bool,
    pub values: CustomerFormValues,
    pub errors: FieldErrors,
    pub message: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LIST_PATH, get(index))
        .route(NEW_PATH, get(new_page).post(create))
        .route("/dashboard/customer/{id}", get(edit_page).post(edit))
}

async fn find(state: &AppState, raw_id: &str) -> Result<Customer, AppError> {
    let not_found = || AppError::NotFound("Customer not found".to_string());
    let id = CustomerId::parse(raw_id).ok_or_else(not_found)?;
    state.customers().get_by_id(id).await?.ok_or_else(not_found)
}

/// Customers list page handler.
///
/// GET /dashboard/customer
#[instrument(skip_all)]
pub async fn index(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let customers = state.customers().list().await?;
    let template = CustomersIndexTemplate {
        page: PageContext::new(&mut session, Some(&user), LIST_PATH),
        customers: customers.iter().map(CustomerView::from).collect(),
    };
    with_session(&state, &session, template)
}

/// GET /dashboard/customer/new
#[instrument(skip_all)]
pub async fn new_page(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let template = CustomerFormTemplate {
        page: PageContext::new(&mut session, Some(&user), NEW_PATH),
        action: NEW_PATH.to_string(),
        editing: false,
        values: CustomerFormValues::default(),
        errors: FieldErrors::new(),
        message: None,
    };
    with_session(&state, &session, template)
}

/// POST /dashboard/customer/new
#[instrument(skip_all)]
pub async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    let new = match form.validate() {
        Ok(new) => new,
        Err(errors) => {
            let template = CustomerFormTemplate {
                page: PageContext::new(&mut session, Some(&user), NEW_PATH),
                action: NEW_PATH.to_string(),
                editing: false,
                values: CustomerFormValues::from(&form),
                errors,
                message: Some(CUSTOMER_FORM_INVALID.to_string()),
            };
            return with_session(&state, &session, (StatusCode::BAD_REQUEST, template));
        }
    };

    let id = state.customers().create(&new).await?.into_id()?;
    tracing::info!(customer_id = %id, "Customer created");

    session.set_success_message(CUSTOMER_CREATED)?;
    with_session(&state, &session, Redirect::to(LIST_PATH))
}

/// GET /dashboard/customer/{id}
#[instrument(skip_all)]
pub async fn edit_page(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let customer = find(&state, &id).await?;
    let template = CustomerFormTemplate {
        page: PageContext::new(&mut session, Some(&user), LIST_PATH),
        action: format!("{LIST_PATH}/{}", customer.id),
        editing: true,
        values: CustomerFormValues::from(&customer),
        errors: FieldErrors::new(),
        message: None,
    };
    with_session(&state, &session, template)
}

/// Save or delete a customer, depending on which button was pressed.
///
/// POST /dashboard/customer/{id}
#[instrument(skip_all)]
pub async fn edit(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<String>,
    Form(form): Form<CustomerForm>,
) -> Result<Response, AppError> {
    match Intent::parse(form.intent.as_deref())? {
        Intent::Delete => {
            let deleted = match CustomerId::parse(&id) {
                Some(customer_id) => state.customers().delete(customer_id).await?.deleted,
                None => 0,
            };

            if deleted == 0 {
                tracing::warn!(customer_id = %id, "Delete matched no customer");
                let template = ActionFailedTemplate {
                    page: PageContext::new(&mut session, Some(&user), LIST_PATH),
                    message: CUSTOMER_DELETE_FAILED.to_string(),
                    back_href: LIST_PATH.to_string(),
                };
                return with_session(&state, &session, (StatusCode::NOT_FOUND, template));
            }

            tracing::info!(customer_id = %id, "Customer deleted");
            session.set_success_message(CUSTOMER_DELETED)?;
        }
        Intent::Save => {
            let customer = find(&state, &id).await?;
            let new = match form.validate() {
                Ok(new) => new,
                Err(errors) => {
                    let template = CustomerFormTemplate {
                        page: PageContext::new(&mut session, Some(&user), LIST_PATH),
                        action: format!("{LIST_PATH}/{}", customer.id),
                        editing: true,
                        values: CustomerFormValues::from(&form),
                        errors,
                        message: Some(CUSTOMER_FORM_INVALID.to_string()),
                    };
                    return with_session(&state, &session, (StatusCode::BAD_REQUEST, template));
                }
            };

            let outcome = state
                .customers()
                .update(customer.id, &CustomerPatch::from(new))
                .await?;
            if outcome.matched == 0 {
                return Err(AppError::NotFound("Customer not found".to_string()));
            }

            tracing::info!(
                customer_id = %customer.id,
                modified = outcome.modified,
                "Customer updated"
            );
            session.set_success_message(CUSTOMER_UPDATED)?;
        }
    }

    with_session(&state, &session, Redirect::to(LIST_PATH))
}
