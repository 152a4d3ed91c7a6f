//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::State,
    response::Response,
    routing::get,
};
use tracing::instrument;

use super::{PageContext, with_session};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireUser, Session};
use crate::state::AppState;

/// Dashboard metrics.
#[derive(Debug, Clone, Default)]
pub struct DashboardMetrics {
    pub products: u64,
    pub customers: u64,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub metrics: DashboardMetrics,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(index))
}

/// GET /dashboard
#[instrument(skip_all)]
pub async fn index(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let products = state.products().count().await?;
    let customers = state.customers().count().await?;

    let template = DashboardTemplate {
        page: PageContext::new(&mut session, Some(&user), "/dashboard"),
        metrics: DashboardMetrics {
            products,
            customers,
        },
    };
    with_session(&state, &session, template)
}
