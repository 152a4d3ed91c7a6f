//! Home page.

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
use crate::middleware::{OptionalUser, Session};
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// GET /
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    mut session: Session,
) -> Result<Response, AppError> {
    let page = PageContext::new(&mut session, user.as_ref(), "/");
    with_session(&state, &session, HomeTemplate { page })
}
