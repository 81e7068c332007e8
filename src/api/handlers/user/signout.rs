use axum::{response::Redirect, Extension};
use tracing::{info, instrument};

use crate::api::session::{RequireLogin, Session};

/// Drop the principal, rotate the session token and go back to the index.
#[instrument(skip_all)]
pub async fn signout(
    RequireLogin(user): RequireLogin,
    Extension(session): Extension<Session>,
) -> Redirect {
    session.logout();
    info!("Signed out user {}", user.id);
    Redirect::to("/")
}
