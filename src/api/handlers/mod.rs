//! Route handlers for the account pages.

pub mod health;
pub mod root;
pub mod user;

use axum::{http::StatusCode, response::Response};
use tracing::error;

use crate::{
    api::session::{CurrentUser, Session},
    views,
};

/// Bare 500 page; it does not depend on the session or the current user.
pub(crate) fn server_error_page() -> Response {
    views::server_error()
}

/// Log an unexpected failure and answer with the 500 page.
pub(crate) fn internal_error(err: &anyhow::Error) -> Response {
    error!("Request failed: {:#}", err);
    server_error_page()
}

pub(crate) fn not_found_page(current: &CurrentUser, session: &Session) -> Response {
    let flashes = session.take_flashes();
    views::render(StatusCode::NOT_FOUND, &views::not_found(current, &flashes))
}
