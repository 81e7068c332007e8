use axum::{http::StatusCode, response::Response, Extension};

use super::not_found_page;
use crate::{
    api::session::{CurrentUser, Session},
    views,
};

/// Site index, also the sign-out target.
pub async fn index(current: CurrentUser, Extension(session): Extension<Session>) -> Response {
    let flashes = session.take_flashes();
    views::render(StatusCode::OK, &views::index(&current, &flashes))
}

pub async fn fallback(current: CurrentUser, Extension(session): Extension<Session>) -> Response {
    not_found_page(&current, &session)
}
