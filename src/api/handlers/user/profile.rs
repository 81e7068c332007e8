use axum::{
    extract::Path,
    http::StatusCode,
    response::Response,
    Extension,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::slug::is_numeric_id;
use crate::{
    api::{
        handlers::{internal_error, not_found_page},
        session::{CurrentUser, RequireLogin, Session},
        AppState,
    },
    views,
};

/// `/profile/` shows the caller; `/profile/<digits>` looks up an id and
/// anything else a slug.
#[instrument(skip_all)]
pub async fn profile(
    RequireLogin(login): RequireLogin,
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<Session>,
    slug_or_id: Option<Path<String>>,
) -> Response {
    let current = CurrentUser::Authenticated(login.clone());

    let Some(Path(slug_or_id)) = slug_or_id else {
        let flashes = session.take_flashes();
        return views::render(StatusCode::OK, &views::profile(&current, &flashes, &login.user));
    };

    let lookup = if is_numeric_id(&slug_or_id) {
        match slug_or_id.parse::<i64>() {
            Ok(id) => state.users().find_user_by_id(id).await,
            Err(_) => Ok(None),
        }
    } else {
        state.users().find_user_by_slug(&slug_or_id).await
    };

    match lookup {
        Ok(Some(user)) => {
            let flashes = session.take_flashes();
            views::render(StatusCode::OK, &views::profile(&current, &flashes, &user))
        }
        Ok(None) => {
            debug!("No profile for {}", slug_or_id);
            not_found_page(&current, &session)
        }
        Err(err) => internal_error(&err),
    }
}
