use axum::{
    http::StatusCode,
    response::{Json, Response},
    Extension, Form,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    forms::ProfileForm,
    types::{Envelope, PROFILE_UPDATED},
};
use crate::{
    api::{
        session::{CurrentUser, RequireLogin, Session},
        AppState,
    },
    views,
};

/// Edit page pre-populated from the stored profile.
#[instrument(skip_all)]
pub async fn edit(
    RequireLogin(login): RequireLogin,
    Extension(session): Extension<Session>,
) -> Response {
    let form = ProfileForm::from_user(&login.user);
    let current = CurrentUser::Authenticated(login);
    let flashes = session.take_flashes();
    views::render(StatusCode::OK, &views::edit(&current, &flashes, &form))
}

#[utoipa::path(
    post,
    path = "/userinfo/",
    request_body(content = ProfileForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Outcome of the profile update", body = Envelope),
        (status = 303, description = "Not signed in, redirected to /signin/")
    ),
    tag = "profile"
)]
#[instrument(skip_all)]
pub async fn update(
    RequireLogin(login): RequireLogin,
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<ProfileForm>,
) -> Json<Envelope> {
    info!("Updating user information...");

    let update = match form.validate() {
        Ok(update) => update,
        Err(errors) => return Json(Envelope::invalid(errors)),
    };

    match state.users().update_profile(login.id, &update).await {
        Ok(()) => Json(Envelope::success(PROFILE_UPDATED)),
        Err(err) => {
            warn!("Profile update for user {} failed: {:#}", login.id, err);
            Json(Envelope::failure(err.to_string()))
        }
    }
}
