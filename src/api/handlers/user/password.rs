use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    forms::{EditPassForm, FormErrors},
    utils::next_or,
    PROFILE_PATH,
};
use crate::{
    api::{
        handlers::internal_error,
        session::{CurrentUser, LoginUser, RequireLogin, Session},
        AppState,
    },
    views,
};

pub const PASSWORD_UPDATED: &str = "Password updated";
pub const PASSWORD_NOT_UPDATED: &str = "Password could not be updated";

fn render(login: LoginUser, session: &Session, form: &EditPassForm, errors: &FormErrors) -> Response {
    let current = CurrentUser::Authenticated(login);
    let flashes = session.take_flashes();
    views::render(StatusCode::OK, &views::edit_pass(&current, &flashes, form, errors))
}

#[instrument(skip_all, fields(method = %method))]
pub async fn edit_pass(
    method: Method,
    RequireLogin(login): RequireLogin,
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Form(form): Form<EditPassForm>,
) -> Response {
    if method != Method::POST {
        return render(login, &session, &form, &FormErrors::default());
    }

    match form.validate(&login.user).await {
        Ok(Ok(password_hash)) => {
            if let Err(err) = state.users().set_password(login.id, &password_hash).await {
                return internal_error(&err);
            }
            info!("Password updated for user {}", login.id);
            session.flash(PASSWORD_UPDATED, "success");
            Redirect::to(next_or(&form.next, PROFILE_PATH)).into_response()
        }
        Ok(Err(errors)) => {
            session.flash(PASSWORD_NOT_UPDATED, "error");
            render(login, &session, &form, &errors)
        }
        Err(err) => internal_error(&err),
    }
}
