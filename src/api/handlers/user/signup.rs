use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    forms::{FormErrors, SignupForm},
    PROFILE_PATH,
};
use crate::{
    api::{
        handlers::internal_error,
        session::{CurrentUser, Session},
        AppState,
    },
    store::CreateUserOutcome,
    views,
};

fn render(current: &CurrentUser, session: &Session, form: &SignupForm, errors: &FormErrors) -> Response {
    let flashes = session.take_flashes();
    views::render(StatusCode::OK, &views::signup(current, &flashes, form, errors))
}

/// Registration page. A GET may carry `email`, `nickname` and `next` to
/// pre-fill the form after an unknown OpenID identity.
#[instrument(skip_all, fields(method = %method))]
pub async fn signup(
    method: Method,
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
    Form(form): Form<SignupForm>,
) -> Response {
    if current.is_authenticated() {
        return Redirect::to(PROFILE_PATH).into_response();
    }

    info!("Signup user: {:?}", form);

    if method != Method::POST {
        return render(&current, &session, &form, &FormErrors::default());
    }

    let new_user = match form.validate(state.users()).await {
        Ok(Ok(new_user)) => new_user,
        Ok(Err(errors)) => return render(&current, &session, &form, &errors),
        Err(err) => return internal_error(&err),
    };

    match state.users().create_user(&new_user).await {
        Ok(CreateUserOutcome::Created(id)) => {
            info!("Created user {} <{}>", id, new_user.email);
            Redirect::to("/signin/").into_response()
        }
        Ok(CreateUserOutcome::EmailTaken) => {
            let mut errors = FormErrors::default();
            errors.add("email", "Email is already registered");
            render(&current, &session, &form, &errors)
        }
        Err(err) => internal_error(&err),
    }
}
