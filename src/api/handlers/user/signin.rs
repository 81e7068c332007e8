use axum::{
    extract::RawQuery,
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, instrument, warn};

use super::{
    forms::{FormErrors, SigninForm},
    openid::create_or_login,
    utils::{next_or, safe_next},
    PROFILE_PATH, SIGNED_IN,
};
use crate::{
    api::{
        handlers::internal_error,
        session::{CurrentUser, Session},
        AppState, SiteConfig,
    },
    openid::AuthRequest,
    views,
};

fn query_params(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Where the provider sends the browser back, carrying a local `next`.
fn return_to(config: &SiteConfig, next: &str) -> String {
    let base = config.signin_url();
    match safe_next(next) {
        Some(next) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("next", next)
                .finish();
            format!("{base}?{query}")
        }
        None => base,
    }
}

fn render(
    current: &CurrentUser,
    session: &Session,
    form: &SigninForm,
    errors: &FormErrors,
) -> Response {
    let openid_error = session.take_openid_error();
    let flashes = session.take_flashes();
    views::render(
        StatusCode::OK,
        &views::signin(current, &flashes, form, errors, openid_error.as_deref()),
    )
}

/// Sign-in page, password form handler and OpenID return target.
#[instrument(skip_all, fields(method = %method))]
pub async fn signin(
    method: Method,
    Extension(state): Extension<Arc<AppState>>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
    RawQuery(query): RawQuery,
    Form(form): Form<SigninForm>,
) -> Response {
    if current.is_authenticated() {
        return Redirect::to(PROFILE_PATH).into_response();
    }

    let params = query_params(query.as_deref());
    if params.contains_key("openid.mode") {
        return match state
            .openid()
            .complete(&params, &state.config().signin_url())
            .await
        {
            Ok(response) => create_or_login(&state, &session, response, &form.next).await,
            Err(err) => {
                warn!("OpenID sign-in failed: {}", err);
                session.set_openid_error(err.to_string());
                render(&current, &session, &form, &FormErrors::default())
            }
        };
    }

    info!("Signin user: {:?}", form);

    if method != Method::POST {
        return render(&current, &session, &form, &FormErrors::default());
    }

    if form.wants_openid() {
        let identifier = form.openid_identifier.trim().to_string();
        session.set_openid_request(&form.openid_provider, &identifier);
        let request = AuthRequest {
            identifier,
            provider: form.openid_provider.clone(),
            return_to: return_to(state.config(), &form.next),
            realm: state.config().realm(),
        };
        return match state.openid().begin(&request).await {
            Ok(url) => Redirect::to(&url).into_response(),
            Err(err) => {
                warn!("OpenID discovery failed: {}", err);
                session.set_openid_error(err.to_string());
                render(&current, &session, &form, &FormErrors::default())
            }
        };
    }

    match form.validate(state.users()).await {
        Ok(Ok(user)) => {
            info!("Signed in user {}", user.id);
            session.login(user.id, form.remember());
            session.flash(SIGNED_IN, "message");
            Redirect::to(next_or(&form.next, PROFILE_PATH)).into_response()
        }
        Ok(Err(errors)) => render(&current, &session, &form, &errors),
        Err(err) => internal_error(&err),
    }
}
