use anyhow::Result;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, uri::PathAndQuery},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, warn};

use super::Session;
use crate::{
    api::{handlers::server_error_page, AppState},
    store::{User, UserInfo},
};

pub const LOGIN_MESSAGE: &str = "Please sign in to access this page";

/// A signed-in user, loaded for the current request.
#[derive(Clone, Debug)]
pub struct LoginUser {
    pub id: i64,
    pub user: User,
}

impl LoginUser {
    #[must_use]
    pub fn new(user: User) -> Self {
        Self { id: user.id, user }
    }
}

/// Guest placeholder carrying a display-only user.
#[derive(Clone, Debug)]
pub struct Anonymous {
    pub user: User,
}

impl Default for Anonymous {
    fn default() -> Self {
        Self {
            user: User {
                id: 0,
                email: String::new(),
                nickname: "Guest".to_string(),
                slug: None,
                password: String::new(),
                info: UserInfo::default(),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub enum CurrentUser {
    Authenticated(LoginUser),
    Anonymous(Anonymous),
}

impl CurrentUser {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn user(&self) -> &User {
        match self {
            Self::Authenticated(login) => &login.user,
            Self::Anonymous(anonymous) => &anonymous.user,
        }
    }
}

fn request_context(parts: &Parts) -> Result<(Arc<AppState>, Session), Response> {
    let state = parts.extensions.get::<Arc<AppState>>().cloned();
    let session = parts.extensions.get::<Session>().cloned();
    match (state, session) {
        (Some(state), Some(session)) => Ok((state, session)),
        _ => {
            error!("Session middleware is not installed");
            Err(server_error_page())
        }
    }
}

/// Resolve the session principal. Ids that no longer exist count as anonymous.
async fn user_loader(state: &AppState, session: &Session) -> Result<CurrentUser> {
    let Some(id) = session.user_id() else {
        return Ok(CurrentUser::Anonymous(Anonymous::default()));
    };
    match state.users().find_user_by_id(id).await? {
        Some(user) => Ok(CurrentUser::Authenticated(LoginUser::new(user))),
        None => {
            warn!("Session refers to missing user {}", id);
            Ok(CurrentUser::Anonymous(Anonymous::default()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<Self>() {
            return Ok(current.clone());
        }
        let (state, session) = request_context(parts)?;
        let current = user_loader(&state, &session).await.map_err(|err| {
            error!("Failed to load current user: {:#}", err);
            server_error_page()
        })?;
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}

/// Extractor for routes that need a signed-in user.
///
/// Anonymous callers get a flash and a redirect to `/signin/?next=<uri>`.
#[derive(Clone, Debug)]
pub struct RequireLogin(pub LoginUser);

pub(crate) fn signin_redirect(next: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("/signin/?{query}")
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireLogin
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await? {
            CurrentUser::Authenticated(login) => Ok(Self(login)),
            CurrentUser::Anonymous(_) => {
                let (_, session) = request_context(parts)?;
                session.flash(LOGIN_MESSAGE, "info");
                let next = parts
                    .uri
                    .path_and_query()
                    .map_or("/", PathAndQuery::as_str);
                Err(Redirect::to(&signin_redirect(next)).into_response())
            }
        }
    }
}
