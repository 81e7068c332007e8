//! Login manager: server-side sessions, flash messages and the current user.
//!
//! The [`middleware`] loads the session named by the `scriptfan_session`
//! cookie before the handler runs and writes it back afterwards, only when
//! something changed. An unchanged session past half its lifetime has its
//! expiry pushed back instead. Handlers reach it through `Extension<Session>`.

mod cookie;
mod current_user;

pub use current_user::{Anonymous, CurrentUser, LoginUser, RequireLogin, LOGIN_MESSAGE};

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
    Extension,
};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{
    api::{AppState, SiteConfig},
    store::{SessionRecord, SessionStore, StoredSession},
};

/// A one-time notice shown on the next rendered page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: String,
    pub message: String,
}

/// Everything besides the principal that lives in `sessions.data`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    openid_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    openid_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_openid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    openid_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flashes: Vec<Flash>,
}

impl SessionData {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default)]
struct Inner {
    token: Option<String>,
    user_id: Option<i64>,
    remember: bool,
    data: SessionData,
    /// Seconds left on the stored row when it was loaded.
    expires_in: Option<i64>,
    dirty: bool,
    rotate: bool,
}

/// Pending write produced once the handler is done.
#[derive(Debug)]
struct Change {
    token: Option<String>,
    user_id: Option<i64>,
    remember: bool,
    data: SessionData,
    rotate: bool,
}

impl Change {
    fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.data.is_empty()
    }
}

/// Request-scoped session handle. Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    fn restore(token: String, stored: StoredSession) -> Self {
        let StoredSession { record, expires_in } = stored;
        let data = serde_json::from_value(record.data).unwrap_or_else(|err| {
            warn!("Discarding unreadable session data: {}", err);
            SessionData::default()
        });
        Self {
            inner: Arc::new(Mutex::new(Inner {
                token: Some(token),
                user_id: record.user_id,
                remember: record.remember,
                data,
                expires_in: Some(expires_in),
                dirty: false,
                rotate: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.lock().user_id
    }

    /// Bind the session to `user_id`; the token is replaced on save.
    pub fn login(&self, user_id: i64, remember: bool) {
        let mut inner = self.lock();
        inner.user_id = Some(user_id);
        inner.remember = remember;
        inner.rotate = true;
        inner.dirty = true;
    }

    /// Drop the principal and its OpenID marker, keeping queued flashes.
    pub fn logout(&self) {
        let mut inner = self.lock();
        inner.user_id = None;
        inner.remember = false;
        inner.data.current_openid = None;
        inner.rotate = true;
        inner.dirty = true;
    }

    /// Remember which provider and identifier the pending OpenID sign-in used.
    pub fn set_openid_request(&self, provider: &str, identifier: &str) {
        let mut inner = self.lock();
        inner.data.openid_provider = Some(provider.to_string());
        inner.data.openid_identifier = Some(identifier.to_string());
        inner.dirty = true;
    }

    #[must_use]
    pub fn openid_provider(&self) -> Option<String> {
        self.lock().data.openid_provider.clone()
    }

    #[must_use]
    pub fn openid_identifier(&self) -> Option<String> {
        self.lock().data.openid_identifier.clone()
    }

    pub fn set_current_openid(&self, identity_url: &str) {
        let mut inner = self.lock();
        inner.data.current_openid = Some(identity_url.to_string());
        inner.dirty = true;
    }

    #[must_use]
    pub fn current_openid(&self) -> Option<String> {
        self.lock().data.current_openid.clone()
    }

    pub fn set_openid_error(&self, message: String) {
        let mut inner = self.lock();
        inner.data.openid_error = Some(message);
        inner.dirty = true;
    }

    /// Pop the pending OpenID error, if any.
    pub fn take_openid_error(&self) -> Option<String> {
        let mut inner = self.lock();
        let error = inner.data.openid_error.take();
        if error.is_some() {
            inner.dirty = true;
        }
        error
    }

    pub fn flash(&self, message: &str, category: &str) {
        let mut inner = self.lock();
        inner.data.flashes.push(Flash {
            category: category.to_string(),
            message: message.to_string(),
        });
        inner.dirty = true;
    }

    /// Drain queued flash messages for rendering.
    pub fn take_flashes(&self) -> Vec<Flash> {
        let mut inner = self.lock();
        let flashes = std::mem::take(&mut inner.data.flashes);
        if !flashes.is_empty() {
            inner.dirty = true;
        }
        flashes
    }

    /// Token, remember flag and remaining seconds of a loaded session.
    fn stored_lifetime(&self) -> Option<(String, bool, i64)> {
        let inner = self.lock();
        Some((inner.token.clone()?, inner.remember, inner.expires_in?))
    }

    fn take_change(&self) -> Option<Change> {
        let mut inner = self.lock();
        if !inner.dirty {
            return None;
        }
        inner.dirty = false;
        Some(Change {
            token: inner.token.clone(),
            user_id: inner.user_id,
            remember: inner.remember,
            data: inner.data.clone(),
            rotate: std::mem::take(&mut inner.rotate),
        })
    }
}

/// Load the session before the handler runs and persist it afterwards.
pub async fn middleware(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = load(&state, request.headers()).await;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    match persist(&state, &session).await {
        Ok(Some(cookie)) => {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
        Ok(None) => {}
        Err(err) => error!("Failed to persist session: {:#}", err),
    }

    response
}

async fn load(state: &AppState, headers: &HeaderMap) -> Session {
    let Some(token) = cookie::extract_session_token(headers) else {
        return Session::default();
    };

    match state
        .sessions()
        .load_session(&cookie::hash_session_token(&token))
        .await
    {
        Ok(Some(stored)) => Session::restore(token, stored),
        Ok(None) => {
            debug!("Session cookie did not match a live session");
            Session::default()
        }
        Err(err) => {
            error!("Failed to load session: {:#}", err);
            Session::default()
        }
    }
}

fn ttl_seconds(config: &SiteConfig, remember: bool) -> i64 {
    if remember {
        config.remember_ttl_seconds()
    } else {
        config.session_ttl_seconds()
    }
}

/// Slide the expiry of an unchanged session once half its lifetime is used.
async fn refresh(state: &AppState, session: &Session) -> Result<Option<HeaderValue>> {
    let Some((token, remember, expires_in)) = session.stored_lifetime() else {
        return Ok(None);
    };
    let config = state.config();
    let ttl = ttl_seconds(config, remember);
    if expires_in > ttl / 2 {
        return Ok(None);
    }

    debug!("Extending session with {}s left", expires_in);
    state
        .sessions()
        .touch_session(&cookie::hash_session_token(&token), ttl)
        .await?;
    Ok(Some(cookie::session_cookie(config, &token, remember)?))
}

async fn persist(state: &AppState, session: &Session) -> Result<Option<HeaderValue>> {
    let Some(change) = session.take_change() else {
        return refresh(state, session).await;
    };
    let config = state.config();
    let sessions = state.sessions();

    if change.rotate || change.is_empty() {
        if let Some(old) = &change.token {
            sessions
                .delete_session(&cookie::hash_session_token(old))
                .await?;
        }
    }

    if change.is_empty() {
        if change.token.is_some() {
            return Ok(Some(cookie::clear_session_cookie(config)?));
        }
        return Ok(None);
    }

    let token = match change.token {
        Some(token) if !change.rotate => token,
        _ => cookie::generate_session_token()?,
    };
    let ttl = ttl_seconds(config, change.remember);
    let record = SessionRecord {
        user_id: change.user_id,
        remember: change.remember,
        data: serde_json::to_value(&change.data).context("failed to encode session data")?,
    };
    sessions
        .save_session(&cookie::hash_session_token(&token), &record, ttl)
        .await?;

    Ok(Some(cookie::session_cookie(config, &token, change.remember)?))
}

/// Periodically delete expired session rows.
pub fn spawn_purge_worker(sessions: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match sessions.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(purged) => debug!("Purged {} expired sessions", purged),
                Err(err) => error!("Failed to purge expired sessions: {:#}", err),
            }
        }
    })
}
