//! Shared application state and site configuration.

use std::sync::Arc;

use crate::{
    openid::OpenIdConsumer,
    store::{SessionStore, UserStore},
};

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_REMEMBER_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct SiteConfig {
    base_url: String,
    session_ttl_seconds: i64,
    remember_ttl_seconds: i64,
}

impl SiteConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            remember_ttl_seconds: DEFAULT_REMEMBER_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_remember_ttl_seconds(mut self, seconds: i64) -> Self {
        self.remember_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn remember_ttl_seconds(&self) -> i64 {
        self.remember_ttl_seconds
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Absolute sign-in URL, the OpenID return address.
    #[must_use]
    pub fn signin_url(&self) -> String {
        format!("{}/signin/", self.base_url)
    }

    /// OpenID realm covering the whole site.
    #[must_use]
    pub fn realm(&self) -> String {
        format!("{}/", self.base_url)
    }
}

pub struct AppState {
    config: SiteConfig,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    openid: Arc<dyn OpenIdConsumer>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: SiteConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        openid: Arc<dyn OpenIdConsumer>,
    ) -> Self {
        Self {
            config,
            users,
            sessions,
            openid,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    #[must_use]
    pub fn openid(&self) -> &dyn OpenIdConsumer {
        self.openid.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
