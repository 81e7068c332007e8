//! Persistence for users, their OpenID links and server-side sessions.
//!
//! Handlers only see the [`UserStore`] and [`SessionStore`] traits. The
//! production implementation is [`PgStore`]; tests swap in an in-memory one.

mod models;
mod postgres;

#[cfg(test)]
pub(crate) mod memory;

pub use models::{
    CreateUserOutcome, NewUser, ProfileUpdate, SessionRecord, StoredSession, User, UserInfo,
};
pub use postgres::PgStore;

use crate::BoxFuture;
use anyhow::Result;

/// User accounts and their OpenID identities.
pub trait UserStore: Send + Sync {
    fn find_user_by_id(&self, id: i64) -> BoxFuture<'_, Result<Option<User>>>;

    fn find_user_by_slug<'a>(&'a self, slug: &'a str) -> BoxFuture<'a, Result<Option<User>>>;

    /// `email` must already be normalized.
    fn find_user_by_email<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<Option<User>>>;

    /// Resolve the user linked to an OpenID identity URL.
    fn find_user_by_openid<'a>(&'a self, openid: &'a str)
        -> BoxFuture<'a, Result<Option<User>>>;

    /// Insert a user together with an empty info record.
    fn create_user<'a>(&'a self, user: &'a NewUser) -> BoxFuture<'a, Result<CreateUserOutcome>>;

    /// Apply a profile edit. A slug held by another user is an error.
    fn update_profile<'a>(
        &'a self,
        id: i64,
        update: &'a ProfileUpdate,
    ) -> BoxFuture<'a, Result<()>>;

    fn set_password<'a>(&'a self, id: i64, password_hash: &'a str) -> BoxFuture<'a, Result<()>>;

    fn link_openid<'a>(&'a self, openid: &'a str, user_id: i64) -> BoxFuture<'a, Result<()>>;

    /// Check that the backing database answers.
    fn ping(&self) -> BoxFuture<'_, Result<()>>;
}

/// Server-side session rows keyed by the SHA-256 hash of the cookie token.
pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired sessions.
    fn load_session<'a>(
        &'a self,
        token_hash: &'a [u8],
    ) -> BoxFuture<'a, Result<Option<StoredSession>>>;

    /// Insert or replace a session, expiring `ttl_seconds` from now.
    fn save_session<'a>(
        &'a self,
        token_hash: &'a [u8],
        record: &'a SessionRecord,
        ttl_seconds: i64,
    ) -> BoxFuture<'a, Result<()>>;

    /// Move the expiry of an existing session to `ttl_seconds` from now.
    fn touch_session<'a>(&'a self, token_hash: &'a [u8], ttl_seconds: i64) -> BoxFuture<'a, Result<()>>;

    fn delete_session<'a>(&'a self, token_hash: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Remove expired rows, returning how many were deleted.
    fn purge_expired_sessions(&self) -> BoxFuture<'_, Result<u64>>;
}
