//! # ScriptFan accounts
//!
//! `scriptfan` serves the account pages of the ScriptFan community site:
//! password and OpenID sign-in, sign-up, profile viewing and editing,
//! password changes and sign-out.
//!
//! ## Sessions
//!
//! Sessions are kept server side. The browser only holds an opaque random
//! token in the `scriptfan_session` cookie and the database stores its
//! SHA-256 hash together with the signed-in user id, the OpenID markers and
//! any pending flash messages. The token is replaced whenever the signed-in
//! principal changes.
//!
//! ## OpenID
//!
//! OpenID 2.0 sign-in is handled by [`openid::HttpOpenIdConsumer`]: the user
//! supplied identifier is discovered (XRDS or HTML links), the browser is
//! sent to the provider with a `checkid_setup` request, and the positive
//! assertion coming back to `/signin/` is verified directly with the
//! provider before the linked account is signed in.
//!
//! ## Profiles
//!
//! Users are addressed either by their numeric id or by an optional slug.
//! Slugs are normalized to `[a-z0-9-]` and can never be all digits, so
//! `/profile/42` is always an id lookup.

pub mod api;
pub mod cli;
pub mod openid;
pub mod store;
pub mod views;

use std::{future::Future, pin::Pin};

/// Boxed future returned by the object-safe store and OpenID traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
