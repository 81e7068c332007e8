//! Session cookie plumbing: token generation, hashing and `Set-Cookie` values.

use anyhow::{Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::api::SiteConfig;

pub(crate) const SESSION_COOKIE_NAME: &str = "scriptfan_session";
const TOKEN_BYTES: usize = 32;

/// Create a new session token for the cookie.
/// The raw value is only returned to set the cookie; the database stores a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never touch the database.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn well_formed(token: &str) -> bool {
    Base64UrlUnpadded::decode_vec(token).is_ok_and(|bytes| bytes.len() == TOKEN_BYTES)
}

/// Read the session token from the `Cookie` headers, ignoring malformed values.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == SESSION_COOKIE_NAME).then(|| val.trim().to_string())
        })
        .find(|token| well_formed(token))
}

/// Remembered sessions get a persistent cookie, others live until the browser closes.
pub(crate) fn session_cookie(
    config: &SiteConfig,
    token: &str,
    remember: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    if remember {
        cookie.push_str(&format!("; Max-Age={}", config.remember_ttl_seconds()));
    }
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &SiteConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_well_formed_and_unique() -> Result<()> {
        let first = generate_session_token()?;
        let second = generate_session_token()?;
        assert!(well_formed(&first));
        assert_eq!(first.len(), 43);
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn hash_session_token_stable() {
        assert_eq!(hash_session_token("token"), hash_session_token("token"));
        assert_ne!(hash_session_token("token"), hash_session_token("other"));
        assert_eq!(hash_session_token("token").len(), 32);
    }

    #[test]
    fn extract_session_token_finds_cookie_among_others() -> Result<()> {
        let token = generate_session_token()?;
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            COOKIE,
            HeaderValue::from_str(&format!("lang=zh; {SESSION_COOKIE_NAME}={token}"))?,
        );
        assert_eq!(extract_session_token(&headers), Some(token));
        Ok(())
    }

    #[test]
    fn extract_session_token_ignores_malformed_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("scriptfan_session=not-a-real-token"),
        );
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_attributes() -> Result<()> {
        let config = SiteConfig::new("https://scriptfan.com".to_string())
            .with_remember_ttl_seconds(3600);

        let cookie = session_cookie(&config, "abc", false)?;
        let cookie = cookie.to_str()?;
        assert!(cookie.starts_with("scriptfan_session=abc; Path=/; HttpOnly; SameSite=Lax"));
        assert!(!cookie.contains("Max-Age"));
        assert!(cookie.ends_with("; Secure"));

        let remembered = session_cookie(&config, "abc", true)?;
        assert!(remembered.to_str()?.contains("Max-Age=3600"));
        Ok(())
    }

    #[test]
    fn clear_cookie_expires_immediately() -> Result<()> {
        let config = SiteConfig::new("http://localhost:8080".to_string());
        let cookie = clear_session_cookie(&config)?;
        assert_eq!(
            cookie.to_str()?,
            "scriptfan_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
        Ok(())
    }
}
