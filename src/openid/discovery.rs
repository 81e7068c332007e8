//! Identifier normalization and OpenID 2.0 endpoint discovery.

use regex::Regex;
use reqwest::{header::ACCEPT, Client};
use tracing::{debug, instrument};
use url::Url;

use super::OpenIdError;

pub(super) const SERVER_TYPE: &str = "http://specs.openid.net/auth/2.0/server";
pub(super) const SIGNON_TYPE: &str = "http://specs.openid.net/auth/2.0/signon";
const XRDS_CONTENT_TYPE: &str = "application/xrds+xml";

/// Well known providers offered on the sign-in page.
const PROVIDERS: &[(&str, &str)] = &[
    ("google", "https://www.google.com/accounts/o8/id"),
    ("yahoo", "https://me.yahoo.com"),
    ("steam", "https://steamcommunity.com/openid"),
];

/// Where to send the browser and which identity to assert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub server_url: String,
    /// `None` for OP identifiers, where the provider picks the identity.
    pub claimed_id: Option<String>,
    pub local_id: Option<String>,
}

/// Turn what the user typed (or the provider they picked) into a URL.
pub(super) fn normalize_identifier(identifier: &str, provider: &str) -> Result<String, OpenIdError> {
    let identifier = identifier.trim();
    let provider = provider.trim();

    let known = |name: &str| {
        PROVIDERS
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, url)| (*url).to_string())
    };

    if identifier.is_empty() {
        return known(provider).ok_or_else(|| OpenIdError::Discovery("No OpenID given".into()));
    }
    if let Some(url) = known(identifier) {
        return Ok(url);
    }

    let candidate = if identifier.starts_with("http://") || identifier.starts_with("https://") {
        identifier.to_string()
    } else {
        format!("https://{identifier}")
    };

    let mut url = Url::parse(&candidate)
        .map_err(|_| OpenIdError::Discovery(format!("\"{identifier}\" is not a valid OpenID")))?;
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Claimed identifiers may carry a fragment; discovery runs without it.
pub(super) fn strip_fragment(identifier: &str) -> String {
    identifier
        .split_once('#')
        .map_or(identifier, |(base, _)| base)
        .to_string()
}

fn tag_text(block: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?is)<(?:\w+:)?{tag}\b[^>]*>\s*(.*?)\s*</(?:\w+:)?{tag}>");
    Regex::new(&pattern)
        .ok()?
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|text| !text.is_empty())
}

/// Pick the OpenID 2.0 service from an XRDS document, preferring OP identifiers.
pub(super) fn parse_xrds(body: &str, identifier: &str) -> Option<Endpoint> {
    let services = Regex::new(r"(?is)<(?:\w+:)?Service\b[^>]*>(.*?)</(?:\w+:)?Service>").ok()?;

    let mut signon = None;
    for caps in services.captures_iter(body) {
        let Some(block) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let Some(uri) = tag_text(block, "URI") else {
            continue;
        };
        if block.contains(SERVER_TYPE) {
            return Some(Endpoint {
                server_url: uri,
                claimed_id: None,
                local_id: None,
            });
        }
        if signon.is_none() && block.contains(SIGNON_TYPE) {
            signon = Some(Endpoint {
                server_url: uri,
                claimed_id: Some(identifier.to_string()),
                local_id: tag_text(block, "LocalID"),
            });
        }
    }
    signon
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let pattern = format!(r#"(?is)\b{name}\s*=\s*["']([^"']*)["']"#);
    Regex::new(&pattern)
        .ok()?
        .captures(tag)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// HTML-based discovery through `<link rel="openid2.provider">`.
pub(super) fn parse_html(body: &str, identifier: &str) -> Option<Endpoint> {
    let links = Regex::new(r"(?is)<link\b[^>]*>").ok()?;

    let mut server_url = None;
    let mut local_id = None;
    for tag in links.find_iter(body).map(|m| m.as_str()) {
        let (Some(rel), Some(href)) = (attribute(tag, "rel"), attribute(tag, "href")) else {
            continue;
        };
        for rel in rel.split_whitespace() {
            if rel.eq_ignore_ascii_case("openid2.provider") && server_url.is_none() {
                server_url = Some(href.clone());
            } else if rel.eq_ignore_ascii_case("openid2.local_id") && local_id.is_none() {
                local_id = Some(href.clone());
            }
        }
    }

    server_url.map(|server_url| Endpoint {
        server_url,
        claimed_id: Some(identifier.to_string()),
        local_id,
    })
}

/// Fetch `identifier` and locate its OpenID 2.0 endpoint.
#[instrument(skip(client))]
pub(super) async fn discover(client: &Client, identifier: &str) -> Result<Endpoint, OpenIdError> {
    let response = client
        .get(identifier)
        .header(ACCEPT, format!("{XRDS_CONTENT_TYPE}, text/html;q=0.9"))
        .send()
        .await
        .map_err(|e| OpenIdError::Discovery(format!("Could not fetch {identifier}: {e}")))?;

    let xrds_location = response
        .headers()
        .get("x-xrds-location")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let is_xrds = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(XRDS_CONTENT_TYPE));

    let body = response
        .text()
        .await
        .map_err(|e| OpenIdError::Discovery(format!("Could not read {identifier}: {e}")))?;

    if let Some(location) = xrds_location.filter(|_| !is_xrds) {
        debug!("Following X-XRDS-Location to {}", location);
        let document = client
            .get(&location)
            .header(ACCEPT, XRDS_CONTENT_TYPE)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| OpenIdError::Discovery(format!("Could not fetch {location}: {e}")))?
            .text()
            .await
            .map_err(|e| OpenIdError::Discovery(format!("Could not read {location}: {e}")))?;
        if let Some(endpoint) = parse_xrds(&document, identifier) {
            return Ok(endpoint);
        }
    }

    let endpoint = if is_xrds {
        parse_xrds(&body, identifier)
    } else {
        parse_html(&body, identifier).or_else(|| parse_xrds(&body, identifier))
    };

    endpoint.ok_or_else(|| {
        OpenIdError::Discovery(format!("No OpenID endpoint found for {identifier}"))
    })
}
