//! OpenID 2.0 indirect and direct message helpers.

use std::collections::{HashMap, HashSet};
use url::Url;

use super::{discovery::Endpoint, OpenIdError};

pub(super) const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
pub(super) const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";
const SREG_NS: &str = "http://openid.net/extensions/sreg/1.1";
const SREG_NS_1_0: &str = "http://openid.net/sreg/1.0";
const AX_NS: &str = "http://openid.net/srv/ax/1.0";

/// Fields a positive assertion must sign, without the `openid.` prefix.
const REQUIRED_SIGNED: &[&str] = &[
    "op_endpoint",
    "return_to",
    "response_nonce",
    "assoc_handle",
    "claimed_id",
    "identity",
];

/// Attributes requested from the provider, with their AX type URIs.
const AX_ATTRIBUTES: &[(&str, &str)] = &[
    ("email", "http://axschema.org/contact/email"),
    ("nickname", "http://axschema.org/namePerson/friendly"),
    ("fullname", "http://axschema.org/namePerson"),
];

/// Profile data carried by a positive assertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub fullname: Option<String>,
}

/// Build the `checkid_setup` URL the browser is redirected to.
pub(super) fn checkid_setup_url(
    endpoint: &Endpoint,
    return_to: &str,
    realm: &str,
) -> Result<String, OpenIdError> {
    let mut url = Url::parse(&endpoint.server_url).map_err(|_| {
        OpenIdError::Discovery(format!("Invalid OpenID endpoint {}", endpoint.server_url))
    })?;

    let claimed_id = endpoint.claimed_id.as_deref().unwrap_or(IDENTIFIER_SELECT);
    let identity = endpoint
        .local_id
        .as_deref()
        .or(endpoint.claimed_id.as_deref())
        .unwrap_or(IDENTIFIER_SELECT);
    let required = AX_ATTRIBUTES
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(",");

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("openid.ns", OPENID_NS)
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.claimed_id", claimed_id)
            .append_pair("openid.identity", identity)
            .append_pair("openid.return_to", return_to)
            .append_pair("openid.realm", realm)
            .append_pair("openid.ns.sreg", SREG_NS)
            .append_pair("openid.sreg.optional", &required)
            .append_pair("openid.ns.ax", AX_NS)
            .append_pair("openid.ax.mode", "fetch_request")
            .append_pair("openid.ax.required", &required);
        for (name, type_uri) in AX_ATTRIBUTES {
            query.append_pair(&format!("openid.ax.type.{name}"), type_uri);
        }
    }

    Ok(url.into())
}

/// Parse a direct response body (`key:value` per line).
pub(super) fn parse_key_value(body: &str) -> HashMap<String, String> {
    body.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parameters for the `check_authentication` direct request.
pub(super) fn check_authentication_params(
    params: &HashMap<String, String>,
) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = params
        .iter()
        .filter(|(key, _)| key.starts_with("openid.") && key.as_str() != "openid.mode")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    out.push((
        "openid.mode".to_string(),
        "check_authentication".to_string(),
    ));
    out.sort();
    out
}

/// The `openid.*` parameters covered by `openid.signed`.
///
/// Fails unless every field in [`REQUIRED_SIGNED`] is listed. Extension
/// data must be read from the returned map only, so unsigned attributes
/// never reach the caller.
pub(super) fn signed_params(
    params: &HashMap<String, String>,
) -> Result<HashMap<String, String>, OpenIdError> {
    let signed: HashSet<&str> = params
        .get("openid.signed")
        .map(|list| list.split(',').map(str::trim).filter(|key| !key.is_empty()).collect())
        .unwrap_or_default();

    if let Some(missing) = REQUIRED_SIGNED.iter().find(|key| !signed.contains(**key)) {
        return Err(OpenIdError::Verification(format!(
            "openid.{missing} is not signed"
        )));
    }

    Ok(params
        .iter()
        .filter(|(key, _)| {
            key.strip_prefix("openid.")
                .is_some_and(|key| signed.contains(key))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}

/// Find the alias declared for an extension namespace (`openid.ns.<alias>`).
fn extension_alias<'a>(params: &'a HashMap<String, String>, namespaces: &[&str]) -> Option<&'a str> {
    params.iter().find_map(|(key, value)| {
        let alias = key.strip_prefix("openid.ns.")?;
        namespaces.contains(&value.as_str()).then_some(alias)
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Extract email, nickname and full name from SReg or AX data, SReg first.
pub(super) fn extract_attributes(params: &HashMap<String, String>) -> Attributes {
    let mut attributes = Attributes::default();

    if let Some(alias) = extension_alias(params, &[SREG_NS, SREG_NS_1_0]) {
        let get = |field: &str| non_empty(params.get(&format!("openid.{alias}.{field}")));
        attributes.email = get("email");
        attributes.nickname = get("nickname");
        attributes.fullname = get("fullname");
    }

    if let Some(alias) = extension_alias(params, &[AX_NS]) {
        let type_prefix = format!("openid.{alias}.type.");
        for (key, type_uri) in params {
            let Some(ax_name) = key.strip_prefix(&type_prefix) else {
                continue;
            };
            let Some((field, _)) = AX_ATTRIBUTES.iter().find(|(_, uri)| *uri == type_uri.as_str()) else {
                continue;
            };
            let value = non_empty(params.get(&format!("openid.{alias}.value.{ax_name}")))
                .or_else(|| non_empty(params.get(&format!("openid.{alias}.value.{ax_name}.1"))));
            let slot = match *field {
                "email" => &mut attributes.email,
                "nickname" => &mut attributes.nickname,
                _ => &mut attributes.fullname,
            };
            if slot.is_none() {
                *slot = value;
            }
        }
    }

    attributes
}
