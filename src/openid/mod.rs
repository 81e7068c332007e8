//! OpenID 2.0 relying party.
//!
//! Flow overview: `begin` discovers the provider for the identifier typed on
//! the sign-in page and returns the `checkid_setup` URL to redirect to. When
//! the provider sends the browser back, `complete` checks the response mode,
//! confirms `return_to` and the signed field list, rediscovers the claimed
//! identifier, verifies the assertion directly with the provider
//! (`check_authentication`) and hands back the identity plus the signed
//! SReg/AX attributes.

mod discovery;
mod message;
#[cfg(test)]
mod testing;

pub use discovery::Endpoint;
pub use message::Attributes;

use crate::{BoxFuture, APP_USER_AGENT};
use anyhow::{Context, Result};
use reqwest::Client;
use std::{collections::HashMap, fmt, time::Duration};
use tracing::{debug, instrument, warn};

/// What the sign-in page asks the consumer to start.
#[derive(Clone, Debug)]
pub struct AuthRequest {
    pub identifier: String,
    pub provider: String,
    pub return_to: String,
    pub realm: String,
}

/// A verified positive assertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenIdResponse {
    pub identity_url: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub fullname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenIdError {
    Cancelled,
    Provider(String),
    Discovery(String),
    Verification(String),
    InvalidResponse(String),
}

impl fmt::Display for OpenIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "OpenID sign-in was cancelled"),
            Self::Provider(message) => write!(f, "OpenID provider error: {message}"),
            Self::Discovery(message) => write!(f, "{message}"),
            Self::Verification(message) => write!(f, "OpenID verification failed: {message}"),
            Self::InvalidResponse(message) => write!(f, "Invalid OpenID response: {message}"),
        }
    }
}

impl std::error::Error for OpenIdError {}

/// Relying-party operations used by the sign-in handler.
pub trait OpenIdConsumer: Send + Sync {
    /// Returns the provider URL to redirect the browser to.
    fn begin<'a>(&'a self, request: &'a AuthRequest) -> BoxFuture<'a, Result<String, OpenIdError>>;

    /// Verify the provider's response. `return_to_base` is the prefix every
    /// legitimate `openid.return_to` must start with.
    fn complete<'a>(
        &'a self,
        params: &'a HashMap<String, String>,
        return_to_base: &'a str,
    ) -> BoxFuture<'a, Result<OpenIdResponse, OpenIdError>>;
}

/// [`OpenIdConsumer`] talking to real providers over HTTP.
#[derive(Clone, Debug)]
pub struct HttpOpenIdConsumer {
    client: Client,
}

impl HttpOpenIdConsumer {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build OpenID HTTP client")?;
        Ok(Self { client })
    }

    #[instrument(skip(self, params))]
    async fn verify_direct(
        &self,
        op_endpoint: &str,
        params: &HashMap<String, String>,
    ) -> Result<(), OpenIdError> {
        let response = self
            .client
            .post(op_endpoint)
            .form(&message::check_authentication_params(params))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| OpenIdError::Verification(format!("provider unreachable: {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| OpenIdError::Verification(format!("unreadable reply: {e}")))?;

        let reply = message::parse_key_value(&body);
        if reply.get("is_valid").map(String::as_str) == Some("true") {
            Ok(())
        } else {
            warn!("Provider rejected assertion from {}", op_endpoint);
            Err(OpenIdError::Verification(
                "the provider did not confirm the assertion".to_string(),
            ))
        }
    }

    async fn complete_id_res(
        &self,
        params: &HashMap<String, String>,
        return_to_base: &str,
    ) -> Result<OpenIdResponse, OpenIdError> {
        let field = |name: &str| {
            params
                .get(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| OpenIdError::InvalidResponse(format!("missing {name}")))
        };

        if field("openid.ns")? != message::OPENID_NS {
            return Err(OpenIdError::InvalidResponse(
                "only OpenID 2.0 is supported".to_string(),
            ));
        }
        if !field("openid.return_to")?.starts_with(return_to_base) {
            return Err(OpenIdError::Verification("return_to mismatch".to_string()));
        }

        let op_endpoint = field("openid.op_endpoint")?;
        let claimed_id = field("openid.claimed_id")?;
        let identity = field("openid.identity")?;
        if claimed_id == message::IDENTIFIER_SELECT || identity == message::IDENTIFIER_SELECT {
            return Err(OpenIdError::Verification(
                "the provider did not select an identity".to_string(),
            ));
        }
        field("openid.response_nonce")?;
        field("openid.assoc_handle")?;
        field("openid.sig")?;
        let signed = message::signed_params(params)?;

        // The endpoint that signed must be authoritative for the claimed id.
        let endpoint = discovery::discover(&self.client, &discovery::strip_fragment(claimed_id)).await?;
        if &endpoint.server_url != op_endpoint {
            return Err(OpenIdError::Verification(format!(
                "{op_endpoint} is not the provider of {claimed_id}"
            )));
        }
        let expected_identity = endpoint.local_id.as_deref().unwrap_or(claimed_id);
        if expected_identity != identity {
            return Err(OpenIdError::Verification(format!(
                "{identity} is not the local identifier of {claimed_id}"
            )));
        }

        self.verify_direct(op_endpoint, params).await?;

        let Attributes {
            email,
            nickname,
            fullname,
        } = message::extract_attributes(&signed);

        Ok(OpenIdResponse {
            identity_url: claimed_id.clone(),
            email,
            nickname,
            fullname,
        })
    }
}

/// Reject non-positive modes before any network round trip.
fn check_mode(params: &HashMap<String, String>) -> Result<(), OpenIdError> {
    match params.get("openid.mode").map(String::as_str) {
        Some("id_res") => Ok(()),
        Some("cancel") => Err(OpenIdError::Cancelled),
        Some("error") => Err(OpenIdError::Provider(
            params
                .get("openid.error")
                .cloned()
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
        Some(mode) => Err(OpenIdError::InvalidResponse(format!(
            "unexpected mode {mode}"
        ))),
        None => Err(OpenIdError::InvalidResponse("missing openid.mode".to_string())),
    }
}

impl OpenIdConsumer for HttpOpenIdConsumer {
    fn begin<'a>(&'a self, request: &'a AuthRequest) -> BoxFuture<'a, Result<String, OpenIdError>> {
        Box::pin(async move {
            let identifier = discovery::normalize_identifier(&request.identifier, &request.provider)?;
            let endpoint = discovery::discover(&self.client, &identifier).await?;
            debug!("Discovered OpenID endpoint: {:?}", endpoint);
            message::checkid_setup_url(&endpoint, &request.return_to, &request.realm)
        })
    }

    fn complete<'a>(
        &'a self,
        params: &'a HashMap<String, String>,
        return_to_base: &'a str,
    ) -> BoxFuture<'a, Result<OpenIdResponse, OpenIdError>> {
        Box::pin(async move {
            check_mode(params)?;
            self.complete_id_res(params, return_to_base).await
        })
    }
}
