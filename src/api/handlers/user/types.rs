//! JSON payloads returned by the profile edit endpoint.

use serde::Serialize;
use utoipa::ToSchema;

use super::forms::FormErrors;

pub const PROFILE_UPDATED: &str = "Profile updated";
pub const PROFILE_UPDATE_FAILED: &str = "Profile update failed";

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct Messages {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `{success, messages: {success|error}, errors?}`
#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope {
    pub success: bool,
    pub messages: Messages,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FormErrors>,
}

impl Envelope {
    #[must_use]
    pub fn success(message: &str) -> Self {
        Self {
            success: true,
            messages: Messages {
                success: Some(message.to_string()),
                error: None,
            },
            errors: None,
        }
    }

    #[must_use]
    pub fn failure(message: String) -> Self {
        Self {
            success: false,
            messages: Messages {
                success: None,
                error: Some(message),
            },
            errors: None,
        }
    }

    #[must_use]
    pub fn invalid(errors: FormErrors) -> Self {
        Self {
            errors: Some(errors),
            ..Self::failure(PROFILE_UPDATE_FAILED.to_string())
        }
    }
}
