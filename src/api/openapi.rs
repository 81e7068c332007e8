use utoipa::{
    openapi::{InfoBuilder, Tag},
    OpenApi,
};

use super::handlers::{
    health,
    user::{
        self,
        forms::{FormErrors, ProfileForm},
        types::{Envelope, Messages},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, user::edit::update),
    components(schemas(health::Health, ProfileForm, Envelope, Messages, FormErrors))
)]
struct ApiDoc;

/// OpenAPI document for the JSON endpoints.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    // Use Cargo.toml metadata instead of the utoipa defaults.
    doc.info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some("ScriptFan community accounts"))
        .build();

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service and database status".to_string());

    let mut profile_tag = Tag::new("profile");
    profile_tag.description = Some("Profile editing".to_string());

    doc.tags = Some(vec![health_tag, profile_tag]);
    doc
}
