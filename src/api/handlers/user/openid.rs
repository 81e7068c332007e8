use axum::response::{IntoResponse, Redirect, Response};
use tracing::{info, instrument};

use super::{utils::next_or, PROFILE_PATH, SIGNED_IN};
use crate::{
    api::{
        handlers::internal_error,
        session::Session,
        AppState,
    },
    openid::OpenIdResponse,
};

/// Sign-up link pre-filled from the attributes the provider released.
fn signup_prefill(next: &str, response: &OpenIdResponse) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("next", next_or(next, PROFILE_PATH));
    if let Some(email) = &response.email {
        query.append_pair("email", email);
    }
    if let Some(nickname) = response.nickname.as_ref().or(response.fullname.as_ref()) {
        query.append_pair("nickname", nickname);
    }
    format!("/signup/?{}", query.finish())
}

/// Sign in the account linked to a verified OpenID identity, or send the
/// visitor to sign-up when the identity is unknown.
#[instrument(skip_all, fields(identity_url = %response.identity_url))]
pub async fn create_or_login(
    state: &AppState,
    session: &Session,
    response: OpenIdResponse,
    next: &str,
) -> Response {
    info!(
        "OpenID response: openid={}, provider={:?}, requested={:?}",
        response.identity_url,
        session.openid_provider(),
        session.openid_identifier()
    );
    session.set_current_openid(&response.identity_url);

    match state.users().find_user_by_openid(&response.identity_url).await {
        Ok(Some(user)) => {
            session.flash(SIGNED_IN, "message");
            info!("Logging in with user: {}", user.email);
            session.login(user.id, true);
            Redirect::to(next_or(next, PROFILE_PATH)).into_response()
        }
        Ok(None) => Redirect::to(&signup_prefill(next, &response)).into_response(),
        Err(err) => internal_error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefill_prefers_nickname_then_fullname() {
        let mut response = OpenIdResponse {
            identity_url: "https://alice.example.com/".to_string(),
            email: Some("alice@example.com".to_string()),
            nickname: None,
            fullname: Some("Alice Liddell".to_string()),
        };
        assert_eq!(
            signup_prefill("", &response),
            "/signup/?next=%2Fprofile%2F&email=alice%40example.com&nickname=Alice+Liddell"
        );

        response.nickname = Some("alice".to_string());
        assert!(signup_prefill("/userinfo/", &response)
            .ends_with("next=%2Fuserinfo%2F&email=alice%40example.com&nickname=alice"));
    }
}
