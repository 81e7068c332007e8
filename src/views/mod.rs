//! Server-rendered HTML for the account pages.
//!
//! Every page is an askama template under `templates/` extending
//! `layout.html`, which reads the `current` user and the pending `flashes`
//! from the page struct. Values are HTML-escaped by askama.

mod pages;

pub use pages::{edit, edit_pass, index, not_found, profile, signin, signup};

use pages::ServerErrorPage;

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

/// Render `page` with `status`, falling back to the 500 page.
pub fn render<T: Template>(status: StatusCode, page: &T) -> Response {
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            error!("Failed to render page: {}", err);
            server_error()
        }
    }
}

/// Bare 500 page; it depends on neither the session nor the current user.
pub fn server_error() -> Response {
    match ServerErrorPage.render() {
        Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
        Err(err) => {
            error!("Failed to render the server error page: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session::{Anonymous, CurrentUser, Flash};

    #[test]
    fn layout_renders_flashes_escaped() -> askama::Result<()> {
        let current = CurrentUser::Anonymous(Anonymous::default());
        let flashes = vec![Flash {
            category: "info".to_string(),
            message: "<b>hi</b>".to_string(),
        }];
        let html = index(&current, &flashes).render()?;
        assert!(html.contains(r#"<li class="flash info">&lt;b&gt;hi&lt;/b&gt;</li>"#));
        assert!(html.contains(r#"href="/signin/""#));
        assert!(html.contains("<title>Home - ScriptFan</title>"));
        Ok(())
    }

    #[test]
    fn layout_omits_empty_flash_list() -> askama::Result<()> {
        let current = CurrentUser::Anonymous(Anonymous::default());
        let html = not_found(&current, &[]).render()?;
        assert!(!html.contains("flashes"));
        assert!(html.contains("<h1>Not found</h1>"));
        Ok(())
    }

    #[test]
    fn render_sets_status_and_content_type() {
        let current = CurrentUser::Anonymous(Anonymous::default());
        let response = render(StatusCode::NOT_FOUND, &not_found(&current, &[]));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html")));
    }

    #[test]
    fn server_error_is_500() {
        assert_eq!(server_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
