//! HTTP surface: router, layers and server bootstrap.

pub mod handlers;
mod openapi;
pub mod session;
mod state;

pub use openapi::openapi;
pub use state::{AppState, SiteConfig};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

use crate::{openid::HttpOpenIdConsumer, store::PgStore};
use handlers::{health, root, user};

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Connect to the database and serve until `ctrl_c`.
///
/// # Errors
/// Returns an error if the database is unreachable or the port cannot be bound.
pub async fn new(port: u16, dsn: String, config: SiteConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    let openid = Arc::new(HttpOpenIdConsumer::new()?);
    let state = Arc::new(AppState::new(config, store.clone(), store.clone(), openid));

    let purge = session::spawn_purge_worker(store, SESSION_PURGE_INTERVAL);

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", err);
            }
            info!("Gracefully shutdown");
        })
        .await?;

    purge.abort();

    Ok(())
}

/// All routes with their layers; used by the server and the handler tests.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root::index))
        .route("/health", get(health::health).head(health::health))
        .route("/signin/", get(user::signin).post(user::signin))
        .route("/signup/", get(user::signup).post(user::signup))
        .route("/profile/", get(user::profile))
        .route("/profile/:slug_or_id", get(user::profile))
        .route("/userinfo/", get(user::edit).post(user::update))
        .route("/edit-pass", get(user::edit_pass).post(user::edit_pass))
        .route("/email", get(user::editemail))
        .route("/signou/", get(user::signout))
        .fallback(root::fallback)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state))
                .layer(middleware::from_fn(session::middleware)),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
