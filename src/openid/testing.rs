//! A local OpenID provider for exercising discovery and verification.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Router,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, task::JoinHandle};

use super::message::OPENID_NS;

#[derive(Default)]
struct Shared {
    base: String,
    checks: Mutex<Vec<HashMap<String, String>>>,
}

/// Serves, on `127.0.0.1`:
/// - `/id/:name`: HTML discovery pointing at `/op`, or `/op-deny` for `bob`
/// - `/xrds-user`: an `X-XRDS-Location` header pointing at `/xrds/signon`
/// - `/xrds/signon`: a signon service with a local id of `/u/carol`
/// - `/server`: an OP identifier XRDS document
/// - `/op` and `/op-deny`: `check_authentication` answering true or false
pub(crate) struct FakeProvider {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl FakeProvider {
    pub(crate) async fn spawn() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let shared = Arc::new(Shared {
            base: format!("http://{}", listener.local_addr()?),
            ..Shared::default()
        });

        let app = Router::new()
            .route("/id/:name", get(html_identity))
            .route("/xrds-user", get(xrds_location))
            .route("/xrds/signon", get(signon_document))
            .route("/server", get(server_document))
            .route("/op", post(confirm))
            .route("/op-deny", post(deny))
            .with_state(shared.clone());
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { shared, task })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.shared.base)
    }

    /// Every `check_authentication` request received so far.
    pub(crate) fn checks(&self) -> Vec<HashMap<String, String>> {
        self.shared
            .checks
            .lock()
            .map(|checks| checks.clone())
            .unwrap_or_default()
    }
}

impl Drop for FakeProvider {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn xrds(service_type: &str, uri: &str, local_id: Option<&str>) -> impl IntoResponse {
    let local_id = local_id
        .map(|id| format!("<LocalID>{id}</LocalID>"))
        .unwrap_or_default();
    (
        [(CONTENT_TYPE, "application/xrds+xml")],
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<xrds:XRDS xmlns:xrds="xri://$xrds" xmlns="xri://$xrd*($v*2.0)"><XRD><Service>
<Type>{service_type}</Type><URI>{uri}</URI>{local_id}
</Service></XRD></xrds:XRDS>"#
        ),
    )
}

async fn html_identity(State(shared): State<Arc<Shared>>, Path(name): Path<String>) -> Html<String> {
    let op = if name == "bob" { "op-deny" } else { "op" };
    Html(format!(
        r#"<html><head><link rel="openid2.provider" href="{}/{op}"></head><body>{name}</body></html>"#,
        shared.base
    ))
}

async fn xrds_location(State(shared): State<Arc<Shared>>) -> impl IntoResponse {
    (
        [("x-xrds-location", format!("{}/xrds/signon", shared.base))],
        Html("<html><head></head></html>"),
    )
}

async fn signon_document(State(shared): State<Arc<Shared>>) -> impl IntoResponse {
    let local_id = format!("{}/u/carol", shared.base);
    xrds(
        super::discovery::SIGNON_TYPE,
        &format!("{}/op", shared.base),
        Some(local_id.as_str()),
    )
}

async fn server_document(State(shared): State<Arc<Shared>>) -> impl IntoResponse {
    xrds(super::discovery::SERVER_TYPE, &format!("{}/op", shared.base), None)
}

fn record(shared: &Shared, params: HashMap<String, String>) {
    if let Ok(mut checks) = shared.checks.lock() {
        checks.push(params);
    }
}

async fn confirm(State(shared): State<Arc<Shared>>, Form(params): Form<HashMap<String, String>>) -> String {
    record(&shared, params);
    format!("ns:{OPENID_NS}\nis_valid:true\n")
}

async fn deny(State(shared): State<Arc<Shared>>, Form(params): Form<HashMap<String, String>>) -> String {
    record(&shared, params);
    format!("ns:{OPENID_NS}\nis_valid:false\n")
}
