//! HTTP route the provider redirects to after the user's decision.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::Service;

pub const SUCCESS_PAGE: &str = "Success! You can close this tab.";
pub const DENIED_PAGE: &str = "Denied. You can close this tab.";

/// Router serving `GET /<callback identifier>`.
pub fn router(service: Arc<Service>) -> Router {
    let path = format!("/{}", service.callback_identifier());
    Router::new()
        .route(&path, get(auth_callback))
        .with_state(service)
}

async fn auth_callback(
    State(service): State<Arc<Service>>,
    Query(parameters): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    match service.handle_callback(&parameters).await {
        Ok(true) => Html(SUCCESS_PAGE),
        Ok(false) => Html(DENIED_PAGE),
        Err(err) => {
            error!(service = service.name(), error = %err, "callback handling failed");
            Html(DENIED_PAGE)
        }
    }
}

/// Runs the callback route until the process stops.
pub async fn serve(service: Arc<Service>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        callback = %service.callback_url(),
        "waiting for the provider callback"
    );
    axum::serve(listener, router(service)).await
}
