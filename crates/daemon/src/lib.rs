// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The HTTP facade (§6.3): one endpoint per command path. Request headers
//! select execution modes; the response streams the command's combined
//! stdout/stderr as `text/plain`, with the final outcome surfaced in a
//! `Maestro-Exit` header.

mod capture;
pub mod handler;

use axum::routing::get;
use axum::Router;
use mst_core::Maestro;
use mst_engine::RemoteRuntime;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared, read-only state every request handler borrows from.
#[derive(Clone)]
pub struct AppState {
    pub maestro: Arc<Maestro>,
    pub remote: Arc<RemoteRuntime>,
}

/// Builds the facade's router: `GET /:name` dispatches to [`handler::run_command`];
/// any other method on that path falls through to axum's default 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/:name", get(handler::run_command))
        .with_state(state)
}

/// Binds `addr` and serves the facade until the process is killed.
///
/// `.HTTP_CERT_FILE`/`.HTTP_CERT_KEY` are decoded into [`mst_core::WebConfig`]
/// but no TLS termination crate appears anywhere in the corpus this facade
/// was grown from, so serving stays plaintext; a cert pair is logged and
/// otherwise ignored rather than silently dropped.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let web = &state.maestro.web;
    if web.http_cert_file.is_some() || web.http_cert_key.is_some() {
        warn!("HTTP_CERT_FILE/HTTP_CERT_KEY configured but TLS termination is not implemented; serving plaintext");
    }
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "maestro HTTP facade listening");
    axum::serve(listener, router(state)).await
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
