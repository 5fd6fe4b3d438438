// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::body::to_bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use mst_core::{CommandScript, CommandSettings, DuplicatePolicy, Maestro};
use mst_daemon::{handler::run_command, AppState};
use mst_engine::RemoteRuntime;
use mst_shell::{FakeDialer, TrustAllKnownHosts};
use std::sync::Arc;

fn state() -> AppState {
    let mut maestro = Maestro::new(DuplicatePolicy::Replace);
    let mut deploy = CommandSettings::new("deploy");
    deploy.script = vec![CommandScript::plain("echo deploying")];
    maestro.registry.register(deploy).expect("register deploy");
    AppState {
        maestro: Arc::new(maestro),
        remote: Arc::new(RemoteRuntime {
            dialer: Arc::new(FakeDialer::new()),
            known_hosts: Arc::new(TrustAllKnownHosts),
        }),
    }
}

#[tokio::test]
async fn a_get_against_a_known_command_path_returns_its_output() {
    let response = run_command(State(state()), Path("deploy".to_string()), HeaderMap::new(), RawQuery(None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("Maestro-Exit").expect("exit header"), "ok");
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert!(String::from_utf8_lossy(&body).contains("deploying"));
}

#[tokio::test]
async fn an_unknown_command_path_returns_400() {
    let response = run_command(State(state()), Path("nope".to_string()), HeaderMap::new(), RawQuery(None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn the_maestro_dry_header_short_circuits_execution() {
    let mut headers = HeaderMap::new();
    headers.insert("Maestro-Dry", "1".parse().expect("header value"));
    let response = run_command(State(state()), Path("deploy".to_string()), headers, RawQuery(None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert!(String::from_utf8_lossy(&body).contains("echo deploying"));
}
