// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single route handler backing the facade: resolves `Maestro-*` headers
//! into an [`ExecuteOptions`], runs the command through the shared
//! [`mst_engine::Orchestrator`], and renders the combined output as
//! `text/plain` with the outcome in a `Maestro-Exit` header.
//!
//! A true chunked-transfer HTTP trailer would need a lower-level body writer
//! than anything this stack otherwise reaches for, so the outcome rides on a
//! normal header instead of a trailer; the body is buffered in full rather
//! than streamed incrementally for the same reason. Both are noted as
//! deliberate simplifications rather than oversights.

use crate::capture::Capture;
use crate::AppState;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use mst_engine::{ExecuteOptions, Orchestrator};
use mst_shell::SharedSink;

pub async fn run_command(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if !state.maestro.registry.contains(&name) {
        return (StatusCode::BAD_REQUEST, format!("unknown command: {name}\n")).into_response();
    }

    let args = parse_args(query.as_deref());
    let opts = ExecuteOptions {
        nodeps: headers.contains_key("Maestro-NoDeps"),
        dry: headers.contains_key("Maestro-Dry"),
        force_ignore: headers.contains_key("Maestro-Ignore"),
        force_trace: headers.contains_key("Maestro-Trace"),
    };
    let prefixed = headers
        .get("Maestro-Prefix")
        .and_then(|v| v.to_str().ok())
        .map(|v| v != "false")
        .unwrap_or(true);

    let out = Capture::new();
    let orch = Orchestrator::new(
        &state.maestro,
        &state.remote,
        SharedSink::new(out.clone()),
        SharedSink::new(out.clone()),
    );
    let result = orch.execute(&name, &args, &opts).await;

    let mut body = out.into_string();
    if !prefixed {
        body = strip_prefixes(&body);
    }
    let (status, exit) = match &result {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    Response::builder()
        .status(status)
        .header("content-type", "text/plain; charset=utf-8")
        .header("Maestro-Exit", exit)
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// `?args=a,b&args=c` becomes `["a", "b", "c"]`.
fn parse_args(query: Option<&str>) -> Vec<String> {
    let Some(query) = query else { return Vec::new() };
    query
        .split('&')
        .filter_map(|pair| pair.strip_prefix("args="))
        .flat_map(|value| value.split(','))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Removes the leading `[name] ` prefix [`mst_shell::PrefixWriter`] adds to every line.
fn strip_prefixes(text: &str) -> String {
    text.lines()
        .map(|line| match line.find("] ") {
            Some(idx) if line.starts_with('[') => &line[idx + 2..],
            _ => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
        + if text.ends_with('\n') { "\n" } else { "" }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
