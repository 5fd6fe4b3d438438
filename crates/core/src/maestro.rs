// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level aggregate produced by a `load` call (§3): metadata, exec
//! hooks, remote and HTTP configuration, the registry, and the root locals
//! environment. Built only during decoding; read-only during execution.

use crate::environment::Environment;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// How the registry reacts to a second definition of the same command name
/// (§4.2, §9). Set by the `DUPLICATE` meta property; defaults to `Replace`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    Error,
    #[default]
    Replace,
    Append,
}

impl DuplicatePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "error" => Some(DuplicatePolicy::Error),
            "replace" => Some(DuplicatePolicy::Replace),
            "append" => Some(DuplicatePolicy::Append),
            _ => None,
        }
    }
}

/// File-level metadata (§6.1): `AUTHOR`, `EMAIL`, `VERSION`, `USAGE`,
/// `HELP`, `TRACE`, `WORKDIR`, `ALL`, `DEFAULT`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub author: Option<String>,
    pub email: Option<String>,
    pub version: Option<String>,
    pub usage: Option<String>,
    pub help: Option<String>,
    pub trace: bool,
    pub workdir: Option<String>,
    pub all: Vec<String>,
    pub default: Option<String>,
}

/// `BEFORE`/`AFTER`/`ERROR`/`SUCCESS` hook command names (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecHooks {
    pub before: Option<String>,
    pub after: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// `SSH_*` meta properties governing remote execution fan-out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub ssh_user: Option<String>,
    pub ssh_password: Option<String>,
    pub ssh_pubkey: Option<String>,
    pub ssh_known_hosts: Option<String>,
    /// Maximum concurrent remote sessions; `None` means unbounded.
    pub ssh_parallel: Option<usize>,
}

/// `HTTP_*` meta properties governing the HTTP facade's TLS listener.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebConfig {
    pub http_cert_file: Option<String>,
    pub http_cert_key: Option<String>,
}

/// The parsed, fully-decoded form of one Maestro file: metadata, hooks,
/// remote/HTTP config, the command registry, and the root environment that
/// locals were accumulated into while decoding.
#[derive(Debug, Clone)]
pub struct Maestro {
    pub meta: Meta,
    pub hooks: ExecHooks,
    pub remote: RemoteConfig,
    pub web: WebConfig,
    pub duplicate_policy: DuplicatePolicy,
    pub registry: Registry,
    pub locals: Environment,
}

impl Maestro {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Maestro {
            meta: Meta::default(),
            hooks: ExecHooks::default(),
            remote: RemoteConfig::default(),
            web: WebConfig::default(),
            duplicate_policy,
            registry: Registry::new(duplicate_policy),
            locals: Environment::new(),
        }
    }

    /// The command named by `DEFAULT`, if the file declared one.
    pub fn default_command(&self) -> Option<&str> {
        self.meta.default.as_deref()
    }

    /// Commands named by `ALL`, in declaration order, falling back to every
    /// visible registered command when `ALL` was never set (§6.2 `all`).
    pub fn all_commands(&self) -> Vec<String> {
        if self.meta.all.is_empty() {
            self.registry.visible().map(|c| c.name.clone()).collect()
        } else {
            self.meta.all.clone()
        }
    }
}

impl Default for Maestro {
    fn default() -> Self {
        Maestro::new(DuplicatePolicy::default())
    }
}

#[cfg(test)]
#[path = "maestro_tests.rs"]
mod tests;
