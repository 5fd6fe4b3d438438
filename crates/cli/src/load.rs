// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns the CLI's `-f`/`-i` flags into a decoded [`Maestro`] and a
//! [`RemoteRuntime`] wired to the real `ssh2`-backed dialer. Host-key
//! verification defaults to trust-all: no example in the retrieval corpus
//! ships a `known_hosts`-file reader, and Maestro's own `.SSH_KNOWN_HOSTS`
//! meta is a path hint rather than a parsed format, so this is recorded in
//! DESIGN.md as a deliberately narrow gap rather than a silent one.

use crate::exit_error::ExitError;
use anyhow::Result;
use mst_core::Maestro;
use mst_engine::RemoteRuntime;
use mst_lang::Decoder;
use mst_shell::TrustAllKnownHosts;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn load_maestro(file: &Path, include: &[PathBuf]) -> Result<Maestro> {
    Decoder::decode_file(file, include.to_vec())
        .map_err(|e| ExitError::new(123, format!("{}: {e}", file.display())).into())
}

pub fn remote_runtime() -> RemoteRuntime {
    RemoteRuntime {
        dialer: Arc::new(mst_shell::remote::ssh::Ssh2Dialer),
        known_hosts: Arc::new(TrustAllKnownHosts),
    }
}
