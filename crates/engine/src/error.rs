// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's unified error type. Inner crates keep their own precise
//! `thiserror` enums (§7); this crate only aggregates them at the
//! boundary where the orchestrator has to report one outcome.

use mst_core::{RegistryError, ValidationError};
use mst_lang::ExpandError;
use mst_shell::{ProcessError, RemoteError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Expand(#[from] ExpandError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("argument validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("missing required argument {name:?}")]
    MissingArgument { name: String },
    #[error("unknown option {0:?}")]
    UnknownOption(String),
    #[error("dependency cycle detected: {path}")]
    CycleError { path: String },
    #[error("command {name:?} timed out after {secs}s")]
    Timeout { name: String, secs: u64 },
    #[error("execution was canceled")]
    Canceled,
    #[error("command {name:?} is hidden and cannot be invoked directly")]
    Blocked { name: String },
    #[error("command {name:?} is not permitted for the current user/group")]
    Forbidden { name: String },
}
