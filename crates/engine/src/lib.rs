// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Command preparation and execution: argument binding, the executer
//! algebra (§4.5), dependency-DAG resolution (§4.7), and the top-level
//! orchestrator (§4.6) that splices in hooks and owns the cancellation
//! context.

mod args;
mod error;
mod executer;
mod orchestrator;
mod prepare;

pub use args::bind_args;
pub use error::EngineError;
pub use executer::{ExecContext, Executer, LocalExecuter, PreparedCommand, PreparedDep, RemoteExecuter};
pub use orchestrator::{ExecuteOptions, Orchestrator};
pub use prepare::{prepare, RemoteRuntime};
