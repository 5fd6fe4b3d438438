// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The I/O and concurrency substrate (§5, §9): line-atomic prefixed
//! writers, local subprocess spawning with filename-glob expansion, and
//! the remote-session trait with its fake and `ssh2`-backed
//! implementations behind a counting semaphore for host fan-out.

pub mod prefix;
pub mod process;
pub mod remote;

pub use prefix::{PrefixWriter, SharedSink};
pub use process::{LocalProcess, ProcessError};
pub use remote::{
    Dialer, FakeDialer, FakeSession, HostSemaphore, KnownHosts, RemoteAuth, RemoteError,
    RemoteSession, TrustAllKnownHosts,
};
