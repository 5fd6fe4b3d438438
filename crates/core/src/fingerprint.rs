// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content fingerprinting for include-cycle detection (§4.2, design note:
//! "detect by fingerprinting file contents as they are scanned, not just by
//! canonical path").

use sha2::{Digest, Sha256};

/// A content fingerprint, stable across paths that resolve to the same
/// bytes (e.g. a symlinked or re-included file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

pub fn fingerprint(content: &str) -> Fingerprint {
    let digest = Sha256::digest(content.as_bytes());
    Fingerprint(digest.into())
}
