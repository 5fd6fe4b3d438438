// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nested name→values scope used by the decoder and the expander.

use indexmap::IndexMap;
use std::sync::Arc;

/// A scoped environment frame with an optional parent.
///
/// `resolve` walks to the root; `define` writes only to the current frame;
/// `child` pushes a new frame on top of an immutable, shared parent;
/// `copy` produces a frame whose own bindings are independently owned so
/// that two concurrent preparations never observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    parent: Option<Arc<Environment>>,
    frame: IndexMap<String, Vec<String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a child frame whose parent is an immutable snapshot of `self`.
    pub fn child(&self) -> Environment {
        Environment {
            parent: Some(Arc::new(self.clone())),
            frame: IndexMap::new(),
        }
    }

    /// Deep clone: the returned environment owns its own frame and shares
    /// (read-only) ancestor frames via `Arc`.
    pub fn copy(&self) -> Environment {
        self.clone()
    }

    pub fn define(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.frame.insert(name.into(), values);
    }

    pub fn append(&mut self, name: impl Into<String>, more: Vec<String>) {
        let name = name.into();
        match self.frame.get_mut(&name) {
            Some(existing) => existing.extend(more),
            None => {
                // `+=` on an unset local still resolves through the parent
                // chain for the starting value, matching how a shell treats
                // an inherited variable.
                let mut values = self.resolve(&name).map(<[String]>::to_vec).unwrap_or_default();
                values.extend(more);
                self.frame.insert(name, values);
            }
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&[String]> {
        if let Some(values) = self.frame.get(name) {
            return Some(values.as_slice());
        }
        self.parent.as_deref().and_then(|p| p.resolve(name))
    }

    pub fn resolve_scalar(&self, name: &str) -> Option<String> {
        self.resolve(name).map(|values| values.join(" "))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn unset(&mut self, name: &str) {
        self.frame.shift_remove(name);
    }

    /// Names bound directly in this frame (not the parent chain).
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.frame.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
