// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pieces `CommandSettings` is built from: options, positional
//! arguments, dependency edges, and script lines.

use crate::validate::Validator;
use serde::{Deserialize, Serialize};

/// `(short, long, help, default, flag, validator)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub short: Option<char>,
    pub long: Option<String>,
    pub help: String,
    pub default: Option<String>,
    pub flag: bool,
    pub validator: Option<Validator>,
}

impl CommandOption {
    /// At least one of `short`/`long` must be set for an option to be valid.
    pub fn is_named(&self) -> bool {
        self.short.is_some() || self.long.is_some()
    }
}

/// A positional argument descriptor with an optional validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionalArg {
    pub name: String,
    pub help: String,
    pub validator: Option<Validator>,
}

/// `(name, args, background, optional)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dep {
    pub name: String,
    pub args: Vec<String>,
    pub background: bool,
    pub optional: bool,
}

impl Dep {
    pub fn new(name: impl Into<String>) -> Self {
        Dep {
            name: name.into(),
            args: Vec::new(),
            background: false,
            optional: false,
        }
    }
}

/// Per-line modifiers: `-` ignore exit code, `!` invert exit code,
/// `@` echo before running, `<name>` copy another command's body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptModifiers {
    pub ignore_exit: bool,
    pub invert_exit: bool,
    pub echo: bool,
    pub copy_of: Option<String>,
}

/// One logical script line, already joined across `\`-newline continuations,
/// with any leading modifiers peeled off into `modifiers`.
///
/// Macro forms (`.sequence`, `.repeat`) are expanded into concrete
/// `CommandScript` entries at decode time; by the time a `CommandSettings`
/// is registered, `script` is a flat list with no further synthesis left
/// to do at execution time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandScript {
    pub modifiers: ScriptModifiers,
    pub line: String,
}

impl CommandScript {
    pub fn plain(line: impl Into<String>) -> Self {
        CommandScript {
            modifiers: ScriptModifiers::default(),
            line: line.into(),
        }
    }
}

/// Whether a command's own execution error is propagated or swallowed.
///
/// Corresponds to the `error` command property of §6.1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorMode {
    #[default]
    Propagate,
    Ignore,
}
