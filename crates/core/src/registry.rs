// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name-and-alias command lookup (§4.4). `Registry::Prepare`, which turns a
//! looked-up `CommandSettings` into an `Executer`, lives in `mst-engine`
//! since it needs the expander and the I/O substrate; this crate only owns
//! registration and lookup.

use crate::command::{CommandOption, CommandScript, Dep, ErrorMode, PositionalArg};
use crate::environment::Environment;
use crate::maestro::DuplicatePolicy;
use crate::suggest::suggest;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The parsed form of one command definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandSettings {
    pub name: String,
    pub aliases: Vec<String>,
    pub short: String,
    pub help: String,
    pub tags: Vec<String>,
    pub retry: u32,
    pub workdir: Option<String>,
    pub timeout_secs: Option<u64>,
    pub hosts: Vec<String>,
    pub options: Vec<CommandOption>,
    pub args: Vec<PositionalArg>,
    pub deps: Vec<Dep>,
    pub env: IndexMap<String, String>,
    pub script: Vec<CommandScript>,
    pub hidden: bool,
    pub error_mode: ErrorMode,
    pub user: Option<String>,
    pub group: Option<String>,
    /// Local-variable scope captured at the point the command was defined.
    /// Excluded from the serializer used by the round-trip testable
    /// property (§8): it is runtime-only context, not part of the
    /// command's declared identity.
    #[serde(skip)]
    pub locals: Environment,
}

impl CommandSettings {
    pub fn new(name: impl Into<String>) -> Self {
        CommandSettings {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Merge `next`, defined later under `DUPLICATE=append`, onto `self`
    /// (`self` is mutated in place to become the combined definition).
    ///
    /// Merge rules (Open Question resolved in DESIGN.md):
    /// - `deps` and `script` concatenate in declaration order.
    /// - `options`/`args` are appended; a later option sharing a `long`
    ///   (falling back to `short`) name overrides the earlier one in place.
    /// - scalar metadata (`short`, `help`, `tags`, `workdir`, `retry`,
    ///   `timeout_secs`, `hosts`, `user`, `group`, `error_mode`) take the
    ///   later definition's value when it is non-default, else keep `self`.
    pub fn merge_append(&mut self, next: CommandSettings) {
        self.aliases.extend(next.aliases);
        self.aliases.sort();
        self.aliases.dedup();

        if !next.short.is_empty() {
            self.short = next.short;
        }
        if !next.help.is_empty() {
            self.help = next.help;
        }
        if !next.tags.is_empty() {
            self.tags = next.tags;
        }
        if next.retry != 0 {
            self.retry = next.retry;
        }
        if next.workdir.is_some() {
            self.workdir = next.workdir;
        }
        if next.timeout_secs.is_some() {
            self.timeout_secs = next.timeout_secs;
        }
        if !next.hosts.is_empty() {
            self.hosts = next.hosts;
        }
        if next.user.is_some() {
            self.user = next.user;
        }
        if next.group.is_some() {
            self.group = next.group;
        }
        if next.error_mode != ErrorMode::default() {
            self.error_mode = next.error_mode;
        }

        for opt in next.options {
            let key = opt.long.clone().or_else(|| opt.short.map(String::from));
            let existing = key.as_ref().and_then(|key| {
                self.options.iter().position(|o| {
                    let candidate = o.long.clone().or_else(|| o.short.map(String::from));
                    candidate.as_deref() == Some(key.as_str())
                })
            });
            match existing {
                Some(idx) => self.options[idx] = opt,
                None => self.options.push(opt),
            }
        }

        self.args.extend(next.args);
        self.deps.extend(next.deps);
        self.script.extend(next.script);
        for (k, v) in next.env {
            self.env.insert(k, v);
        }
        self.hidden = self.hidden && next.hidden;
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command {name:?} is already defined")]
    Duplicate { name: String },
    #[error("alias {alias:?} is already bound to {existing:?}")]
    DuplicateAlias { alias: String, existing: String },
    #[error("unknown command {name:?}{}", format_suggestions(suggestions))]
    NotFound {
        name: String,
        suggestions: Vec<String>,
    },
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {})", suggestions.join(", "))
    }
}

/// `command-name → CommandSettings`, with a secondary sorted alias index.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: IndexMap<String, CommandSettings>,
    aliases: BTreeMap<String, String>,
    duplicate_policy: DuplicatePolicy,
}

impl Registry {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Registry {
            commands: IndexMap::new(),
            aliases: BTreeMap::new(),
            duplicate_policy,
        }
    }

    pub fn register(&mut self, cmd: CommandSettings) -> Result<(), RegistryError> {
        for alias in &cmd.aliases {
            if let Some(existing) = self.aliases.get(alias) {
                if existing != &cmd.name {
                    return Err(RegistryError::DuplicateAlias {
                        alias: alias.clone(),
                        existing: existing.clone(),
                    });
                }
            }
        }

        if let Some(existing) = self.commands.shift_remove(&cmd.name) {
            let merged = match self.duplicate_policy {
                DuplicatePolicy::Error => {
                    self.commands.insert(existing.name.clone(), existing);
                    return Err(RegistryError::Duplicate { name: cmd.name });
                }
                DuplicatePolicy::Replace => cmd,
                DuplicatePolicy::Append => {
                    let mut combined = existing;
                    combined.merge_append(cmd);
                    combined
                }
            };
            for alias in &merged.aliases {
                self.aliases.insert(alias.clone(), merged.name.clone());
            }
            self.commands.insert(merged.name.clone(), merged);
            return Ok(());
        }

        for alias in &cmd.aliases {
            self.aliases.insert(alias.clone(), cmd.name.clone());
        }
        self.commands.insert(cmd.name.clone(), cmd);
        Ok(())
    }

    /// Binds `alias` to the command already registered as `target`, without
    /// going through `register`'s duplicate-policy merge (an `alias`
    /// directive names an existing command, it doesn't redefine one).
    pub fn bind_alias(&mut self, alias: String, target: &str) -> Result<(), RegistryError> {
        if let Some(existing) = self.aliases.get(&alias) {
            if existing != target {
                return Err(RegistryError::DuplicateAlias {
                    alias,
                    existing: existing.clone(),
                });
            }
            return Ok(());
        }
        if !self.commands.contains_key(target) {
            return Err(RegistryError::NotFound {
                name: target.to_string(),
                suggestions: suggest(target, self.known_names(), 3),
            });
        }
        if let Some(cmd) = self.commands.get_mut(target) {
            if !cmd.aliases.contains(&alias) {
                cmd.aliases.push(alias.clone());
                cmd.aliases.sort();
            }
        }
        self.aliases.insert(alias, target.to_string());
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&CommandSettings, RegistryError> {
        if let Some(cmd) = self.commands.get(name) {
            return Ok(cmd);
        }
        if let Some(target) = self.aliases.get(name) {
            if let Some(cmd) = self.commands.get(target) {
                return Ok(cmd);
            }
        }
        Err(RegistryError::NotFound {
            name: name.to_string(),
            suggestions: suggest(name, self.known_names(), 3),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Overrides `name`'s configured hosts, for the CLI's `-r HOSTS` flag
    /// (§6.2). Resolves aliases the same way [`Registry::lookup`] does.
    pub fn override_hosts(&mut self, name: &str, hosts: Vec<String>) -> Result<(), RegistryError> {
        let target = if self.commands.contains_key(name) {
            name.to_string()
        } else if let Some(target) = self.aliases.get(name) {
            target.clone()
        } else {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
                suggestions: suggest(name, self.known_names(), 3),
            });
        };
        if let Some(cmd) = self.commands.get_mut(&target) {
            cmd.hosts = hosts;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSettings> {
        self.commands.values()
    }

    pub fn visible(&self) -> impl Iterator<Item = &CommandSettings> {
        self.commands.values().filter(|c| !c.hidden)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn known_names(&self) -> impl Iterator<Item = &str> {
        self.commands
            .keys()
            .map(String::as_str)
            .chain(self.aliases.keys().map(String::as_str))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
