// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binds a raw CLI/HTTP argument list to a command's declared `options`
//! and `args` (§6.1), producing an [`Environment`] frame where each
//! option/positional name resolves to its value(s). Validation (§7) runs
//! before any process is spawned.

use crate::error::EngineError;
use mst_core::{CommandSettings, Environment};

/// Parses `raw` against `cmd`'s option/positional descriptors and returns
/// a child environment with one binding per option (by long name, falling
/// back to the single-character short name) and one per positional
/// argument (by name), plus `ARGS` bound to every positional value in
/// order.
pub fn bind_args(cmd: &CommandSettings, raw: &[String]) -> Result<Environment, EngineError> {
    let mut env = cmd.locals.child();
    let mut positionals = Vec::new();
    let mut iter = raw.iter().peekable();

    while let Some(token) = iter.next() {
        if let Some(long) = token.strip_prefix("--") {
            let (name, inline_value) = match long.split_once('=') {
                Some((n, v)) => (n, Some(v.to_string())),
                None => (long, None),
            };
            let opt = cmd
                .options
                .iter()
                .find(|o| o.long.as_deref() == Some(name))
                .ok_or_else(|| EngineError::UnknownOption(format!("--{name}")))?;
            let value = if opt.flag {
                "true".to_string()
            } else {
                inline_value
                    .or_else(|| iter.next().cloned())
                    .or_else(|| opt.default.clone())
                    .ok_or_else(|| EngineError::MissingArgument {
                        name: name.to_string(),
                    })?
            };
            if let Some(validator) = &opt.validator {
                validator.validate(&value)?;
            }
            env.define(name.to_string(), vec![value]);
        } else if let Some(short) = token.strip_prefix('-').filter(|s| s.len() == 1) {
            let ch = short.chars().next().unwrap_or_default();
            let opt = cmd
                .options
                .iter()
                .find(|o| o.short == Some(ch))
                .ok_or_else(|| EngineError::UnknownOption(format!("-{ch}")))?;
            let key = opt.long.clone().unwrap_or_else(|| ch.to_string());
            let value = if opt.flag {
                "true".to_string()
            } else {
                iter.next()
                    .cloned()
                    .or_else(|| opt.default.clone())
                    .ok_or_else(|| EngineError::MissingArgument { name: key.clone() })?
            };
            if let Some(validator) = &opt.validator {
                validator.validate(&value)?;
            }
            env.define(key, vec![value]);
        } else {
            positionals.push(token.clone());
        }
    }

    for opt in &cmd.options {
        let key = opt.long.clone().or_else(|| opt.short.map(String::from));
        if let Some(key) = key {
            if !env.contains(&key) {
                if let Some(default) = &opt.default {
                    env.define(key, vec![default.clone()]);
                } else if opt.flag {
                    env.define(key, vec!["false".to_string()]);
                }
            }
        }
    }

    for (idx, arg) in cmd.args.iter().enumerate() {
        let value = positionals.get(idx).ok_or_else(|| EngineError::MissingArgument {
            name: arg.name.clone(),
        })?;
        if let Some(validator) = &arg.validator {
            validator.validate(value)?;
        }
        env.define(arg.name.clone(), vec![value.clone()]);
    }

    env.define("ARGS", positionals);
    Ok(env)
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
