// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Registry::Prepare` (§4.4): looks a command up, binds its arguments,
//! and recursively materializes its dependency tree into a
//! [`PreparedCommand`], detecting cycles along the way with a per-walk
//! visiting stack.

use crate::args::bind_args;
use crate::error::EngineError;
use crate::executer::{Executer, LocalExecuter, PreparedCommand, PreparedDep, RemoteExecuter};
use mst_core::{CommandScript, Maestro};
use mst_shell::{Dialer, KnownHosts, RemoteAuth};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// The remote-session building blocks a preparation needs but does not own:
/// supplied by the caller (CLI/daemon) so test code can hand in
/// [`mst_shell::FakeSession`]-backed doubles instead of dialing real hosts.
pub struct RemoteRuntime {
    pub dialer: Arc<dyn Dialer>,
    pub known_hosts: Arc<dyn KnownHosts>,
}

/// Prepares `name` (with `raw_args` bound against its declared options and
/// positionals) into an executable tree. `nodeps` skips dependency
/// resolution entirely (the `-nodeps` CLI flag, §6.2).
pub fn prepare(
    maestro: &Maestro,
    name: &str,
    raw_args: &[String],
    nodeps: bool,
    remote: &RemoteRuntime,
) -> Result<PreparedCommand, EngineError> {
    let mut visiting = Vec::new();
    prepare_inner(maestro, name, raw_args, nodeps, remote, &mut visiting)
}

fn prepare_inner(
    maestro: &Maestro,
    name: &str,
    raw_args: &[String],
    nodeps: bool,
    remote: &RemoteRuntime,
    visiting: &mut Vec<String>,
) -> Result<PreparedCommand, EngineError> {
    if visiting.iter().any(|n| n == name) {
        let mut path = visiting.clone();
        path.push(name.to_string());
        return Err(EngineError::CycleError { path: path.join(" -> ") });
    }

    let cmd = maestro.registry.lookup(name)?;
    let env = bind_args(cmd, raw_args)?;

    visiting.push(name.to_string());
    let deps = if nodeps {
        Vec::new()
    } else {
        let mut prepared = Vec::with_capacity(cmd.deps.len());
        for dep in &cmd.deps {
            let executer = prepare_inner(maestro, &dep.name, &dep.args, false, remote, visiting)?;
            prepared.push(PreparedDep {
                name: dep.name.clone(),
                executer: Arc::new(executer),
                background: dep.background,
                optional: dep.optional,
            });
        }
        prepared
    };
    visiting.pop();

    let workdir = cmd
        .workdir
        .clone()
        .or_else(|| maestro.meta.workdir.clone())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let exported_env: std::collections::HashMap<String, String> =
        cmd.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    let script = resolve_copy_of(&cmd.script, maestro, &mut vec![cmd.name.clone()])?;

    let body = if cmd.hosts.is_empty() {
        Executer::Local(Box::new(LocalExecuter {
            name: cmd.name.clone(),
            env: env.clone(),
            workdir,
            exported_env,
            script,
            ignore_errors: cmd.error_mode == mst_core::ErrorMode::Ignore,
            timeout: cmd.timeout_secs.map(Duration::from_secs),
        }))
    } else {
        build_remote_body(cmd, &script, &env, maestro, remote)?
    };

    let body = wrap_trace(wrap_retry(body, cmd.retry), maestro.meta.trace, &cmd.name);

    Ok(PreparedCommand {
        name: cmd.name.clone(),
        deps,
        body,
    })
}

/// Splices `<name>` lines with the named command's own (recursively
/// resolved) script body, per the `copy_of` modifier (§6.1 line modifiers).
/// The copying line's `ignore_exit`/`invert_exit`/`echo` modifiers carry
/// over onto every spliced-in line in addition to that line's own.
fn resolve_copy_of(
    script: &[CommandScript],
    maestro: &Maestro,
    seen: &mut Vec<String>,
) -> Result<Vec<CommandScript>, EngineError> {
    let mut out = Vec::with_capacity(script.len());
    for line in script {
        let Some(target) = &line.modifiers.copy_of else {
            out.push(line.clone());
            continue;
        };
        if seen.iter().any(|n| n == target) {
            let mut path = seen.clone();
            path.push(target.clone());
            return Err(EngineError::CycleError { path: path.join(" -> ") });
        }
        let target_cmd = maestro.registry.lookup(target)?;
        seen.push(target.clone());
        let spliced = resolve_copy_of(&target_cmd.script, maestro, seen)?;
        seen.pop();
        for mut copied in spliced {
            copied.modifiers.ignore_exit |= line.modifiers.ignore_exit;
            copied.modifiers.invert_exit |= line.modifiers.invert_exit;
            copied.modifiers.echo |= line.modifiers.echo;
            out.push(copied);
        }
    }
    Ok(out)
}

fn wrap_retry(body: Executer, attempts: u32) -> Executer {
    if attempts <= 1 {
        body
    } else {
        Executer::Retry {
            inner: Box::new(body),
            attempts,
        }
    }
}

fn wrap_trace(body: Executer, trace_enabled: bool, name: &str) -> Executer {
    if trace_enabled {
        Executer::Trace {
            inner: Box::new(body),
            name: name.to_string(),
        }
    } else {
        body
    }
}

fn build_remote_body(
    cmd: &mst_core::CommandSettings,
    script: &[CommandScript],
    env: &mst_core::Environment,
    maestro: &Maestro,
    remote: &RemoteRuntime,
) -> Result<Executer, EngineError> {
    use crate::executer::expand_line;

    let auth = RemoteAuth {
        user: maestro.remote.ssh_user.clone().unwrap_or_default(),
        password: maestro.remote.ssh_password.clone(),
        pubkey_path: maestro.remote.ssh_pubkey.clone(),
    };

    let mut lines = Vec::with_capacity(script.len());
    for line in script {
        lines.push(expand_line(&line.line, env)?.join(" "));
    }

    if cmd.hosts.len() == 1 {
        return Ok(Executer::Remote(Box::new(RemoteExecuter {
            name: cmd.name.clone(),
            host: cmd.hosts[0].clone(),
            auth,
            script: lines,
            dialer: remote.dialer.clone(),
            known_hosts: remote.known_hosts.clone(),
        })));
    }

    let members = cmd
        .hosts
        .iter()
        .map(|host| {
            Arc::new(Executer::Remote(Box::new(RemoteExecuter {
                name: cmd.name.clone(),
                host: host.clone(),
                auth: auth.clone(),
                script: lines.clone(),
                dialer: remote.dialer.clone(),
                known_hosts: remote.known_hosts.clone(),
            })))
        })
        .collect();

    let max_concurrency = maestro
        .remote
        .ssh_parallel
        .map(mst_shell::HostSemaphore::new);

    Ok(Executer::SequenceSet {
        members,
        max_concurrency,
    })
}

#[cfg(test)]
#[path = "prepare_tests.rs"]
mod tests;
