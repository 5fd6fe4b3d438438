// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level entry point (§4.6): resolves a command, installs the
//! cancellation context and signal watcher, splices in the `BEFORE`/`AFTER`/
//! `ERROR`/`SUCCESS` meta hooks around the prepared executer, and renders
//! help/version/dry-run text for the surfaces that need it without running
//! anything.

use crate::error::EngineError;
use crate::executer::{expand_line, ExecContext, Executer, PreparedCommand};
use crate::prepare::{prepare, RemoteRuntime};
use mst_core::Maestro;
use mst_shell::SharedSink;
use tracing::warn;

/// Per-invocation overrides layered on top of a command's own declared
/// settings — the CLI's `-nodeps`/`-echo`/`-eta` flags and the HTTP
/// facade's `Maestro-*` request headers both funnel through this (§6.2,
/// §6.3).
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub nodeps: bool,
    pub dry: bool,
    pub force_ignore: bool,
    pub force_trace: bool,
}

pub struct Orchestrator<'a> {
    pub maestro: &'a Maestro,
    pub remote: &'a RemoteRuntime,
    pub stdout: SharedSink,
    pub stderr: SharedSink,
}

impl<'a> Orchestrator<'a> {
    pub fn new(maestro: &'a Maestro, remote: &'a RemoteRuntime, stdout: SharedSink, stderr: SharedSink) -> Self {
        Orchestrator {
            maestro,
            remote,
            stdout,
            stderr,
        }
    }

    /// `Execute(name, args)` (§4.6 steps 3-8). `args` excludes any help
    /// flag; callers divert to [`Orchestrator::help`] before reaching here.
    pub async fn execute(&self, name: &str, args: &[String], opts: &ExecuteOptions) -> Result<(), EngineError> {
        let cmd = self.maestro.registry.lookup(name)?;
        if cmd.hidden {
            return Err(EngineError::Blocked { name: name.to_string() });
        }
        if !self.permitted(cmd) {
            return Err(EngineError::Forbidden { name: name.to_string() });
        }

        let mut prepared = prepare(self.maestro, name, args, opts.nodeps, self.remote)?;
        if opts.force_ignore {
            force_ignore(&mut prepared.body);
        }
        if opts.force_trace {
            prepared.body = Executer::Trace {
                inner: Box::new(prepared.body),
                name: prepared.name.clone(),
            };
        }

        if opts.dry {
            for line in render_dry_run(&prepared) {
                let _ = self.write_stdout(&line);
            }
            return Ok(());
        }

        let ctx = ExecContext::new(self.stdout.clone(), self.stderr.clone());
        let watcher = install_signal_watcher(ctx.cancel.clone());

        self.run_hook_list(&self.maestro.hooks.before, &ctx).await;

        let outcome = prepared.execute(&ctx).await;

        if !ctx.cancel.is_cancelled() {
            match &outcome {
                Ok(()) => self.run_hook_list(&self.maestro.hooks.success, &ctx).await,
                Err(_) => self.run_hook_list(&self.maestro.hooks.error, &ctx).await,
            }
        }
        self.run_hook_list(&self.maestro.hooks.after, &ctx).await;

        watcher.abort();

        match outcome {
            Ok(()) => Ok(()),
            Err(_) if cmd.error_mode == mst_core::ErrorMode::Ignore => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// `ExecuteDefault(args)`: runs the `DEFAULT` meta command, if set.
    pub async fn execute_default(&self, args: &[String], opts: &ExecuteOptions) -> Result<(), EngineError> {
        let name = self
            .maestro
            .default_command()
            .ok_or_else(|| EngineError::Registry(mst_core::RegistryError::NotFound {
                name: "default".to_string(),
                suggestions: Vec::new(),
            }))?;
        self.execute(name, args, opts).await
    }

    /// `ExecuteAll(args)`: runs every command named by `ALL` (or every
    /// visible command, when `ALL` was never set) in order, stopping at the
    /// first failure.
    pub async fn execute_all(&self, args: &[String], opts: &ExecuteOptions) -> Result<(), EngineError> {
        for name in self.maestro.all_commands() {
            self.execute(&name, args, opts).await?;
        }
        Ok(())
    }

    /// `ExecuteHelp(name)`: renders one command's help text, or the file's
    /// `USAGE`/`HELP` overview when `name` is `None`.
    pub fn help(&self, name: Option<&str>) -> Result<String, EngineError> {
        match name {
            None => Ok(self.maestro.meta.help.clone().unwrap_or_else(|| {
                self.maestro.meta.usage.clone().unwrap_or_default()
            })),
            Some(name) => {
                let cmd = self.maestro.registry.lookup(name)?;
                let mut out = format!("{}\n", cmd.name);
                if !cmd.short.is_empty() {
                    out.push_str(&format!("  {}\n", cmd.short));
                }
                if !cmd.help.is_empty() {
                    out.push_str(&format!("\n{}\n", cmd.help));
                }
                if !cmd.aliases.is_empty() {
                    out.push_str(&format!("aliases: {}\n", cmd.aliases.join(", ")));
                }
                Ok(out)
            }
        }
    }

    /// `ExecuteVersion()`.
    pub fn version(&self) -> String {
        self.maestro.meta.version.clone().unwrap_or_else(|| "0.0.0".to_string())
    }

    fn permitted(&self, cmd: &mst_core::CommandSettings) -> bool {
        if let Some(user) = &cmd.user {
            if std::env::var("USER").map(|v| &v != user).unwrap_or(true) {
                return false;
            }
        }
        if let Some(group) = &cmd.group {
            if std::env::var("GROUP").map(|v| &v != group).unwrap_or(true) {
                return false;
            }
        }
        true
    }

    async fn run_hook_list(&self, list: &Option<String>, parent_ctx: &ExecContext) {
        let Some(name) = list else { return };
        match prepare(self.maestro, name, &[], false, self.remote) {
            Ok(hook) => {
                let mut ctx = ExecContext::new(self.stdout.clone(), self.stderr.clone());
                ctx.cancel = parent_ctx.cancel.clone();
                if let Err(e) = hook.execute(&ctx).await {
                    warn!(hook = %name, error = %e, "hook command failed, ignoring");
                }
            }
            Err(e) => warn!(hook = %name, error = %e, "failed to prepare hook command, ignoring"),
        }
    }

    fn write_stdout(&self, line: &str) -> std::io::Result<()> {
        use mst_shell::PrefixWriter;
        PrefixWriter::new("", self.stdout.clone()).write_line(line)
    }
}

fn force_ignore(body: &mut Executer) {
    match body {
        Executer::Local(local) => local.ignore_errors = true,
        Executer::Retry { inner, .. } | Executer::Trace { inner, .. } => force_ignore(inner),
        Executer::SequenceSet { .. } | Executer::Remote(_) => {}
    }
}

fn render_dry_run(cmd: &PreparedCommand) -> Vec<String> {
    let mut lines = Vec::new();
    for dep in &cmd.deps {
        lines.extend(render_dry_run(&dep.executer));
    }
    render_body(&cmd.body, &mut lines);
    lines
}

fn render_body(body: &Executer, out: &mut Vec<String>) {
    match body {
        Executer::Local(local) => {
            for line in &local.script {
                match expand_line(&line.line, &local.env) {
                    Ok(words) => out.push(format!("[{}] {}", local.name, words.join(" "))),
                    Err(e) => out.push(format!("[{}] <expand error: {e}>", local.name)),
                }
            }
        }
        Executer::Remote(remote) => {
            for line in &remote.script {
                out.push(format!("[{}({})] {}", remote.name, remote.host, line));
            }
        }
        Executer::SequenceSet { members, .. } => {
            for member in members {
                render_body(member, out);
            }
        }
        Executer::Retry { inner, .. } | Executer::Trace { inner, .. } => render_body(inner, out),
    }
}

/// Cancels `cancel` when an interrupt or terminate signal is received
/// (§4.6 step 4, §9 "only the top-level orchestrator installs signal
/// handlers"). Returns a handle the caller aborts once the invocation has
/// finished, so the watcher task doesn't outlive it.
fn install_signal_watcher(cancel: tokio_util::sync::CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut term = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => return,
            };
            let mut int = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(_) => return,
            };
            tokio::select! {
                _ = term.recv() => cancel.cancel(),
                _ = int.recv() => cancel.cancel(),
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    })
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
