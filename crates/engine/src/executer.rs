// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executer algebra (§4.5): a closed set of tagged variants behind one
//! `execute` capability, per the redesign flag in §9 ("prefer a closed set
//! of tagged variants... keep the hierarchy flat").

use crate::error::EngineError;
use mst_core::{CommandScript, Environment};
use mst_lang::{expand, parse, split_words};
use mst_shell::{Dialer, HostSemaphore, KnownHosts, LocalProcess, PrefixWriter, ProcessError, RemoteAuth, SharedSink};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared, per-top-level-invocation state threaded through every executer.
#[derive(Clone)]
pub struct ExecContext {
    pub cancel: CancellationToken,
    pub stdout: SharedSink,
    pub stderr: SharedSink,
    /// Command names that have already run once in this invocation (§4.4,
    /// §4.7 dependency dedup).
    pub already_ran: Arc<AsyncMutex<HashSet<String>>>,
}

impl ExecContext {
    pub fn new(stdout: SharedSink, stderr: SharedSink) -> Self {
        ExecContext {
            cancel: CancellationToken::new(),
            stdout,
            stderr,
            already_ran: Arc::new(AsyncMutex::new(HashSet::new())),
        }
    }
}

/// A dependency edge materialized into its prepared command. `Arc`-wrapped
/// so background dependencies can be spawned onto their own task while the
/// tree that references them stays alive. `name` is the dependency's
/// declared command name, used only to deduplicate repeated references to
/// the same dependency within one invocation (§4.4, §4.7) — it plays no
/// part in deduplicating separate top-level invocations of a command.
#[derive(Debug)]
pub struct PreparedDep {
    pub name: String,
    pub executer: Arc<PreparedCommand>,
    pub background: bool,
    pub optional: bool,
}

/// One prepared command: its (possibly empty) dependency edges, and the
/// executer that runs its own script once every dependency has settled.
/// Keeping `deps` here, one level above the [`Executer`] algebra, means a
/// multi-host `remote` fan-out resolves its dependencies exactly once,
/// before any host's session opens — not once per host.
#[derive(Debug)]
pub struct PreparedCommand {
    pub name: String,
    pub deps: Vec<PreparedDep>,
    pub body: Executer,
}

impl PreparedCommand {
    pub fn execute<'a>(
        &'a self,
        ctx: &'a ExecContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            run_deps(&self.deps, ctx).await?;
            self.body.execute(ctx).await
        })
    }
}

/// `local` (§4.5): captured environment, resolved workdir, exported
/// `K=V` environment, and the flat script body.
#[derive(Debug)]
pub struct LocalExecuter {
    pub name: String,
    pub env: Environment,
    pub workdir: PathBuf,
    pub exported_env: HashMap<String, String>,
    pub script: Vec<CommandScript>,
    pub ignore_errors: bool,
    pub timeout: Option<Duration>,
}

/// `remote` (§4.5): one secure-shell connection, one session per script
/// line. Fan-out across multiple hosts is a `sequence-set` of these.
pub struct RemoteExecuter {
    pub name: String,
    pub host: String,
    pub auth: RemoteAuth,
    pub script: Vec<String>,
    pub dialer: Arc<dyn Dialer>,
    pub known_hosts: Arc<dyn KnownHosts>,
}

impl std::fmt::Debug for RemoteExecuter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecuter")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("auth", &self.auth)
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}

/// The closed set of executer variants (§9 redesign flag).
#[derive(Debug)]
pub enum Executer {
    Local(Box<LocalExecuter>),
    Remote(Box<RemoteExecuter>),
    SequenceSet {
        members: Vec<Arc<Executer>>,
        max_concurrency: Option<HostSemaphore>,
    },
    Retry {
        inner: Box<Executer>,
        attempts: u32,
    },
    Trace {
        inner: Box<Executer>,
        name: String,
    },
}

impl Executer {
    pub fn execute<'a>(
        &'a self,
        ctx: &'a ExecContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            match self {
                Executer::Local(local) => local.run(ctx).await,
                Executer::Remote(remote) => remote.run(ctx).await,
                Executer::SequenceSet { members, max_concurrency } => {
                    run_sequence_set(members, max_concurrency.as_ref(), ctx).await
                }
                Executer::Retry { inner, attempts } => run_retry(inner, *attempts, ctx).await,
                Executer::Trace { inner, name } => run_traced(inner, name, ctx).await,
            }
        })
    }
}

impl LocalExecuter {
    async fn run(&self, ctx: &ExecContext) -> Result<(), EngineError> {
        let run_body = async {
            for line in &self.script {
                if ctx.cancel.is_cancelled() {
                    return Err(EngineError::Canceled);
                }
                let expanded = expand_line(&line.line, &self.env)?;
                if expanded.is_empty() {
                    continue;
                }
                let argv = LocalProcess::glob_expand(expanded, &self.workdir);
                let stdout = PrefixWriter::new(format!("[{}] ", self.name), ctx.stdout.clone());
                let stderr = PrefixWriter::new(format!("[{}] ", self.name), ctx.stderr.clone());
                if line.modifiers.echo {
                    let _ = stdout.write_line(&argv.join(" "));
                }
                let proc = LocalProcess {
                    argv,
                    workdir: self.workdir.clone(),
                    env: self.exported_env.clone(),
                };
                let result = proc.run(stdout, stderr).await;
                match result {
                    Ok(()) if line.modifiers.invert_exit => {
                        return Err(EngineError::Process(ProcessError::ExecFailed {
                            cmd: self.name.clone(),
                            code: 0,
                        }));
                    }
                    Ok(()) => {}
                    Err(e) if line.modifiers.invert_exit => {
                        let _ = e;
                    }
                    Err(_) if line.modifiers.ignore_exit => {}
                    Err(e) => return Err(EngineError::Process(e)),
                }
            }
            Ok(())
        };

        let outcome = match self.timeout {
            Some(duration) => match tokio::time::timeout(duration, run_body).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout {
                    name: self.name.clone(),
                    secs: duration.as_secs(),
                }),
            },
            None => run_body.await,
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(_) if self.ignore_errors => Ok(()),
            Err(e) => Err(e),
        }
    }
}

pub(crate) fn expand_line(line: &str, env: &Environment) -> Result<Vec<String>, EngineError> {
    let mut out = Vec::new();
    for word in split_words(line)? {
        let node = parse(&word)?;
        out.extend(expand(&node, env)?);
    }
    Ok(out)
}

/// Returns `true` if this invocation is the first to claim `name` as
/// already run; a `false` return means a sibling dependency reference
/// already ran it and this one should be skipped.
async fn claim(ctx: &ExecContext, name: &str) -> bool {
    ctx.already_ran.lock().await.insert(name.to_string())
}

async fn run_deps(deps: &[PreparedDep], ctx: &ExecContext) -> Result<(), EngineError> {
    let mut background: JoinSet<Result<bool, EngineError>> = JoinSet::new();
    for dep in deps.iter().filter(|d| d.background) {
        if !claim(ctx, &dep.name).await {
            continue;
        }
        let command = dep.executer.clone();
        let optional = dep.optional;
        let ctx = ctx.clone();
        background.spawn(async move {
            match command.execute(&ctx).await {
                Ok(()) => Ok(true),
                Err(_) if optional => Ok(true),
                Err(e) => {
                    ctx.cancel.cancel();
                    Err(e)
                }
            }
        });
    }

    let mut first_error = None;
    for dep in deps.iter().filter(|d| !d.background) {
        if ctx.cancel.is_cancelled() {
            first_error.get_or_insert(EngineError::Canceled);
            break;
        }
        if !claim(ctx, &dep.name).await {
            continue;
        }
        match dep.executer.execute(ctx).await {
            Ok(()) => {}
            Err(_) if dep.optional => {}
            Err(e) => {
                ctx.cancel.cancel();
                first_error = Some(e);
                break;
            }
        }
    }

    while let Some(joined) = background.join_next().await {
        match joined {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(e) => {
                warn!(error = %e, "background dependency task panicked");
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl RemoteExecuter {
    async fn run(&self, ctx: &ExecContext) -> Result<(), EngineError> {
        let session = self
            .dialer
            .dial(&self.host, &self.auth, self.known_hosts.clone())
            .await?;
        for line in &self.script {
            if ctx.cancel.is_cancelled() {
                return Err(EngineError::Canceled);
            }
            let writer = PrefixWriter::new(format!("[{}({})] ", self.name, self.host), ctx.stdout.clone());
            let _ = writer.write_line(line);
            session.run_line(line, &HashMap::new()).await?;
        }
        Ok(())
    }
}

async fn run_sequence_set(
    members: &[Arc<Executer>],
    max_concurrency: Option<&HostSemaphore>,
    ctx: &ExecContext,
) -> Result<(), EngineError> {
    let mut tasks: JoinSet<Result<(), EngineError>> = JoinSet::new();
    for member in members {
        let executer = member.clone();
        let ctx = ctx.clone();
        let semaphore = max_concurrency.cloned();
        tasks.spawn(async move {
            let _permit = match &semaphore {
                Some(sem) => Some(sem.acquire().await),
                None => None,
            };
            executer.execute(&ctx).await
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                ctx.cancel.cancel();
                first_error.get_or_insert(e);
            }
            Err(e) => {
                warn!(error = %e, "sequence-set member task panicked");
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn run_retry(inner: &Executer, attempts: u32, ctx: &ExecContext) -> Result<(), EngineError> {
    let attempts = attempts.max(1);
    let mut last = Ok(());
    for attempt in 1..=attempts {
        if ctx.cancel.is_cancelled() {
            return Err(EngineError::Canceled);
        }
        last = inner.execute(ctx).await;
        if last.is_ok() {
            return Ok(());
        }
        if ctx.cancel.is_cancelled() {
            break;
        }
        info!(attempt, attempts, "retrying failed executer");
    }
    last
}

async fn run_traced(inner: &Executer, name: &str, ctx: &ExecContext) -> Result<(), EngineError> {
    let start_line = PrefixWriter::new("", ctx.stderr.clone());
    let _ = start_line.write_line(&format!("[{name}] start"));
    let started = Instant::now();
    let result = inner.execute(ctx).await;
    let elapsed = started.elapsed();
    let end_line = PrefixWriter::new("", ctx.stderr.clone());
    match &result {
        Ok(()) => {
            let _ = end_line.write_line(&format!("[{name}] done in {:.3}s", elapsed.as_secs_f64()));
        }
        Err(e) => {
            let _ = end_line.write_line(&format!("[{name}] failed: {e}"));
        }
    }
    result
}

#[cfg(test)]
#[path = "executer_tests.rs"]
mod tests;
