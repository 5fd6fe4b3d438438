// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The CLI surface of §6.2. `run()` is the single entry point the root
//! binary calls; everything else here is argument binding, file loading,
//! and mapping the outcome onto one of the three documented exit codes.

mod args;
mod exit_error;
mod export;
mod load;
mod render;

use anyhow::Result;
use args::{Cli, Command};
use clap::Parser;
use exit_error::ExitError;
use mst_core::Maestro;
use mst_engine::{ExecuteOptions, Orchestrator, RemoteRuntime};
use mst_shell::SharedSink;

/// Parses argv, runs the requested operation, and returns the process exit
/// code (§6.2: `0` success, `122` command execution failed, `123` parse
/// failure).
pub async fn run() -> i32 {
    setup_logging();
    match dispatch().await {
        Ok(()) => 0,
        Err(e) => {
            let code = e.downcast_ref::<ExitError>().map_or(122, |x| x.code);
            let msg = e.to_string();
            if !msg.is_empty() {
                eprintln!("Error: {msg}");
            }
            code
        }
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

async fn dispatch() -> Result<()> {
    dispatch_with(Cli::parse()).await
}

async fn dispatch_with(cli: Cli) -> Result<()> {
    match &cli.command {
        None | Some(Command::Help { name: None }) => {
            let maestro = load::load_maestro(&cli.file, &cli.include)?;
            println!("{}", help_text(&maestro, None));
            return Ok(());
        }
        Some(Command::Help { name: Some(name) }) => {
            let maestro = load::load_maestro(&cli.file, &cli.include)?;
            println!("{}", help_text(&maestro, Some(name.as_str())));
            return Ok(());
        }
        Some(Command::Version) => {
            let maestro = load::load_maestro(&cli.file, &cli.include)?;
            println!("{}", maestro.meta.version.unwrap_or_else(|| "0.0.0".to_string()));
            return Ok(());
        }
        Some(Command::Cat) => {
            let maestro = load::load_maestro(&cli.file, &cli.include)?;
            print!("{}", render::render_maestro(&maestro));
            return Ok(());
        }
        Some(Command::Export { bin }) => {
            let maestro = load::load_maestro(&cli.file, &cli.include)?;
            let written = export::export_shims(&maestro, bin, &cli.file)?;
            println!("wrote {} shim(s) into {}", written.len(), bin.display());
            return Ok(());
        }
        Some(Command::Serve { addr }) => {
            let maestro = load::load_maestro(&cli.file, &cli.include)?;
            let state = mst_daemon::AppState {
                maestro: std::sync::Arc::new(maestro),
                remote: std::sync::Arc::new(load::remote_runtime()),
            };
            mst_daemon::serve(state, *addr).await.map_err(|e| ExitError::new(122, e.to_string()))?;
            return Ok(());
        }
        _ => {}
    }

    let mut maestro = load::load_maestro(&cli.file, &cli.include)?;
    let opts = ExecuteOptions {
        nodeps: cli.nodeps,
        dry: cli.echo,
        force_ignore: cli.eta,
        force_trace: false,
    };

    let (name, args): (Option<String>, Vec<String>) = match &cli.command {
        Some(Command::All) => (None, Vec::new()),
        Some(Command::Default) => (None, Vec::new()),
        Some(Command::Named(rest)) => {
            let mut rest = rest.clone();
            if rest.is_empty() {
                return Err(ExitError::new(123, "missing command name".to_string()).into());
            }
            let name = rest.remove(0);
            (Some(name), rest)
        }
        _ => unreachable!("handled above"),
    };

    if let Some(name) = &name {
        if !cli.remote.is_empty() {
            maestro.registry.override_hosts(name, cli.remote.clone())?;
        }
    }

    let remote = load::remote_runtime();
    let orch = Orchestrator::new(&maestro, &remote, SharedSink::new(std::io::stdout()), SharedSink::new(std::io::stderr()));

    let result = match &cli.command {
        Some(Command::All) => orch.execute_all(&args, &opts).await,
        Some(Command::Default) => orch.execute_default(&args, &opts).await,
        _ => orch.execute(name.as_deref().unwrap_or_default(), &args, &opts).await,
    };

    result.map_err(|e| ExitError::new(122, e.to_string()).into())
}

fn help_text(maestro: &Maestro, name: Option<&str>) -> String {
    match name {
        None => maestro
            .meta
            .help
            .clone()
            .or_else(|| maestro.meta.usage.clone())
            .unwrap_or_else(|| "usage: mst <command> [args...]".to_string()),
        Some(name) => match maestro.registry.lookup(name) {
            Ok(cmd) => {
                let mut out = cmd.name.clone();
                if !cmd.short.is_empty() {
                    out.push_str(&format!("\n  {}", cmd.short));
                }
                if !cmd.help.is_empty() {
                    out.push_str(&format!("\n\n{}", cmd.help));
                }
                out
            }
            Err(e) => e.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
