// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The CLI surface of §6.2: a handful of global flags plus dynamic
//! `<command-name> [args…]` dispatch, expressed with clap's
//! `external_subcommand` catch-all instead of the more elaborate
//! resource-group subcommand tree a larger CLI would carry.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mst",
    version,
    disable_version_flag = true,
    disable_help_subcommand = true,
    about = "Maestro: a declarative task runner with local and remote execution"
)]
pub struct Cli {
    /// Maestro file to load
    #[arg(short = 'f', long = "file", global = true, default_value = "maestro.mf")]
    pub file: PathBuf,

    /// Additional include search paths (comma-separated)
    #[arg(short = 'i', long = "include", global = true, value_delimiter = ',')]
    pub include: Vec<PathBuf>,

    /// Override the invoked command's remote hosts (comma-separated)
    #[arg(short = 'r', long = "remote", global = true, value_delimiter = ',')]
    pub remote: Vec<String>,

    /// Skip dependency resolution
    #[arg(long = "nodeps", global = true)]
    pub nodeps: bool,

    /// Render the resolved script instead of running it
    #[arg(long = "echo", global = true)]
    pub echo: bool,

    /// Swallow a failing command's exit code (force `error=ignore`)
    #[arg(long = "eta", global = true)]
    pub eta: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show usage, or one command's help text
    Help { name: Option<String> },
    /// Print the loaded file's `.VERSION`
    Version,
    /// Run the `ALL` meta-list (or every visible command if unset)
    All,
    /// Run the `DEFAULT` meta command
    Default,
    /// Render the fully-decoded maestro file
    #[command(alias = "debug")]
    Cat,
    /// Write one standalone shim script per visible command into a directory
    Export {
        #[arg(long = "bin", default_value = "bin")]
        bin: PathBuf,
    },
    /// Serve the HTTP facade (§6.3)
    Serve {
        #[arg(long, default_value = "127.0.0.1:7420")]
        addr: SocketAddr,
    },
    #[command(external_subcommand)]
    Named(Vec<String>),
}
