// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local subprocess spawning for one expanded script line (§4.5 `local`).
//!
//! [`LocalProcess::run`] spawns argv\[0\] with the remaining elements as
//! arguments, wires its stdout/stderr through a pair of background
//! line-copiers into the caller's [`PrefixWriter`]s, and waits for exit.
//! Lines are UTF-8 text split on `\n`; filename-glob expansion (the fix for
//! the open question in the design notes) runs once per already
//! word-split argument, after all brace/parameter expansion has produced
//! the final word list — never interleaved with it.

use crate::prefix::PrefixWriter;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command line")]
    EmptyLine,
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{cmd} exited with status {code}")]
    ExecFailed { cmd: String, code: i32 },
    #[error("{cmd} terminated by signal")]
    Signaled { cmd: String },
}

/// One already-expanded process invocation: `argv[0]` is the program.
pub struct LocalProcess {
    pub argv: Vec<String>,
    pub workdir: PathBuf,
    pub env: HashMap<String, String>,
}

impl LocalProcess {
    /// Expands filename globs in each argument against `workdir`, once per
    /// word and only after word splitting has already produced `argv`. A
    /// word with no glob metacharacters, or that matches nothing, passes
    /// through unchanged (shell `nullglob`-off behavior).
    pub fn glob_expand(argv: Vec<String>, workdir: &std::path::Path) -> Vec<String> {
        let mut out = Vec::with_capacity(argv.len());
        for word in argv {
            if !word.contains('*') && !word.contains('?') && !word.contains('[') {
                out.push(word);
                continue;
            }
            let pattern = workdir.join(&word);
            let matches: Vec<String> = glob::glob(&pattern.to_string_lossy())
                .ok()
                .into_iter()
                .flatten()
                .filter_map(Result::ok)
                .filter_map(|p| p.strip_prefix(workdir).map(|p| p.to_path_buf()).ok())
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            if matches.is_empty() {
                out.push(word);
            } else {
                out.extend(matches);
            }
        }
        out
    }

    /// Spawns the process, streaming stdout/stderr line-by-line into the
    /// given prefix writers, and waits for it to exit.
    pub async fn run(
        self,
        stdout: PrefixWriter,
        stderr: PrefixWriter,
    ) -> Result<(), ProcessError> {
        let (program, args) = self
            .argv
            .split_first()
            .map(|(p, rest)| (p.clone(), rest.to_vec()))
            .ok_or(ProcessError::EmptyLine)?;

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(&self.workdir)
            .envs(&self.env)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let out_pipe = child.stdout.take();
        let err_pipe = child.stderr.take();

        let out_task = tokio::spawn(async move {
            if let Some(pipe) = out_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let _ = stdout.write_line(&line);
                }
            }
        });
        let err_task = tokio::spawn(async move {
            if let Some(pipe) = err_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let _ = stderr.write_line(&line);
                }
            }
        });

        let status = child.wait().await.map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;
        let _ = out_task.await;
        let _ = err_task.await;

        match status.code() {
            Some(0) => {
                info!(cmd = %program, "process exited 0");
                Ok(())
            }
            Some(code) => {
                warn!(cmd = %program, code, "process exited non-zero");
                Err(ProcessError::ExecFailed {
                    cmd: program,
                    code,
                })
            }
            None => Err(ProcessError::Signaled { cmd: program }),
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
