// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cat`/`debug` (§6.2 supplemental): renders the fully-decoded [`Maestro`]
//! aggregate as human-readable text.

use mst_core::Maestro;
use std::fmt::Write as _;

pub fn render_maestro(maestro: &Maestro) -> String {
    let mut out = String::new();
    if let Some(version) = &maestro.meta.version {
        let _ = writeln!(out, "version: {version}");
    }
    if let Some(author) = &maestro.meta.author {
        let _ = writeln!(out, "author: {author}");
    }
    if let Some(default) = &maestro.meta.default {
        let _ = writeln!(out, "default: {default}");
    }
    if !maestro.meta.all.is_empty() {
        let _ = writeln!(out, "all: {}", maestro.meta.all.join(", "));
    }
    out.push('\n');

    for cmd in maestro.registry.iter() {
        let _ = writeln!(out, "{}{}", cmd.name, if cmd.hidden { " (hidden)" } else { "" });
        if !cmd.short.is_empty() {
            let _ = writeln!(out, "  {}", cmd.short);
        }
        if !cmd.aliases.is_empty() {
            let _ = writeln!(out, "  aliases: {}", cmd.aliases.join(", "));
        }
        if !cmd.deps.is_empty() {
            let deps: Vec<String> = cmd
                .deps
                .iter()
                .map(|d| format!("{}{}", d.name, if d.background { "&" } else { "" }))
                .collect();
            let _ = writeln!(out, "  deps: {}", deps.join(", "));
        }
        if !cmd.hosts.is_empty() {
            let _ = writeln!(out, "  hosts: {}", cmd.hosts.join(", "));
        }
        if cmd.retry > 0 {
            let _ = writeln!(out, "  retry: {}", cmd.retry);
        }
        for line in &cmd.script {
            let _ = writeln!(out, "    {}", line.line);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
