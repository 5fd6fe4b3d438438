// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `export [-bin DIR]` (§6.2 supplemental): one executable shim script per
//! visible command, so a maestro file gets a standalone CLI surface without
//! requiring `mst` on `$PATH` for every call site.

use anyhow::{Context, Result};
use mst_core::Maestro;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub fn export_shims(maestro: &Maestro, dir: &Path, maestro_file: &Path) -> Result<Vec<String>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::new();
    for cmd in maestro.registry.visible() {
        let path = dir.join(&cmd.name);
        let script = format!(
            "#!/bin/sh\nexec mst -f {} {} \"$@\"\n",
            shell_quote(&maestro_file.display().to_string()),
            shell_quote(&cmd.name),
        );
        fs::write(&path, script).with_context(|| format!("writing {}", path.display()))?;
        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms)?;
        written.push(cmd.name.clone());
    }
    Ok(written)
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
