// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::CommandSettings;

#[test]
fn duplicate_policy_parses_known_names_case_insensitively() {
    assert_eq!(DuplicatePolicy::parse("Error"), Some(DuplicatePolicy::Error));
    assert_eq!(DuplicatePolicy::parse("replace"), Some(DuplicatePolicy::Replace));
    assert_eq!(DuplicatePolicy::parse("APPEND"), Some(DuplicatePolicy::Append));
    assert_eq!(DuplicatePolicy::parse("nonsense"), None);
}

#[test]
fn default_policy_is_replace() {
    assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::Replace);
}

#[test]
fn all_commands_falls_back_to_visible_registered_commands() {
    let mut m = Maestro::new(DuplicatePolicy::Replace);
    m.registry.register(CommandSettings::new("build")).unwrap();
    let mut hidden = CommandSettings::new("internal");
    hidden.hidden = true;
    m.registry.register(hidden).unwrap();

    assert_eq!(m.all_commands(), vec!["build".to_string()]);
}

#[test]
fn all_commands_prefers_explicit_all_list() {
    let mut m = Maestro::new(DuplicatePolicy::Replace);
    m.meta.all = vec!["b".into(), "a".into()];
    m.registry.register(CommandSettings::new("a")).unwrap();
    m.registry.register(CommandSettings::new("b")).unwrap();

    assert_eq!(m.all_commands(), vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn default_command_reads_meta_default() {
    let mut m = Maestro::new(DuplicatePolicy::Replace);
    assert_eq!(m.default_command(), None);
    m.meta.default = Some("build".into());
    assert_eq!(m.default_command(), Some("build"));
}
