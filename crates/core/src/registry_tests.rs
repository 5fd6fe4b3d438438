// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::maestro::DuplicatePolicy;

fn cmd(name: &str) -> CommandSettings {
    CommandSettings::new(name)
}

#[test]
fn register_then_lookup_by_name() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    reg.register(cmd("build")).unwrap();
    assert_eq!(reg.lookup("build").unwrap().name, "build");
}

#[test]
fn lookup_by_alias() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    let mut c = cmd("build");
    c.aliases = vec!["b".into()];
    reg.register(c).unwrap();
    assert_eq!(reg.lookup("b").unwrap().name, "build");
}

#[test]
fn not_found_includes_suggestions() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    reg.register(cmd("build")).unwrap();
    let err = reg.lookup("buidl").unwrap_err();
    match err {
        RegistryError::NotFound { name, suggestions } => {
            assert_eq!(name, "buidl");
            assert_eq!(suggestions, vec!["build".to_string()]);
        }
        _ => panic!("expected NotFound"),
    }
}

#[test]
fn override_hosts_replaces_a_commands_host_list_by_name() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    let mut c = cmd("deploy");
    c.hosts = vec!["old.example.com".into()];
    reg.register(c).unwrap();

    reg.override_hosts("deploy", vec!["new-a".into(), "new-b".into()]).unwrap();

    assert_eq!(reg.lookup("deploy").unwrap().hosts, vec!["new-a", "new-b"]);
}

#[test]
fn override_hosts_resolves_through_an_alias() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    let mut c = cmd("deploy");
    c.aliases = vec!["d".into()];
    reg.register(c).unwrap();

    reg.override_hosts("d", vec!["replacement".into()]).unwrap();

    assert_eq!(reg.lookup("deploy").unwrap().hosts, vec!["replacement"]);
}

#[test]
fn override_hosts_on_an_unknown_name_is_not_found() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    let err = reg.override_hosts("nonexistent", vec!["x".into()]).unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[test]
fn duplicate_under_error_policy_is_rejected_and_original_kept() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    reg.register(cmd("build")).unwrap();
    let err = reg.register(cmd("build")).unwrap_err();
    assert!(matches!(err, RegistryError::Duplicate { .. }));
    assert_eq!(reg.len(), 1);
}

#[test]
fn duplicate_under_replace_policy_overwrites() {
    let mut reg = Registry::new(DuplicatePolicy::Replace);
    let mut first = cmd("build");
    first.short = "first".into();
    reg.register(first).unwrap();

    let mut second = cmd("build");
    second.short = "second".into();
    reg.register(second).unwrap();

    assert_eq!(reg.lookup("build").unwrap().short, "second");
    assert_eq!(reg.len(), 1);
}

#[test]
fn duplicate_under_append_policy_merges_deps_and_script() {
    let mut reg = Registry::new(DuplicatePolicy::Append);
    let mut first = cmd("build");
    first.script.push(CommandScript::plain("echo one"));
    first.deps.push(Dep::new("clean"));
    reg.register(first).unwrap();

    let mut second = cmd("build");
    second.script.push(CommandScript::plain("echo two"));
    second.deps.push(Dep::new("lint"));
    reg.register(second).unwrap();

    let merged = reg.lookup("build").unwrap();
    assert_eq!(merged.script.len(), 2);
    assert_eq!(merged.script[0].line, "echo one");
    assert_eq!(merged.script[1].line, "echo two");
    assert_eq!(merged.deps.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(), vec!["clean", "lint"]);
}

#[test]
fn merge_append_overrides_same_named_option_and_keeps_others() {
    let mut first = cmd("build");
    first.options.push(CommandOption {
        short: Some('v'),
        long: Some("verbose".into()),
        help: "old".into(),
        default: None,
        flag: true,
        validator: None,
    });

    let mut next = cmd("build");
    next.options.push(CommandOption {
        short: Some('v'),
        long: Some("verbose".into()),
        help: "new".into(),
        default: None,
        flag: true,
        validator: None,
    });
    next.options.push(CommandOption {
        short: None,
        long: Some("force".into()),
        help: "force it".into(),
        default: None,
        flag: true,
        validator: None,
    });

    first.merge_append(next);
    assert_eq!(first.options.len(), 2);
    assert_eq!(first.options[0].help, "new");
    assert_eq!(first.options[1].help, "force it");
}

#[test]
fn conflicting_alias_on_different_command_is_rejected() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    let mut a = cmd("build");
    a.aliases = vec!["b".into()];
    reg.register(a).unwrap();

    let mut c = cmd("browse");
    c.aliases = vec!["b".into()];
    let err = reg.register(c).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateAlias { .. }));
}

#[test]
fn visible_excludes_hidden_commands() {
    let mut reg = Registry::new(DuplicatePolicy::Error);
    reg.register(cmd("build")).unwrap();
    let mut hidden = cmd("internal");
    hidden.hidden = true;
    reg.register(hidden).unwrap();

    let names: Vec<&str> = reg.visible().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["build"]);
}
