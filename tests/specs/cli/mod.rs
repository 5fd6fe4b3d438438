// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use assert_cmd::Command;
use std::io::Write;

fn maestro_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(file, "{contents}").expect("write");
    file
}

#[test]
fn running_a_command_writes_its_prefixed_output_and_exits_zero() {
    let file = maestro_file("hello: {\n  echo hi\n}\n");
    Command::cargo_bin("mst")
        .expect("binary")
        .args(["-f", file.path().to_str().expect("utf8 path"), "hello"])
        .assert()
        .success()
        .stdout("[hello] hi\n");
}

#[test]
fn an_unknown_command_exits_122() {
    let file = maestro_file("hello: {\n  echo hi\n}\n");
    Command::cargo_bin("mst")
        .expect("binary")
        .args(["-f", file.path().to_str().expect("utf8 path"), "nonexistent"])
        .assert()
        .code(122);
}

#[test]
fn a_missing_file_exits_123() {
    Command::cargo_bin("mst")
        .expect("binary")
        .args(["-f", "/no/such/maestro.mf", "version"])
        .assert()
        .code(123);
}

#[test]
fn cat_renders_the_decoded_registry() {
    let file = maestro_file(".VERSION = '9.9.9'\nbuild: {\n  echo ok\n}\n");
    let output = Command::cargo_bin("mst")
        .expect("binary")
        .args(["-f", file.path().to_str().expect("utf8 path"), "cat"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("version: 9.9.9"));
}
