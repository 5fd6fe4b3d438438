// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use mst_lang::Decoder;
use std::io::Write;

#[test]
fn decodes_a_realistic_maestro_file_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(
        file,
        r#"
.VERSION = '2.0.0'
.DEFAULT = build
.ALL = (fetch build test)
.BEFORE = announce

announce: {{
  echo starting
}}

fetch: {{
  echo fetching
}}

build: fetch {{
  echo building
}}

test: build {{
  -! echo testing
}}
"#
    )
    .expect("write");

    let maestro = Decoder::decode_file(file.path(), Vec::new()).expect("decode");

    assert_eq!(maestro.meta.version.as_deref(), Some("2.0.0"));
    assert_eq!(maestro.meta.default.as_deref(), Some("build"));
    assert_eq!(maestro.meta.all, vec!["fetch", "build", "test"]);
    assert_eq!(maestro.hooks.before.as_deref(), Some("announce"));

    let build = maestro.registry.lookup("build").expect("lookup build");
    assert_eq!(build.deps.len(), 1);
    assert_eq!(build.deps[0].name, "fetch");

    let test = maestro.registry.lookup("test").expect("lookup test");
    assert!(test.script[0].modifiers.ignore_exit);
    assert!(test.script[0].modifiers.invert_exit);
}

#[test]
fn undefined_variable_reference_is_a_decode_error() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(file, ".USAGE = $nope\n").expect("write");

    let err = Decoder::decode_file(file.path(), Vec::new()).unwrap_err();
    assert!(matches!(err, mst_lang::DecodeError::UndefinedVariable { .. }));
}
