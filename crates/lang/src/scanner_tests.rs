// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    Scanner::tokenize(src)
        .expect("scan")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn meta_assignment() {
    let got = kinds(".VERSION = '1.0'\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Meta("VERSION".into()),
            TokenKind::Eq,
            TokenKind::Str("1.0".into()),
            TokenKind::Eol,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn keyword_and_ident_distinguished() {
    let got = kinds("include alias builder\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Keyword(Keyword::Include),
            TokenKind::Keyword(Keyword::Alias),
            TokenKind::Ident("builder".into()),
            TokenKind::Eol,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn variable_forms() {
    assert_eq!(kinds("$x"), vec![TokenKind::Variable("x".into()), TokenKind::Eof]);
    assert_eq!(
        kinds("${name#wor}"),
        vec![TokenKind::Variable("name#wor".into()), TokenKind::Eof]
    );
}

#[test]
fn comment_line_is_skipped_in_default_mode() {
    let got = kinds("# a comment\nbuild\n");
    assert_eq!(
        got,
        vec![TokenKind::Eol, TokenKind::Ident("build".into()), TokenKind::Eol, TokenKind::Eof]
    );
}

#[test]
fn crlf_is_normalized() {
    let got = kinds("a\r\nb\r\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Eol,
            TokenKind::Ident("b".into()),
            TokenKind::Eol,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unterminated_single_quote_is_an_error() {
    let err = Scanner::tokenize("'unterminated").unwrap_err();
    assert!(matches!(err, ScanError::UnterminatedString { .. }));
}

#[test]
fn heredoc_reads_until_matching_tag() {
    let got = kinds("<<EOF\nline one\nline two\nEOF\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Heredoc {
                tag: "EOF".into(),
                body: "line one\nline two\n".into(),
            },
            TokenKind::Eof,
        ]
    );
}

#[test]
fn template_interleaves_literal_and_variable_fragments() {
    let got = kinds("\"hello $name!\"");
    assert_eq!(
        got,
        vec![
            TokenKind::TemplateStart,
            TokenKind::TemplateLiteral("hello ".into()),
            TokenKind::TemplateVar("name".into()),
            TokenKind::TemplateLiteral("!".into()),
            TokenKind::TemplateEnd,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn script_mode_splices_backslash_continuations() {
    let got = kinds("build { echo a \\\n  echo b\n}\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident("build".into()),
            TokenKind::LBrace,
            TokenKind::ScriptLine("echo a   echo b".into()),
            TokenKind::RBrace,
            TokenKind::Eol,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn script_mode_passes_through_nested_macro_braces_as_lines() {
    let got = kinds("build {\n.sequence {\necho a\necho b\n}\n}\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident("build".into()),
            TokenKind::LBrace,
            TokenKind::ScriptLine(".sequence {".into()),
            TokenKind::ScriptLine("echo a".into()),
            TokenKind::ScriptLine("echo b".into()),
            TokenKind::ScriptLine("}".into()),
            TokenKind::RBrace,
            TokenKind::Eol,
            TokenKind::Eof,
        ]
    );
}
