// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-stage expansion pipeline over one logical script line (§4.3): parse
//! into a small expression tree, then expand each node against an
//! environment into a list of strings. Concatenation of two multi-valued
//! nodes takes their cartesian product, same as classic brace expansion.

use mst_core::Environment;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error("undefined variable {0:?}")]
    UndefinedVariable(String),
    #[error("parameter operation on {name:?} needs exactly one value, got {count}")]
    TooManyValues { name: String, count: usize },
    #[error("invalid expansion syntax: {0}")]
    ExpandSyntax(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(String),
    Variable(String),
    Quoted { double: bool, inner: Box<Node> },
    Brace {
        pre: String,
        list: Vec<Node>,
        post: String,
    },
    Length(String),
    SubstrPrefix { name: String, pattern: String, longest: bool },
    SubstrSuffix { name: String, pattern: String, longest: bool },
    ReplaceFirst { name: String, from: String, to: String },
    ReplaceAll { name: String, from: String, to: String },
    ReplacePrefix { name: String, from: String, to: String },
    ReplaceSuffix { name: String, from: String, to: String },
    Slice { name: String, offset: i64, length: Option<i64> },
    Concat(Vec<Node>),
}

/// Splits a script line into words on unquoted whitespace, the step that
/// must run once across the whole line before [`parse`] sees any individual
/// word (§4.3): a `'...'`/`"..."` span containing spaces stays one word.
pub fn split_words(line: &str) -> Result<Vec<String>, ExpandError> {
    let chars: Vec<char> = line.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    let mut has_current = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => {
                if has_current {
                    words.push(std::mem::take(&mut current));
                    has_current = false;
                }
                i += 1;
            }
            '\'' => {
                has_current = true;
                current.push('\'');
                let (inner, next) = read_until(&chars, i + 1, '\'')?;
                current.push_str(&inner);
                current.push('\'');
                i = next;
            }
            '"' => {
                has_current = true;
                current.push('"');
                let (inner, next) = read_until(&chars, i + 1, '"')?;
                current.push_str(&inner);
                current.push('"');
                i = next;
            }
            c => {
                has_current = true;
                current.push(c);
                i += 1;
            }
        }
    }
    if has_current {
        words.push(current);
    }
    Ok(words)
}

/// Stage 1: parse one raw word (already split on unquoted whitespace by the
/// caller) into an expression tree.
pub fn parse(word: &str) -> Result<Node, ExpandError> {
    let mut nodes = Vec::new();
    let chars: Vec<char> = word.chars().collect();
    let mut i = 0;
    let mut literal = String::new();
    while i < chars.len() {
        match chars[i] {
            '\'' => {
                flush_literal(&mut nodes, &mut literal);
                let (inner, next) = read_until(&chars, i + 1, '\'')?;
                nodes.push(Node::Quoted {
                    double: false,
                    inner: Box::new(Node::Literal(inner)),
                });
                i = next;
            }
            '"' => {
                flush_literal(&mut nodes, &mut literal);
                let (inner, next) = read_until(&chars, i + 1, '"')?;
                let inner_node = parse(&inner)?;
                nodes.push(Node::Quoted {
                    double: true,
                    inner: Box::new(inner_node),
                });
                i = next;
            }
            '$' if i + 1 < chars.len() && chars[i + 1] == '{' => {
                flush_literal(&mut nodes, &mut literal);
                let (inner, next) = read_until(&chars, i + 2, '}')?;
                nodes.push(parse_param(&inner)?);
                i = next;
            }
            '$' if i + 1 < chars.len() && is_ident_start(chars[i + 1]) => {
                flush_literal(&mut nodes, &mut literal);
                let mut j = i + 1;
                while j < chars.len() && is_ident_char(chars[j]) {
                    j += 1;
                }
                nodes.push(Node::Variable(chars[i + 1..j].iter().collect()));
                i = j;
            }
            '{' => {
                flush_literal(&mut nodes, &mut literal);
                let pre = String::new();
                let (body, next) = read_matching_brace(&chars, i + 1)?;
                let parts: Result<Vec<Node>, ExpandError> = split_top_level_commas(&body)
                    .into_iter()
                    .map(|s| parse(&s))
                    .collect();
                nodes.push(Node::Brace {
                    pre,
                    list: parts?,
                    post: String::new(),
                });
                i = next;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    flush_literal(&mut nodes, &mut literal);

    Ok(match nodes.len() {
        0 => Node::Literal(String::new()),
        1 => nodes.into_iter().next().unwrap_or(Node::Literal(String::new())),
        _ => Node::Concat(nodes),
    })
}

fn flush_literal(nodes: &mut Vec<Node>, literal: &mut String) {
    if !literal.is_empty() {
        nodes.push(Node::Literal(std::mem::take(literal)));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn read_until(chars: &[char], start: usize, close: char) -> Result<(String, usize), ExpandError> {
    let mut i = start;
    let mut s = String::new();
    while i < chars.len() {
        if chars[i] == close {
            return Ok((s, i + 1));
        }
        s.push(chars[i]);
        i += 1;
    }
    Err(ExpandError::ExpandSyntax(format!("missing closing {close:?}")))
}

fn read_matching_brace(chars: &[char], start: usize) -> Result<(String, usize), ExpandError> {
    let mut depth = 1;
    let mut i = start;
    let mut s = String::new();
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((s, i + 1));
                }
            }
            _ => {}
        }
        s.push(chars[i]);
        i += 1;
    }
    Err(ExpandError::ExpandSyntax("missing closing '}'".into()))
}

fn split_top_level_commas(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0;
    let mut current = String::new();
    for c in body.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Parses the body of a `${…}` parameter expansion.
fn parse_param(body: &str) -> Result<Node, ExpandError> {
    if let Some(name) = body.strip_prefix('#') {
        return Ok(Node::Length(name.to_string()));
    }
    if let Some((name, rest)) = split_op(body, "##") {
        return Ok(Node::SubstrPrefix { name, pattern: rest, longest: true });
    }
    if let Some((name, rest)) = split_op(body, "#") {
        return Ok(Node::SubstrPrefix { name, pattern: rest, longest: false });
    }
    if let Some((name, rest)) = split_op(body, "%%") {
        return Ok(Node::SubstrSuffix { name, pattern: rest, longest: true });
    }
    if let Some((name, rest)) = split_op(body, "%") {
        return Ok(Node::SubstrSuffix { name, pattern: rest, longest: false });
    }
    if let Some((name, rest)) = split_op(body, "/#") {
        let (from, to) = split_replacement(&rest);
        return Ok(Node::ReplacePrefix { name, from, to });
    }
    if let Some((name, rest)) = split_op(body, "/%") {
        let (from, to) = split_replacement(&rest);
        return Ok(Node::ReplaceSuffix { name, from, to });
    }
    if let Some((name, rest)) = split_op(body, "//") {
        let (from, to) = split_replacement(&rest);
        return Ok(Node::ReplaceAll { name, from, to });
    }
    if let Some((name, rest)) = split_op(body, "/") {
        let (from, to) = split_replacement(&rest);
        return Ok(Node::ReplaceFirst { name, from, to });
    }
    if let Some((name, rest)) = split_op(body, ":") {
        let (offset_str, length_str) = match rest.split_once(':') {
            Some((a, b)) => (a, Some(b)),
            None => (rest.as_str(), None),
        };
        let offset = offset_str.parse().map_err(|_| ExpandError::ExpandSyntax(format!("bad offset {offset_str:?}")))?;
        let length = match length_str {
            Some(l) => Some(l.parse().map_err(|_| ExpandError::ExpandSyntax(format!("bad length {l:?}")))?),
            None => None,
        };
        return Ok(Node::Slice { name, offset, length });
    }
    Ok(Node::Variable(body.to_string()))
}

fn split_op(body: &str, op: &str) -> Option<(String, String)> {
    body.split_once(op).map(|(name, rest)| (name.to_string(), rest.to_string()))
}

fn split_replacement(rest: &str) -> (String, String) {
    match rest.split_once('/') {
        Some((from, to)) => (from.to_string(), to.to_string()),
        None => (rest.to_string(), String::new()),
    }
}

/// Stage 2: expand a parsed node against `env` into its list of values.
pub fn expand(node: &Node, env: &Environment) -> Result<Vec<String>, ExpandError> {
    match node {
        Node::Literal(s) => Ok(vec![s.clone()]),
        Node::Variable(name) => resolve_list(name, env),
        Node::Quoted { double: false, inner } => {
            let values = expand(inner, env)?;
            Ok(vec![values.join("")])
        }
        Node::Quoted { double: true, inner } => {
            let values = expand(inner, env)?;
            Ok(vec![values.join(" ")])
        }
        Node::Brace { pre, list, post } => {
            let mut out = Vec::new();
            for item in list {
                for value in expand(item, env)? {
                    out.push(format!("{pre}{value}{post}"));
                }
            }
            Ok(out)
        }
        Node::Length(name) => Ok(vec![one(name, env)?.len().to_string()]),
        Node::SubstrPrefix { name, pattern, longest } => {
            let v = one(name, env)?;
            strip_prefix_glob(&v, pattern, *longest).map(|s| vec![s])
        }
        Node::SubstrSuffix { name, pattern, longest } => {
            let v = one(name, env)?;
            strip_suffix_glob(&v, pattern, *longest).map(|s| vec![s])
        }
        Node::ReplaceFirst { name, from, to } => {
            let v = one(name, env)?;
            Ok(vec![v.replacen(from.as_str(), to, 1)])
        }
        Node::ReplaceAll { name, from, to } => {
            let v = one(name, env)?;
            Ok(vec![v.replace(from.as_str(), to)])
        }
        Node::ReplacePrefix { name, from, to } => {
            let v = one(name, env)?;
            Ok(vec![match v.strip_prefix(from.as_str()) {
                Some(rest) => format!("{to}{rest}"),
                None => v,
            }])
        }
        Node::ReplaceSuffix { name, from, to } => {
            let v = one(name, env)?;
            Ok(vec![match v.strip_suffix(from.as_str()) {
                Some(rest) => format!("{rest}{to}"),
                None => v,
            }])
        }
        Node::Slice { name, offset, length } => {
            let v = one(name, env)?;
            Ok(vec![slice_str(&v, *offset, *length)])
        }
        Node::Concat(nodes) => {
            let mut acc = vec![String::new()];
            for n in nodes {
                let values = expand(n, env)?;
                let mut next = Vec::with_capacity(acc.len() * values.len().max(1));
                for a in &acc {
                    for v in &values {
                        next.push(format!("{a}{v}"));
                    }
                }
                acc = next;
            }
            Ok(acc)
        }
    }
}

fn resolve_list(name: &str, env: &Environment) -> Result<Vec<String>, ExpandError> {
    env.resolve(name)
        .map(<[String]>::to_vec)
        .ok_or_else(|| ExpandError::UndefinedVariable(name.to_string()))
}

fn one(name: &str, env: &Environment) -> Result<String, ExpandError> {
    let values = resolve_list(name, env)?;
    if values.len() != 1 {
        return Err(ExpandError::TooManyValues {
            name: name.to_string(),
            count: values.len(),
        });
    }
    Ok(values[0].clone())
}

/// Translates a small glob pattern (`*`, `?`) into a fully-anchored regex:
/// a candidate prefix/suffix must match the pattern in its entirety, not
/// merely contain a match.
fn glob_to_regex(pattern: &str) -> Result<Regex, ExpandError> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| ExpandError::ExpandSyntax(format!("bad pattern {pattern:?}: {e}")))
}

/// Finds the prefix of `value` (ending at a char boundary) that fully
/// matches `pattern`. Among candidates, picks the shortest or longest per
/// `longest`.
fn strip_prefix_glob(value: &str, pattern: &str, longest: bool) -> Result<String, ExpandError> {
    let re = glob_to_regex(pattern)?;
    let mut best: Option<usize> = None;
    for end in 0..=value.len() {
        if !value.is_char_boundary(end) {
            continue;
        }
        if re.is_match(&value[..end]) {
            best = Some(end);
            if !longest {
                break;
            }
        }
    }
    Ok(match best {
        Some(end) => value[end..].to_string(),
        None => value.to_string(),
    })
}

/// Finds the suffix of `value` (starting at a char boundary) that fully
/// matches `pattern`. Among candidates, picks the shortest or longest per
/// `longest`.
fn strip_suffix_glob(value: &str, pattern: &str, longest: bool) -> Result<String, ExpandError> {
    let re = glob_to_regex(pattern)?;
    let mut best: Option<usize> = None;
    for start in (0..=value.len()).rev() {
        if !value.is_char_boundary(start) {
            continue;
        }
        if re.is_match(&value[start..]) {
            best = Some(start);
            if !longest {
                break;
            }
        }
    }
    Ok(match best {
        Some(start) => value[..start].to_string(),
        None => value.to_string(),
    })
}

fn slice_str(value: &str, offset: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len() as i64;
    let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
    let end = match length {
        Some(l) if l < 0 => (len + l).max(start),
        Some(l) => (start + l).min(len),
        None => len,
    };
    chars[start as usize..end as usize].iter().collect()
}

#[cfg(test)]
#[path = "expander_tests.rs"]
mod tests;
