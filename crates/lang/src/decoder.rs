// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent consumer of the token stream (§4.2). Builds a
//! `Maestro` aggregate: metadata, exec hooks, remote/HTTP config, the
//! command registry, and the root locals environment.

use crate::scanner::{ScanError, Scanner};
use crate::token::{Keyword, Position, Token, TokenKind};
use mst_core::{
    fingerprint, CommandOption, CommandScript, CommandSettings, Dep, Environment, ErrorMode,
    Fingerprint, Maestro, PositionalArg, RegistryError, ScriptModifiers, Validator,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Scan(#[from] ScanError),
    #[error("unexpected token {token:?} at line {line}, column {column}")]
    UnexpectedToken {
        token: String,
        line: usize,
        column: usize,
    },
    #[error("undefined variable {name:?} referenced at line {line}")]
    UndefinedVariable { name: String, line: usize },
    #[error("{0}")]
    Registry(#[from] RegistryError),
    #[error("include cycle detected: {path}")]
    IncludeCycle { path: String },
    #[error("include target not found: {path}")]
    IncludeNotFound { path: String },
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown meta property .{name}")]
    UnknownMeta { name: String },
}

/// A value on the right-hand side of an assignment, meta property, or
/// command property, before variable resolution.
#[derive(Debug, Clone)]
enum RawValue {
    Literal(String),
    Variable(String),
    /// A double-quoted template: literal fragments interleaved with
    /// variable references, concatenated once each is resolved.
    Template(Vec<TemplatePart>),
}

#[derive(Debug, Clone)]
enum TemplatePart {
    Literal(String),
    Var(String),
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_pos(&self) -> Position {
        self.tokens
            .get(self.pos)
            .map(|t| t.pos)
            .unwrap_or(Position { line: 0, column: 0 })
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens.get(self.pos).map(|t| t.kind.clone()).unwrap_or(TokenKind::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn skip_eol(&mut self) {
        while matches!(self.peek(), TokenKind::Eol) {
            self.advance();
        }
    }

    fn unexpected(&self, context: &str) -> DecodeError {
        let pos = self.peek_pos();
        DecodeError::UnexpectedToken {
            token: format!("{:?} ({context})", self.peek()),
            line: pos.line,
            column: pos.column,
        }
    }
}

pub struct Decoder {
    include_paths: Vec<PathBuf>,
    /// Fingerprints of files on the current include path, used for cycle
    /// detection; a file is removed once its `include` has fully returned,
    /// so the same file may be included from two independent branches.
    in_progress: HashSet<Fingerprint>,
    maestro: Maestro,
    pending_aliases: Vec<(String, String)>,
}

impl Decoder {
    /// Decode the file at `path`, searching `include_paths` (in order, then
    /// the file's own directory) for any `include` directives it contains.
    pub fn decode_file(path: &Path, include_paths: Vec<PathBuf>) -> Result<Maestro, DecodeError> {
        let source = std::fs::read_to_string(path).map_err(|source| DecodeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut decoder = Decoder {
            include_paths,
            in_progress: HashSet::new(),
            maestro: Maestro::default(),
            pending_aliases: Vec::new(),
        };
        decoder.in_progress.insert(fingerprint(&source));
        let mut root_env = Environment::new();
        decoder.decode_into(&source, &dir, &mut root_env)?;
        decoder.maestro.locals = root_env;
        decoder.apply_pending_aliases()?;
        Ok(decoder.maestro)
    }

    fn apply_pending_aliases(&mut self) -> Result<(), DecodeError> {
        for (alias, target) in std::mem::take(&mut self.pending_aliases) {
            self.maestro.registry.bind_alias(alias, &target)?;
        }
        Ok(())
    }

    fn decode_into(
        &mut self,
        source: &str,
        current_dir: &Path,
        env: &mut Environment,
    ) -> Result<(), DecodeError> {
        let tokens = Scanner::tokenize(source)?;
        let mut stream = TokenStream::new(tokens);
        stream.skip_eol();
        while !matches!(stream.peek(), TokenKind::Eof) {
            self.decode_element(&mut stream, current_dir, env)?;
            stream.skip_eol();
        }
        Ok(())
    }

    fn decode_element(
        &mut self,
        stream: &mut TokenStream,
        current_dir: &Path,
        env: &mut Environment,
    ) -> Result<(), DecodeError> {
        match stream.peek().clone() {
            TokenKind::Meta(name) => {
                stream.advance();
                self.decode_meta(&name, stream, env)
            }
            TokenKind::Keyword(kw) => {
                stream.advance();
                self.decode_directive(kw, stream, current_dir, env)
            }
            TokenKind::Percent => {
                stream.advance();
                self.decode_command(stream, env, true)
            }
            TokenKind::Ident(name) => {
                // Lookahead distinguishes `ident = rhs` (variable
                // assignment) from a command definition, which may start
                // with `(`, `:`, `{`, or simply end the element.
                if matches!(stream.tokens.get(stream.pos + 1).map(|t| &t.kind), Some(TokenKind::Eq) | Some(TokenKind::PlusEq))
                {
                    stream.advance();
                    self.decode_var_assignment(&name, stream, env)
                } else {
                    self.decode_command(stream, env, false)
                }
            }
            _ => Err(stream.unexpected("top-level element")),
        }
    }

    fn decode_meta(
        &mut self,
        name: &str,
        stream: &mut TokenStream,
        env: &Environment,
    ) -> Result<(), DecodeError> {
        expect_eq(stream)?;
        let values = self.read_rhs_list(stream, env)?;
        let scalar = values.first().cloned().unwrap_or_default();
        let meta = &mut self.maestro.meta;
        match name {
            "AUTHOR" => meta.author = Some(scalar),
            "EMAIL" => meta.email = Some(scalar),
            "VERSION" => meta.version = Some(scalar),
            "USAGE" => meta.usage = Some(scalar),
            "HELP" => meta.help = Some(scalar),
            "DUPLICATE" => {
                if let Some(policy) = mst_core::DuplicatePolicy::parse(&scalar) {
                    self.maestro.duplicate_policy = policy;
                    let mut rebuilt = mst_core::Registry::new(policy);
                    for cmd in self.maestro.registry.iter().cloned() {
                        rebuilt.register(cmd)?;
                    }
                    self.maestro.registry = rebuilt;
                }
            }
            "TRACE" => meta.trace = scalar == "true",
            "WORKDIR" => meta.workdir = Some(scalar),
            "ALL" => meta.all = values,
            "DEFAULT" => meta.default = Some(scalar),
            "BEFORE" => self.maestro.hooks.before = Some(scalar),
            "AFTER" => self.maestro.hooks.after = Some(scalar),
            "ERROR" => self.maestro.hooks.error = Some(scalar),
            "SUCCESS" => self.maestro.hooks.success = Some(scalar),
            "SSH_USER" => self.maestro.remote.ssh_user = Some(scalar),
            "SSH_PASSWORD" => self.maestro.remote.ssh_password = Some(scalar),
            "SSH_PUBKEY" => self.maestro.remote.ssh_pubkey = Some(scalar),
            "SSH_KNOWN_HOSTS" => self.maestro.remote.ssh_known_hosts = Some(scalar),
            "SSH_PARALLEL" => self.maestro.remote.ssh_parallel = scalar.parse().ok(),
            "HTTP_CERT_FILE" => self.maestro.web.http_cert_file = Some(scalar),
            "HTTP_CERT_KEY" => self.maestro.web.http_cert_key = Some(scalar),
            other => return Err(DecodeError::UnknownMeta { name: other.to_string() }),
        }
        Ok(())
    }

    fn decode_var_assignment(
        &mut self,
        name: &str,
        stream: &mut TokenStream,
        env: &mut Environment,
    ) -> Result<(), DecodeError> {
        let append = matches!(stream.peek(), TokenKind::PlusEq);
        stream.advance();
        let values = self.read_rhs_list(stream, env)?;
        if append {
            env.append(name, values);
        } else {
            env.define(name, values);
        }
        Ok(())
    }

    fn decode_directive(
        &mut self,
        kw: Keyword,
        stream: &mut TokenStream,
        current_dir: &Path,
        env: &mut Environment,
    ) -> Result<(), DecodeError> {
        match kw {
            Keyword::Include => self.decode_include(stream, current_dir),
            Keyword::Export => {
                // `export IDENT=VALUE…`: define IDENT in the current scope,
                // the same as a plain assignment; visibility to subprocess
                // environments is handled by the registry at `Prepare` time.
                let name = self.read_ident(stream)?;
                expect_eq(stream)?;
                let values = self.read_rhs_list(stream, env)?;
                env.define(name, values);
                Ok(())
            }
            Keyword::Alias => {
                let alias = self.read_ident(stream)?;
                expect_eq(stream)?;
                let target = self.read_ident(stream)?;
                self.pending_aliases.push((alias, target));
                Ok(())
            }
            Keyword::Delete => {
                while let TokenKind::Ident(name) = stream.peek().clone() {
                    stream.advance();
                    env.unset(&name);
                }
                Ok(())
            }
        }
    }

    fn decode_include(&mut self, stream: &mut TokenStream, current_dir: &Path) -> Result<(), DecodeError> {
        let mut targets = Vec::new();
        if matches!(stream.peek(), TokenKind::LParen) {
            stream.advance();
            loop {
                targets.push(self.read_include_target(stream)?);
                match stream.peek() {
                    TokenKind::Comma => {
                        stream.advance();
                    }
                    _ => break,
                }
            }
            expect_token(stream, &TokenKind::RParen, "include list")?;
        } else {
            targets.push(self.read_include_target(stream)?);
        }

        for (name, optional) in targets {
            self.include_one(&name, optional, current_dir)?;
        }
        Ok(())
    }

    fn read_include_target(&self, stream: &mut TokenStream) -> Result<(String, bool), DecodeError> {
        let name = match stream.advance() {
            TokenKind::Str(s) | TokenKind::Ident(s) => s,
            other => {
                return Err(DecodeError::UnexpectedToken {
                    token: format!("{other:?}"),
                    line: stream.peek_pos().line,
                    column: stream.peek_pos().column,
                })
            }
        };
        let optional = if matches!(stream.peek(), TokenKind::Bang) {
            stream.advance();
            true
        } else {
            false
        };
        Ok((name, optional))
    }

    fn include_one(&mut self, name: &str, optional: bool, current_dir: &Path) -> Result<(), DecodeError> {
        let resolved = self.resolve_include_path(name, current_dir);
        let path = match resolved {
            Some(path) => path,
            None if optional => return Ok(()),
            None => {
                return Err(DecodeError::IncludeNotFound {
                    path: name.to_string(),
                })
            }
        };
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(_) if optional => return Ok(()),
            Err(source) => {
                return Err(DecodeError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let fp = fingerprint(&source);
        if !self.in_progress.insert(fp) {
            return Err(DecodeError::IncludeCycle {
                path: path.display().to_string(),
            });
        }
        debug!(path = %path.display(), "including maestro file");
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut child_env = Environment::new();
        // The child frame is dropped here: its locals never become visible
        // to the including file, but any commands it registered already
        // live in the shared registry.
        let result = self.decode_into(&source, &dir, &mut child_env);
        self.in_progress.remove(&fp);
        result
    }

    fn resolve_include_path(&self, name: &str, current_dir: &Path) -> Option<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_absolute() && direct.is_file() {
            return Some(direct);
        }
        for base in self.include_paths.iter().chain(std::iter::once(&current_dir.to_path_buf())) {
            let candidate = base.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn decode_command(
        &mut self,
        stream: &mut TokenStream,
        env: &Environment,
        hidden: bool,
    ) -> Result<(), DecodeError> {
        let name = self.read_ident(stream)?;
        let mut cmd = CommandSettings::new(&name);
        cmd.hidden = hidden;
        cmd.locals = env.copy();

        if matches!(stream.peek(), TokenKind::LParen) {
            stream.advance();
            self.decode_props(stream, &mut cmd, env)?;
            expect_token(stream, &TokenKind::RParen, "command properties")?;
        }

        if matches!(stream.peek(), TokenKind::Colon) {
            stream.advance();
            self.decode_deps(stream, &mut cmd)?;
        }

        if matches!(stream.peek(), TokenKind::LBrace) {
            stream.advance();
            self.decode_script_body(stream, &mut cmd)?;
        }

        self.maestro.registry.register(cmd)?;
        Ok(())
    }

    fn decode_props(
        &mut self,
        stream: &mut TokenStream,
        cmd: &mut CommandSettings,
        env: &Environment,
    ) -> Result<(), DecodeError> {
        loop {
            if matches!(stream.peek(), TokenKind::RParen) {
                break;
            }
            let key = self.read_ident(stream)?;
            expect_eq(stream)?;
            match key.as_str() {
                "options" => cmd.options = self.decode_option_list(stream)?,
                "args" => cmd.args = self.decode_arg_list(stream)?,
                _ => {
                    let values = self.read_rhs_list(stream, env)?;
                    self.apply_scalar_prop(cmd, &key, values)?;
                }
            }
            if matches!(stream.peek(), TokenKind::Comma) {
                stream.advance();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn apply_scalar_prop(
        &self,
        cmd: &mut CommandSettings,
        key: &str,
        values: Vec<String>,
    ) -> Result<(), DecodeError> {
        let scalar = values.first().cloned().unwrap_or_default();
        match key {
            "short" => cmd.short = scalar,
            "help" => cmd.help = scalar,
            "tag" => cmd.tags = values,
            "alias" => cmd.aliases = values,
            "workdir" => cmd.workdir = Some(scalar),
            "retry" => cmd.retry = scalar.parse().unwrap_or(0),
            "timeout" => cmd.timeout_secs = scalar.parse().ok(),
            "error" => {
                cmd.error_mode = if scalar == "ignore" {
                    ErrorMode::Ignore
                } else {
                    ErrorMode::Propagate
                }
            }
            "user" => cmd.user = Some(scalar),
            "group" => cmd.group = Some(scalar),
            "hosts" => cmd.hosts = values,
            _ => {}
        }
        Ok(())
    }

    /// `options = ( (short=v, long=v, …), … )`.
    fn decode_option_list(&mut self, stream: &mut TokenStream) -> Result<Vec<CommandOption>, DecodeError> {
        expect_token(stream, &TokenKind::LParen, "options list")?;
        let mut options = Vec::new();
        while matches!(stream.peek(), TokenKind::LParen) {
            stream.advance();
            let fields = self.decode_field_group(stream)?;
            expect_token(stream, &TokenKind::RParen, "option descriptor")?;
            options.push(option_from_fields(fields));
            if matches!(stream.peek(), TokenKind::Comma) {
                stream.advance();
            }
        }
        expect_token(stream, &TokenKind::RParen, "options list")?;
        Ok(options)
    }

    fn decode_arg_list(&mut self, stream: &mut TokenStream) -> Result<Vec<PositionalArg>, DecodeError> {
        expect_token(stream, &TokenKind::LParen, "args list")?;
        let mut args = Vec::new();
        while matches!(stream.peek(), TokenKind::LParen) {
            stream.advance();
            let fields = self.decode_field_group(stream)?;
            expect_token(stream, &TokenKind::RParen, "arg descriptor")?;
            args.push(arg_from_fields(fields));
            if matches!(stream.peek(), TokenKind::Comma) {
                stream.advance();
            }
        }
        expect_token(stream, &TokenKind::RParen, "args list")?;
        Ok(args)
    }

    /// Reads `ident = value (, ident = value)*` up to (not consuming) the
    /// closing `)`, without resolving variables — descriptor fields are
    /// plain literals.
    fn decode_field_group(&mut self, stream: &mut TokenStream) -> Result<Vec<(String, String)>, DecodeError> {
        let mut fields = Vec::new();
        loop {
            if matches!(stream.peek(), TokenKind::RParen) {
                break;
            }
            let key = self.read_ident(stream)?;
            expect_eq(stream)?;
            let value = match stream.advance() {
                TokenKind::Str(s) | TokenKind::Ident(s) => s,
                TokenKind::Int(n) => n.to_string(),
                TokenKind::Bool(b) => b.to_string(),
                other => {
                    return Err(DecodeError::UnexpectedToken {
                        token: format!("{other:?}"),
                        line: stream.peek_pos().line,
                        column: stream.peek_pos().column,
                    })
                }
            };
            fields.push((key, value));
            if matches!(stream.peek(), TokenKind::Comma) {
                stream.advance();
            } else {
                break;
            }
        }
        Ok(fields)
    }

    fn decode_deps(&mut self, stream: &mut TokenStream, cmd: &mut CommandSettings) -> Result<(), DecodeError> {
        loop {
            if matches!(stream.peek(), TokenKind::LBrace | TokenKind::Eol | TokenKind::Eof) {
                break;
            }
            let optional = if matches!(stream.peek(), TokenKind::Bang) {
                stream.advance();
                true
            } else {
                false
            };
            let name = self.read_ident(stream)?;
            let mut dep = Dep::new(name);
            dep.optional = optional;
            if matches!(stream.peek(), TokenKind::LParen) {
                stream.advance();
                while !matches!(stream.peek(), TokenKind::RParen) {
                    match stream.advance() {
                        TokenKind::Str(s) | TokenKind::Ident(s) => dep.args.push(s),
                        TokenKind::Int(n) => dep.args.push(n.to_string()),
                        TokenKind::Comma => {}
                        other => {
                            return Err(DecodeError::UnexpectedToken {
                                token: format!("{other:?}"),
                                line: stream.peek_pos().line,
                                column: stream.peek_pos().column,
                            })
                        }
                    }
                }
                expect_token(stream, &TokenKind::RParen, "dependency arguments")?;
            }
            if matches!(stream.peek(), TokenKind::Amp) {
                stream.advance();
                dep.background = true;
            }
            cmd.deps.push(dep);
            if matches!(stream.peek(), TokenKind::Comma) {
                stream.advance();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn decode_script_body(&mut self, stream: &mut TokenStream, cmd: &mut CommandSettings) -> Result<(), DecodeError> {
        let mut raw_lines = Vec::new();
        loop {
            match stream.advance() {
                TokenKind::ScriptLine(line) => raw_lines.push(line),
                TokenKind::RBrace => break,
                other => {
                    return Err(DecodeError::UnexpectedToken {
                        token: format!("{other:?}"),
                        line: stream.peek_pos().line,
                        column: stream.peek_pos().column,
                    })
                }
            }
        }

        let mut idx = 0;
        let mut description = String::new();
        while idx < raw_lines.len() && raw_lines[idx].trim_start().starts_with('#') {
            let comment = raw_lines[idx].trim_start().trim_start_matches('#').trim();
            if comment.is_empty() {
                description.push_str("\n\n");
            } else {
                if !description.is_empty() && !description.ends_with("\n\n") {
                    description.push(' ');
                }
                description.push_str(comment);
            }
            idx += 1;
        }
        if !description.is_empty() && cmd.help.is_empty() {
            cmd.help = description.trim().to_string();
        }

        while idx < raw_lines.len() {
            let trimmed = raw_lines[idx].trim();
            if trimmed.starts_with(".sequence") && trimmed.ends_with('{') {
                let (end, body) = collect_macro_body(&raw_lines, idx);
                let joined = body.iter().map(|l| l.trim()).collect::<Vec<_>>().join("; ");
                cmd.script.push(CommandScript::plain(joined));
                idx = end + 1;
            } else if trimmed.starts_with(".repeat") && trimmed.ends_with('{') {
                let values = parse_repeat_values(trimmed);
                let (end, body) = collect_macro_body(&raw_lines, idx);
                for (i, value) in values.iter().enumerate() {
                    for line in &body {
                        let substituted = line
                            .replace("<var>", value)
                            .replace("<iter0>", &i.to_string())
                            .replace("<iter>", &(i + 1).to_string());
                        cmd.script.push(parse_script_line(&substituted));
                    }
                }
                idx = end + 1;
            } else {
                cmd.script.push(parse_script_line(&raw_lines[idx]));
                idx += 1;
            }
        }
        Ok(())
    }

    fn read_ident(&self, stream: &mut TokenStream) -> Result<String, DecodeError> {
        match stream.advance() {
            TokenKind::Ident(s) => Ok(s),
            other => Err(DecodeError::UnexpectedToken {
                token: format!("{other:?}"),
                line: stream.peek_pos().line,
                column: stream.peek_pos().column,
            }),
        }
    }

    /// Reads a space-separated run of values (a `rhs`) and resolves each
    /// immediately against `env`, raising `UndefinedVariable` for an unknown
    /// reference (full algebraic expansion is the expander's job, at script
    /// execution time; decode-time resolution only needs flat strings).
    fn read_rhs_list(&self, stream: &mut TokenStream, env: &Environment) -> Result<Vec<String>, DecodeError> {
        let mut values = Vec::new();
        loop {
            let raw = match stream.peek().clone() {
                TokenKind::Str(s) => {
                    stream.advance();
                    RawValue::Literal(s)
                }
                TokenKind::Ident(s) => {
                    stream.advance();
                    RawValue::Literal(s)
                }
                TokenKind::Int(n) => {
                    stream.advance();
                    RawValue::Literal(n.to_string())
                }
                TokenKind::Bool(b) => {
                    stream.advance();
                    RawValue::Literal(b.to_string())
                }
                TokenKind::Variable(name) => {
                    stream.advance();
                    RawValue::Variable(name)
                }
                TokenKind::Heredoc { body, .. } => {
                    stream.advance();
                    RawValue::Literal(body)
                }
                TokenKind::TemplateStart => RawValue::Template(self.read_template(stream)?),
                _ => break,
            };
            values.push(self.resolve_raw(&raw, env, stream.peek_pos().line)?);
        }
        Ok(values)
    }

    fn read_template(&self, stream: &mut TokenStream) -> Result<Vec<TemplatePart>, DecodeError> {
        stream.advance();
        let mut parts = Vec::new();
        loop {
            match stream.advance() {
                TokenKind::TemplateLiteral(s) => parts.push(TemplatePart::Literal(s)),
                TokenKind::TemplateVar(name) => parts.push(TemplatePart::Var(name)),
                TokenKind::TemplateEnd => break,
                other => {
                    return Err(DecodeError::UnexpectedToken {
                        token: format!("{other:?}"),
                        line: stream.peek_pos().line,
                        column: stream.peek_pos().column,
                    })
                }
            }
        }
        Ok(parts)
    }

    fn resolve_raw(&self, raw: &RawValue, env: &Environment, line: usize) -> Result<String, DecodeError> {
        match raw {
            RawValue::Literal(s) => Ok(s.clone()),
            RawValue::Variable(name) => env
                .resolve_scalar(name)
                .ok_or_else(|| DecodeError::UndefinedVariable {
                    name: name.clone(),
                    line,
                }),
            RawValue::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(s) => out.push_str(s),
                        TemplatePart::Var(name) => {
                            let value = env.resolve_scalar(name).ok_or_else(|| DecodeError::UndefinedVariable {
                                name: name.clone(),
                                line,
                            })?;
                            out.push_str(&value);
                        }
                    }
                }
                Ok(out)
            }
        }
    }
}

fn expect_eq(stream: &mut TokenStream) -> Result<(), DecodeError> {
    expect_token(stream, &TokenKind::Eq, "'='")
}

fn expect_token(stream: &mut TokenStream, expected: &TokenKind, context: &str) -> Result<(), DecodeError> {
    if std::mem::discriminant(stream.peek()) == std::mem::discriminant(expected) {
        stream.advance();
        Ok(())
    } else {
        Err(stream.unexpected(context))
    }
}

fn option_from_fields(fields: Vec<(String, String)>) -> CommandOption {
    let mut opt = CommandOption::default();
    for (key, value) in fields {
        match key.as_str() {
            "short" => opt.short = value.chars().next(),
            "long" => opt.long = Some(value),
            "help" => opt.help = value,
            "default" => opt.default = Some(value),
            "flag" => opt.flag = value == "true",
            "check" => opt.validator = parse_validator(&value),
            _ => {}
        }
    }
    opt
}

fn arg_from_fields(fields: Vec<(String, String)>) -> PositionalArg {
    let mut arg = PositionalArg::default();
    for (key, value) in fields {
        match key.as_str() {
            "name" => arg.name = value,
            "help" => arg.help = value,
            "check" => arg.validator = parse_validator(&value),
            _ => {}
        }
    }
    arg
}

/// `check` values are a bare validator name with an optional single
/// argument (e.g. `"int"`, `"gt:3"`, `"match:^v[0-9]+$"`), composable with
/// `all(...)`/`some(...)`/`not(...)`, whose children are `;`-separated
/// (not `,`, which `oneof`/`noneof` already use for their own argument
/// list) and may themselves be composed, e.g. `all(int;not(eq:0))`.
fn parse_validator(spec: &str) -> Option<Validator> {
    let spec = spec.trim();
    if let Some(inner) = strip_call(spec, "all") {
        return Some(Validator::All(parse_validator_list(inner)?));
    }
    if let Some(inner) = strip_call(spec, "some") {
        return Some(Validator::Some(parse_validator_list(inner)?));
    }
    if let Some(inner) = strip_call(spec, "not") {
        return Some(Validator::Not(Box::new(parse_validator(inner.trim())?)));
    }
    parse_leaf_validator(spec)
}

/// Strips an exact `name(...)` wrapper, returning the unparsed inside.
fn strip_call<'a>(spec: &'a str, name: &str) -> Option<&'a str> {
    spec.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')
}

fn parse_validator_list(inner: &str) -> Option<Vec<Validator>> {
    split_top_level(inner, ';').into_iter().map(|part| parse_validator(part.trim())).collect()
}

/// Splits on `sep` at paren-depth 0 only, so nested `all(...)`/`some(...)`/
/// `not(...)` children keep their own separators intact.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_leaf_validator(spec: &str) -> Option<Validator> {
    let (kind, arg) = spec.split_once(':').unwrap_or((spec, ""));
    Some(match kind {
        "notempty" => Validator::NotEmpty,
        "int" => Validator::Int,
        "float" => Validator::Float,
        "url" => Validator::Url,
        "ip" => Validator::Ip,
        "ipport" => Validator::IpPort,
        "exists" => Validator::Exists,
        "file" => Validator::File,
        "dir" => Validator::Dir,
        "readable" => Validator::Readable,
        "writable" => Validator::Writable,
        "executable" => Validator::Executable,
        "match" => Validator::Match(arg.to_string()),
        "eq" => Validator::Eq(arg.to_string()),
        "ne" => Validator::Ne(arg.to_string()),
        "gt" => Validator::Gt(arg.to_string()),
        "ge" => Validator::Ge(arg.to_string()),
        "lt" => Validator::Lt(arg.to_string()),
        "le" => Validator::Le(arg.to_string()),
        "oneof" => Validator::OneOf(arg.split(',').map(str::to_string).collect()),
        "noneof" => Validator::NoneOf(arg.split(',').map(str::to_string).collect()),
        _ => return None,
    })
}

fn parse_repeat_values(header: &str) -> Vec<String> {
    header
        .trim_start_matches(".repeat")
        .trim()
        .trim_start_matches('(')
        .split(')')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Finds the matching `}` for a macro header at `raw_lines[start]`, tracking
/// nested `… {` / `}` the same way the scanner does, and returns its index
/// plus the body lines between header and closer.
fn collect_macro_body(raw_lines: &[String], start: usize) -> (usize, Vec<String>) {
    let mut depth = 1usize;
    let mut body = Vec::new();
    let mut i = start + 1;
    while i < raw_lines.len() {
        let trimmed = raw_lines[i].trim();
        if trimmed == "}" {
            depth -= 1;
            if depth == 0 {
                return (i, body);
            }
            body.push(raw_lines[i].clone());
        } else {
            if trimmed.ends_with('{') {
                depth += 1;
            }
            body.push(raw_lines[i].clone());
        }
        i += 1;
    }
    (raw_lines.len().saturating_sub(1), body)
}

/// Peels leading modifiers (`-`, `!`, `@`, `<name>`) off a raw script line.
fn parse_script_line(raw: &str) -> CommandScript {
    let mut rest = raw.trim_start();
    let mut modifiers = ScriptModifiers::default();
    loop {
        if let Some(stripped) = rest.strip_prefix('-') {
            modifiers.ignore_exit = true;
            rest = stripped.trim_start();
        } else if let Some(stripped) = rest.strip_prefix('!') {
            modifiers.invert_exit = true;
            rest = stripped.trim_start();
        } else if let Some(stripped) = rest.strip_prefix('@') {
            modifiers.echo = true;
            rest = stripped.trim_start();
        } else if let Some(stripped) = rest.strip_prefix('<') {
            if let Some(end) = stripped.find('>') {
                modifiers.copy_of = Some(stripped[..end].to_string());
                rest = stripped[end + 1..].trim_start();
            }
            break;
        } else {
            break;
        }
    }
    CommandScript {
        modifiers,
        line: rest.to_string(),
    }
}

#[cfg(test)]
#[path = "decoder_tests.rs"]
mod tests;
