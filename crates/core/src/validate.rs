// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Option and positional-argument validators (§6.1 `check` sub-property).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use thiserror::Error;

/// A composable validator expression: `oneof|noneof|notempty|match|int|
/// float|eq|ne|gt|ge|lt|le|url|ip|ipport|exists|file|dir|readable|writable|
/// executable`, combined with `all|some|not`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Validator {
    OneOf(Vec<String>),
    NoneOf(Vec<String>),
    NotEmpty,
    Match(String),
    Int,
    Float,
    Eq(String),
    Ne(String),
    Gt(String),
    Ge(String),
    Lt(String),
    Le(String),
    Url,
    Ip,
    IpPort,
    Exists,
    File,
    Dir,
    Readable,
    Writable,
    Executable,
    All(Vec<Validator>),
    Some(Vec<Validator>),
    Not(Box<Validator>),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("value {value:?} is not one of {options:?}")]
    NotOneOf { value: String, options: Vec<String> },
    #[error("value {value:?} is one of the forbidden values {options:?}")]
    IsNoneOf { value: String, options: Vec<String> },
    #[error("value must not be empty")]
    Empty,
    #[error("value {value:?} does not match pattern {pattern:?}")]
    NoMatch { value: String, pattern: String },
    #[error("invalid regex pattern {pattern:?}: {message}")]
    BadPattern { pattern: String, message: String },
    #[error("value {value:?} is not an integer")]
    NotInt { value: String },
    #[error("value {value:?} is not a float")]
    NotFloat { value: String },
    #[error("value {value:?} failed comparison {op} {operand:?}")]
    Compare {
        value: String,
        op: &'static str,
        operand: String,
    },
    #[error("value {value:?} is not a valid URL")]
    NotUrl { value: String },
    #[error("value {value:?} is not a valid IP address")]
    NotIp { value: String },
    #[error("value {value:?} is not a valid host:port")]
    NotIpPort { value: String },
    #[error("path {value:?} does not exist")]
    NotExists { value: String },
    #[error("path {value:?} is not a file")]
    NotFile { value: String },
    #[error("path {value:?} is not a directory")]
    NotDir { value: String },
    #[error("path {value:?} is not readable")]
    NotReadable { value: String },
    #[error("path {value:?} is not writable")]
    NotWritable { value: String },
    #[error("path {value:?} is not executable")]
    NotExecutable { value: String },
    #[error("no validator in the `some` group accepted {value:?}")]
    NoneAccepted { value: String },
    #[error("the `not` group unexpectedly accepted {value:?}")]
    UnexpectedAccept { value: String },
}

impl Validator {
    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        match self {
            Validator::OneOf(options) => {
                if options.iter().any(|o| o == value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotOneOf {
                        value: value.to_string(),
                        options: options.clone(),
                    })
                }
            }
            Validator::NoneOf(options) => {
                if options.iter().any(|o| o == value) {
                    Err(ValidationError::IsNoneOf {
                        value: value.to_string(),
                        options: options.clone(),
                    })
                } else {
                    Ok(())
                }
            }
            Validator::NotEmpty => {
                if value.is_empty() {
                    Err(ValidationError::Empty)
                } else {
                    Ok(())
                }
            }
            Validator::Match(pattern) => {
                let re = Regex::new(pattern).map_err(|e| ValidationError::BadPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                if re.is_match(value) {
                    Ok(())
                } else {
                    Err(ValidationError::NoMatch {
                        value: value.to_string(),
                        pattern: pattern.clone(),
                    })
                }
            }
            Validator::Int => value
                .parse::<i64>()
                .map(|_| ())
                .map_err(|_| ValidationError::NotInt {
                    value: value.to_string(),
                }),
            Validator::Float => value
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| ValidationError::NotFloat {
                    value: value.to_string(),
                }),
            Validator::Eq(operand) => compare(value, operand, "==", |a, b| a == b),
            Validator::Ne(operand) => compare(value, operand, "!=", |a, b| a != b),
            Validator::Gt(operand) => compare(value, operand, ">", |a, b| a > b),
            Validator::Ge(operand) => compare(value, operand, ">=", |a, b| a >= b),
            Validator::Lt(operand) => compare(value, operand, "<", |a, b| a < b),
            Validator::Le(operand) => compare(value, operand, "<=", |a, b| a <= b),
            Validator::Url => {
                if looks_like_url(value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotUrl {
                        value: value.to_string(),
                    })
                }
            }
            Validator::Ip => value
                .parse::<IpAddr>()
                .map(|_| ())
                .map_err(|_| ValidationError::NotIp {
                    value: value.to_string(),
                }),
            Validator::IpPort => value
                .parse::<SocketAddr>()
                .map(|_| ())
                .map_err(|_| ValidationError::NotIpPort {
                    value: value.to_string(),
                }),
            Validator::Exists => {
                if Path::new(value).exists() {
                    Ok(())
                } else {
                    Err(ValidationError::NotExists {
                        value: value.to_string(),
                    })
                }
            }
            Validator::File => {
                if Path::new(value).is_file() {
                    Ok(())
                } else {
                    Err(ValidationError::NotFile {
                        value: value.to_string(),
                    })
                }
            }
            Validator::Dir => {
                if Path::new(value).is_dir() {
                    Ok(())
                } else {
                    Err(ValidationError::NotDir {
                        value: value.to_string(),
                    })
                }
            }
            Validator::Readable => {
                if is_readable(value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotReadable {
                        value: value.to_string(),
                    })
                }
            }
            Validator::Writable => {
                if is_writable(value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotWritable {
                        value: value.to_string(),
                    })
                }
            }
            Validator::Executable => {
                if is_executable(value) {
                    Ok(())
                } else {
                    Err(ValidationError::NotExecutable {
                        value: value.to_string(),
                    })
                }
            }
            Validator::All(validators) => {
                for v in validators {
                    v.validate(value)?;
                }
                Ok(())
            }
            Validator::Some(validators) => {
                if validators.iter().any(|v| v.validate(value).is_ok()) {
                    Ok(())
                } else {
                    Err(ValidationError::NoneAccepted {
                        value: value.to_string(),
                    })
                }
            }
            Validator::Not(inner) => {
                if inner.validate(value).is_ok() {
                    Err(ValidationError::UnexpectedAccept {
                        value: value.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn compare(
    value: &str,
    operand: &str,
    op: &'static str,
    cmp: impl Fn(f64, f64) -> bool,
) -> Result<(), ValidationError> {
    let (a, b) = match (value.parse::<f64>(), operand.parse::<f64>()) {
        (Ok(a), Ok(b)) => (a, b),
        _ => {
            // Fall back to lexicographic comparison for non-numeric operands.
            let ok = match op {
                "==" => value == operand,
                "!=" => value != operand,
                ">" => value > operand,
                ">=" => value >= operand,
                "<" => value < operand,
                "<=" => value <= operand,
                _ => false,
            };
            return if ok {
                Ok(())
            } else {
                Err(ValidationError::Compare {
                    value: value.to_string(),
                    op,
                    operand: operand.to_string(),
                })
            };
        }
    };
    if cmp(a, b) {
        Ok(())
    } else {
        Err(ValidationError::Compare {
            value: value.to_string(),
            op,
            operand: operand.to_string(),
        })
    }
}

fn looks_like_url(value: &str) -> bool {
    match value.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
                && !rest.is_empty()
        }
        None => false,
    }
}

#[cfg(unix)]
fn is_readable(path: &str) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o444 != 0)
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_writable(path: &str) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o222 != 0)
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &str) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_readable(path: &str) -> bool {
    std::fs::metadata(path).is_ok()
}

#[cfg(not(unix))]
fn is_writable(path: &str) -> bool {
    std::fs::metadata(path).is_ok()
}

#[cfg(not(unix))]
fn is_executable(path: &str) -> bool {
    std::fs::metadata(path).is_ok()
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
