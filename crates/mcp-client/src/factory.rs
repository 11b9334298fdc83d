//! Building adapters from typed config, loose tables, or endpoint strings.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::adapter::{AdapterConfig, HttpAdapter, ServerAdapter, StdioAdapter, TransportKind, DEFAULT_TIMEOUT};
use crate::error::AdapterError;
use crate::transport::{SystemOpener, TransportOpener};

/// Creates adapters of every supported kind.
#[derive(Clone)]
pub struct AdapterFactory {
    opener: Arc<dyn TransportOpener>,
}

impl std::fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterFactory").finish_non_exhaustive()
    }
}

impl Default for AdapterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterFactory {
    pub fn new() -> Self {
        Self::with_opener(Arc::new(SystemOpener))
    }

    /// Use `opener` for every adapter this factory builds.
    pub fn with_opener(opener: Arc<dyn TransportOpener>) -> Self {
        Self { opener }
    }

    pub fn supported_kinds() -> &'static [TransportKind] {
        &TransportKind::ALL
    }

    /// Check `config` against the fields `kind` requires, without building anything.
    pub fn validate(kind: TransportKind, config: &AdapterConfig) -> Result<(), AdapterError> {
        config.validate(kind)
    }

    /// Build an adapter of `kind`. A zero timeout becomes [`DEFAULT_TIMEOUT`].
    pub fn create(&self, kind: TransportKind, config: AdapterConfig) -> Result<Box<dyn ServerAdapter>, AdapterError> {
        match kind {
            TransportKind::Stdio => Ok(Box::new(StdioAdapter::with_opener(config, self.opener.clone())?)),
            TransportKind::Http | TransportKind::Streamable => {
                Ok(Box::new(HttpAdapter::with_opener(kind, config, self.opener.clone())?))
            }
        }
    }

    /// Like [`create`](Self::create) with the kind given as a string.
    pub fn create_named(&self, kind: &str, config: AdapterConfig) -> Result<Box<dyn ServerAdapter>, AdapterError> {
        self.create(kind.parse()?, config)
    }

    /// Build an adapter from a weakly-typed table, e.g. a `[servers.<name>]`
    /// section of the config file.
    pub fn create_from_loose_config(&self, table: &Map<String, Value>) -> Result<Box<dyn ServerAdapter>, AdapterError> {
        let (kind, config) = config_from_loose(table)?;
        self.create(kind, config)
    }

    /// Build an adapter from a URL or a shell-style command line.
    ///
    /// `http://` and `https://` endpoints become HTTP adapters; anything
    /// else is split into a command and its arguments.
    pub fn create_from_endpoint(&self, endpoint: &str, verbose: bool) -> Result<Box<dyn ServerAdapter>, AdapterError> {
        let trimmed = endpoint.trim();
        let invalid = |reason: &str| AdapterError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            reason: reason.to_owned(),
        };

        if trimmed.is_empty() {
            return Err(invalid("endpoint is empty"));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let config = AdapterConfig::http(trimmed).with_verbose(verbose);
            return self.create(TransportKind::Http, config);
        }

        let mut words = split_command_line(trimmed).map_err(|reason| invalid(&reason))?;
        if words.is_empty() {
            return Err(invalid("no command found"));
        }
        let command = words.remove(0);
        let config = AdapterConfig::stdio(command, words).with_verbose(verbose);
        self.create(TransportKind::Stdio, config)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loose config coercion
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn invalid(msg: impl Into<String>) -> AdapterError {
    AdapterError::InvalidConfig(msg.into())
}

/// Extract a kind and typed config from a loose table.
///
/// Recognized keys: `type` (required), `command`, `args`, `env`, `url`,
/// `timeout`, `verbose`. Unknown keys are ignored.
pub fn config_from_loose(table: &Map<String, Value>) -> Result<(TransportKind, AdapterConfig), AdapterError> {
    let kind = match table.get("type") {
        Some(Value::String(s)) => s.parse::<TransportKind>()?,
        Some(_) => return Err(invalid("type must be a string")),
        None => return Err(invalid("type is required")),
    };

    let config = AdapterConfig {
        command: get_string(table, "command")?.unwrap_or_default(),
        args: get_args(table)?,
        env: get_env(table)?,
        url: get_string(table, "url")?.unwrap_or_default(),
        timeout: get_timeout(table)?.unwrap_or(DEFAULT_TIMEOUT),
        verbose: match table.get("verbose") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(invalid("verbose must be a boolean")),
        },
    };
    Ok((kind, config))
}

fn get_string(table: &Map<String, Value>, key: &str) -> Result<Option<String>, AdapterError> {
    match table.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(format!("{key} must be a string"))),
    }
}

fn get_args(table: &Map<String, Value>) -> Result<Vec<String>, AdapterError> {
    match table.get("args") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(line)) => split_command_line(line).map_err(|e| invalid(format!("args: {e}"))),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(invalid("args must be an array of strings")),
            })
            .collect(),
        Some(_) => Err(invalid("args must be an array of strings")),
    }
}

fn get_env(table: &Map<String, Value>) -> Result<BTreeMap<String, String>, AdapterError> {
    match table.get("env") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return Err(invalid(format!("env.{k} must be a string"))),
                };
                Ok((k.clone(), value))
            })
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                let pair = v.as_str().ok_or_else(|| invalid("env entries must be KEY=VALUE strings"))?;
                match pair.split_once('=') {
                    Some((k, val)) if !k.is_empty() => Ok((k.to_owned(), val.to_owned())),
                    _ => Err(invalid(format!("env entry {pair:?} is not KEY=VALUE"))),
                }
            })
            .collect(),
        Some(_) => Err(invalid("env must be a table or an array of KEY=VALUE strings")),
    }
}

fn get_timeout(table: &Map<String, Value>) -> Result<Option<Duration>, AdapterError> {
    match table.get("timeout") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_duration(s)
            .map(Some)
            .ok_or_else(|| invalid(format!("timeout {s:?} is not a duration"))),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|_| invalid(format!("timeout {secs} is out of range"))),
            _ => Err(invalid("timeout must be a non-negative number of seconds")),
        },
        Some(_) => Err(invalid("timeout must be a duration string or a number of seconds")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parsers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a duration such as `"500ms"`, `"30s"`, `"1m30s"` or `"1.5h"`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare `"0"` is zero.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        nanos += value * scale;
        rest = &rest[unit_len..];
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}

/// Split a command line into words, shell style.
///
/// Handles single quotes (literal), double quotes (with `\"`, `\\`, `\$`
/// and `` \` `` escapes) and backslash escapes outside quotes. No
/// variable expansion or globbing.
pub fn split_command_line(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err("unterminated single quote".into()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\' | '$' | '`')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => return Err("unterminated double quote".into()),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err("unterminated double quote".into()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => return Err("trailing backslash".into()),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
