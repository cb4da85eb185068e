use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// One event of a flattened admin-object export: a slash-separated path
/// relative to the object root plus the text content of that node.
/// `content` is `None` for container starts and boolean-presence tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEvent {
    pub path: String,
    pub content: Option<String>,
}

impl PathEvent {
    pub fn new(path: impl Into<String>, content: Option<&str>) -> Self {
        PathEvent {
            path: path.into(),
            content: content.map(|s| s.to_string()),
        }
    }
}

/// Errors shared across the cisync crates. Orchestration code wraps these in
/// eyre reports; libraries keep the typed variants so per-object outcomes can
/// be classified.
#[derive(Debug, Error)]
pub enum CisyncError {
    #[error("parse {kind} '{name}': {message}")]
    Parse {
        kind: String,
        name: String,
        message: String,
    },
    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },
    #[error("validation of {kind} '{name}' failed with {errors} error(s)")]
    Validation {
        kind: String,
        name: String,
        errors: usize,
    },
    #[error("transport: {0}")]
    Transport(String),
    #[error("{0}")]
    Other(String),
}

/// Экранирование строк для update-скриптов:
/// \ -> \\, " -> \", \n -> \n, \r -> \r, \t -> \t
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Inverse of [`escape`]. Unknown escape sequences keep the escaped character
/// verbatim so a lone backslash never panics the reader.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// True when every character of `s` survives an escape/unescape round trip.
/// Control characters other than tab/newline/CR have no escape form in the
/// admin script language.
pub fn is_escapable(s: &str) -> bool {
    s.chars().all(|ch| {
        let c = ch as u32;
        c >= 0x20 || ch == '\t' || ch == '\n' || ch == '\r'
    })
}
