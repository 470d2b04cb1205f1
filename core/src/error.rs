//! Error types for argument processing and registry loading.
//!
//! User input never produces a panic: every problem with the supplied
//! tokens becomes an [`ArgError`] collected into an ordered list. Problems
//! loading or checking a registry file are reported as [`RegistryError`].

use std::collections::HashSet;

use thiserror::Error;

use crate::validate::SchemaError;

/// Stage that produced an [`ArgError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Tokenizer-level problem.
    Parse,
    /// A value could not be converted to its declared type.
    Coercion,
    /// A validation rule was violated.
    Validation,
}

/// A problem with the supplied arguments.
///
/// The `Display` impl is the human-readable message shown to the user.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{ArgError, ErrorKind};
///
/// let err = ArgError::MissingValue { option: "criteria".into() };
/// assert_eq!(err.to_string(), "Option --criteria requires a value");
/// assert_eq!(err.kind(), ErrorKind::Parse);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// A value-taking option was the last token or was followed by another
    /// option.
    #[error("Option --{option} requires a value")]
    MissingValue { option: String },
    /// An `Int` option got text that is not a base-10 integer.
    #[error("Option --{option} requires an integer value (got: '{raw}')")]
    InvalidInteger { option: String, raw: String },
    /// An `Enum` option got a value outside its allowed set.
    #[error("Option --{} must be one of: {} (got: '{}')", .option, .allowed.join(", "), .raw)]
    InvalidChoice {
        option: String,
        raw: String,
        allowed: Vec<String>,
    },
    /// A validation rule reported a violation.
    #[error("{message}")]
    Rule { rule: String, message: String },
}

impl ArgError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArgError::MissingValue { .. } => ErrorKind::Parse,
            ArgError::InvalidInteger { .. } | ArgError::InvalidChoice { .. } => {
                ErrorKind::Coercion
            }
            ArgError::Rule { .. } => ErrorKind::Validation,
        }
    }

    /// Returns the id of the violated rule, if any.
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            ArgError::Rule { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

/// Renders errors for display.
///
/// Identical messages are collapsed here and only here; the collected list
/// keeps every occurrence. Returns `None` when there is nothing to report.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{ArgError, format_errors};
///
/// let err = ArgError::MissingValue { option: "select".into() };
/// let text = format_errors(&[err.clone(), err]).unwrap();
/// assert_eq!(text.matches("--select requires a value").count(), 1);
/// assert!(format_errors(&[]).is_none());
/// ```
pub fn format_errors(errors: &[ArgError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }

    let mut lines = vec!["Validation errors:".to_string(), String::new()];
    let mut seen = HashSet::new();
    for message in errors.iter().map(ToString::to_string) {
        if seen.insert(message.clone()) {
            lines.push(format!("  * {message}"));
        }
    }
    lines.push(String::new());
    lines.push("Use --help to see valid options and combination rules.".to_string());

    Some(lines.join("\n"))
}

/// Errors that can occur while loading a registry from a file or string.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The registry loaded but is structurally invalid.
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;
