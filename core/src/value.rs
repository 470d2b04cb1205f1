//! Option values before and after coercion.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value stored for an option.
///
/// The tokenizer stores every value as [`Raw`](OptionValue::Raw). The
/// coercer replaces it with the typed variant chosen by the option's
/// declared [`OptionType`](crate::OptionType); values it cannot or may not
/// convert stay raw.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::OptionValue;
///
/// let v = OptionValue::Int(300);
/// assert_eq!(v.as_int(), Some(300));
/// assert_eq!(v.to_string(), "300");
/// assert!(OptionValue::Flag(true).is_enabled());
/// assert!(!OptionValue::Raw("yes".into()).is_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    /// Unconverted token text.
    Raw(String),
    /// Boolean switch state.
    Flag(bool),
    /// Integer value.
    Int(i64),
    /// Free text.
    Text(String),
    /// Parsed GUID.
    Identifier(Uuid),
    /// Enum value in canonical casing.
    Enumerated(String),
}

impl OptionValue {
    /// Returns `true` for `Flag(true)` and for raw `true`/`1`.
    ///
    /// Bare options the schema does not know are stored as raw `true`, so
    /// they still count as switched on.
    pub fn is_enabled(&self) -> bool {
        match self {
            OptionValue::Flag(on) => *on,
            OptionValue::Raw(s) => s.eq_ignore_ascii_case("true") || s == "1",
            _ => false,
        }
    }

    /// Returns `true` if the value has not been converted.
    pub fn is_raw(&self) -> bool {
        matches!(self, OptionValue::Raw(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<Uuid> {
        match self {
            OptionValue::Identifier(id) => Some(*id),
            _ => None,
        }
    }

    /// Borrows the text of `Raw`, `Text` and `Enumerated` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Raw(s) | OptionValue::Text(s) | OptionValue::Enumerated(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Raw(s) | OptionValue::Text(s) | OptionValue::Enumerated(s) => {
                f.write_str(s)
            }
            OptionValue::Flag(b) => write!(f, "{b}"),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Identifier(id) => write!(f, "{}", id.hyphenated()),
        }
    }
}
