//! The `--select` expression sub-grammar.
//!
//! ```text
//! selection := tag ':' item (',' item)*
//! tag       := "kb" | "index"        (case-insensitive)
//! ```
//!
//! Empty items are dropped, so `index:1,,3` selects `1` and `3`. Items are
//! not normalized; `kb:kb5001234` keeps its casing.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the selected items identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionTag {
    /// Knowledge-base article identifiers.
    Kb,
    /// Positions in a previous search result.
    Index,
}

impl SelectionTag {
    /// The prefix keyword, without the colon.
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionTag::Kb => "kb",
            SelectionTag::Index => "index",
        }
    }

    /// Splits a recognized `tag:` prefix off `raw`.
    pub(crate) fn strip(raw: &str) -> Option<(Self, &str)> {
        [SelectionTag::Kb, SelectionTag::Index]
            .into_iter()
            .find_map(|tag| {
                let prefix_len = tag.as_str().len() + 1;
                let head = raw.get(..prefix_len)?;
                let matches = head.ends_with(':')
                    && head[..prefix_len - 1].eq_ignore_ascii_case(tag.as_str());
                matches.then(|| (tag, &raw[prefix_len..]))
            })
    }
}

impl fmt::Display for SelectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The expression does not start with `kb:` or `index:`.
    #[error("selection must start with 'kb:' or 'index:' (got: '{0}')")]
    UnknownTag(String),
    /// Nothing left after dropping empty items.
    #[error("selection '{0}' has no items")]
    Empty(String),
}

/// A parsed `--select` expression.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{SelectionSpec, SelectionTag};
///
/// let spec = SelectionSpec::parse("KB:KB5001234,KB5001235").unwrap();
/// assert_eq!(spec.tag, SelectionTag::Kb);
/// assert_eq!(spec.values, vec!["KB5001234", "KB5001235"]);
///
/// assert!(SelectionSpec::parse("id:7").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSpec {
    pub tag: SelectionTag,
    /// Non-empty, in the order written.
    pub values: Vec<String>,
}

impl SelectionSpec {
    /// Parses a selection expression.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownTag`] for an unrecognized prefix and
    /// [`SelectionError::Empty`] when no items remain.
    pub fn parse(raw: &str) -> Result<Self, SelectionError> {
        let (tag, rest) =
            SelectionTag::strip(raw).ok_or_else(|| SelectionError::UnknownTag(raw.to_string()))?;

        let values: Vec<String> = rest
            .split(',')
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();

        if values.is_empty() {
            return Err(SelectionError::Empty(raw.to_string()));
        }
        Ok(Self { tag, values })
    }
}

impl fmt::Display for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.values.join(","))
    }
}
