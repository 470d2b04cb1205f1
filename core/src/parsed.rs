//! The per-invocation parse result.

use std::borrow::Cow;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::SchemaRegistry;
use crate::coerce::{Conversion, convert};
use crate::error::ArgError;
use crate::selection::{SelectionError, SelectionSpec};
use crate::types::OptionType;
use crate::value::OptionValue;

/// Insertion-ordered option map with case-insensitive keys.
///
/// Keys are stored lower-cased. Re-inserting a key replaces its value in
/// place, so iteration order is the order options were first supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMap {
    entries: Vec<(String, OptionValue)>,
}

impl OptionMap {
    pub fn insert(&mut self, name: &str, value: OptionValue) {
        let key = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut OptionValue)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for OptionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Result of tokenizing (and then coercing) one invocation.
///
/// Presence and value are separate questions: [`has`](ParseResult::has)
/// only reports options the user supplied, while
/// [`value`](ParseResult::value) falls back to the schema default.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{SchemaRegistry, OptionValue, coerce, parse};
///
/// let registry = SchemaRegistry::update_tool();
/// let mut result = parse(&registry, &["search", "--include-hidden"]);
/// coerce(&registry, &mut result);
///
/// assert!(result.has("include-hidden"));
/// assert!(!result.has("max-results"));
/// assert_eq!(result.int(&registry, "max-results"), Some(50));
/// assert_eq!(result.get("include-hidden"), Some(&OptionValue::Flag(true)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    /// Lower-cased command name.
    pub command: Option<String>,
    /// Lower-cased subcommand name.
    pub subcommand: Option<String>,
    /// Explicitly supplied options.
    pub options: OptionMap,
    /// Remaining bare tokens after the command.
    pub positional: Vec<String>,
    /// Parse and coercion errors, in the order they occurred.
    #[serde(serialize_with = "serialize_messages")]
    pub errors: Vec<ArgError>,
}

impl ParseResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if `name` was explicitly supplied.
    pub fn has(&self, name: &str) -> bool {
        self.options.contains(name)
    }

    /// Gets the explicitly supplied value of `name`.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Stores a value, replacing any earlier one.
    pub fn set(&mut self, name: &str, value: OptionValue) {
        self.options.insert(name, value);
    }

    /// Returns `true` if the command equals `name`, ignoring case.
    pub fn command_is(&self, name: &str) -> bool {
        self.command
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(name))
    }

    /// Returns `true` if the subcommand equals `name`, ignoring case.
    pub fn subcommand_is(&self, name: &str) -> bool {
        self.subcommand
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(name))
    }

    /// Reads the value of `name`, falling back to its schema default.
    ///
    /// The default is looked up in the invocation's command scope first,
    /// then globally, and converted with the same rules as supplied values.
    /// Without a default, `Flag` options read as `false` and `Int` options
    /// as `0`; other types read as `None`.
    pub fn value<'a>(
        &'a self,
        registry: &SchemaRegistry,
        name: &str,
    ) -> Option<Cow<'a, OptionValue>> {
        if let Some(value) = self.get(name) {
            return Some(Cow::Borrowed(value));
        }

        let schema = registry.resolve_option(
            self.command.as_deref(),
            self.subcommand.as_deref(),
            name,
        )?;
        let converted = schema.default.as_deref().and_then(|raw| match convert(schema, raw) {
            Conversion::Value(value) => Some(value),
            _ => None,
        });
        converted
            .or_else(|| match schema.option_type {
                OptionType::Flag => Some(OptionValue::Flag(false)),
                OptionType::Int => Some(OptionValue::Int(0)),
                _ => None,
            })
            .map(Cow::Owned)
    }

    /// Returns `true` if `name` reads as `Flag(true)`.
    pub fn flag(&self, registry: &SchemaRegistry, name: &str) -> bool {
        self.value(registry, name).is_some_and(|v| v.is_enabled())
    }

    /// Reads an integer value, or `None` if the value is not an integer.
    pub fn int(&self, registry: &SchemaRegistry, name: &str) -> Option<i64> {
        self.value(registry, name).and_then(|v| v.as_int())
    }

    /// Reads any value as text.
    pub fn text(&self, registry: &SchemaRegistry, name: &str) -> Option<String> {
        self.value(registry, name).map(|v| v.to_string())
    }

    /// Parses the supplied `--select` expression, if any.
    pub fn selection(&self) -> Option<Result<SelectionSpec, SelectionError>> {
        self.get("select")
            .map(|value| SelectionSpec::parse(&value.to_string()))
    }
}

pub(crate) fn serialize_messages<S: Serializer>(
    errors: &[ArgError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
