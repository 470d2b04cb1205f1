//! Type coercion of raw option values.
//!
//! Every explicitly supplied raw value is converted according to its
//! option's declared type, resolved narrowest scope first. Unknown options
//! and flag values other than `true`/`false`/`1`/`0` stay raw without an
//! error. Failed `Int` and `Enum` conversions append an error and keep the
//! raw text.

use tracing::debug;
use uuid::Uuid;

use crate::SchemaRegistry;
use crate::error::ArgError;
use crate::parsed::ParseResult;
use crate::types::{OptionSchema, OptionType};
use crate::value::OptionValue;

/// Outcome of converting one raw value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Conversion {
    /// Converted to its typed form.
    Value(OptionValue),
    /// Left as-is without an error.
    Unconverted,
    /// Rejected; carries the coercion error.
    Invalid(ArgError),
}

/// Converts `raw` under `schema`'s declared type.
pub(crate) fn convert(schema: &OptionSchema, raw: &str) -> Conversion {
    match schema.option_type {
        OptionType::Flag => {
            if raw.eq_ignore_ascii_case("true") || raw == "1" {
                Conversion::Value(OptionValue::Flag(true))
            } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
                Conversion::Value(OptionValue::Flag(false))
            } else {
                Conversion::Unconverted
            }
        }
        OptionType::Int => match raw.trim().parse::<i64>() {
            Ok(n) => Conversion::Value(OptionValue::Int(n)),
            Err(_) => Conversion::Invalid(ArgError::InvalidInteger {
                option: schema.name.clone(),
                raw: raw.to_string(),
            }),
        },
        OptionType::Enum => match schema
            .allowed_values
            .iter()
            .find(|v| v.eq_ignore_ascii_case(raw))
        {
            Some(canonical) => Conversion::Value(OptionValue::Enumerated(canonical.clone())),
            None => Conversion::Invalid(ArgError::InvalidChoice {
                option: schema.name.clone(),
                raw: raw.to_string(),
                allowed: schema.allowed_values.clone(),
            }),
        },
        OptionType::String => Conversion::Value(OptionValue::Text(raw.to_string())),
        // Malformed identifiers are left for the GUID validation rule.
        OptionType::Guid => match Uuid::parse_str(raw.trim()) {
            Ok(id) => Conversion::Value(OptionValue::Identifier(id)),
            Err(_) => Conversion::Unconverted,
        },
    }
}

/// Converts every raw value in `result` to its declared type.
///
/// Existing errors are kept; coercion errors are appended after them.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{OptionValue, SchemaRegistry, coerce, parse};
///
/// let registry = SchemaRegistry::update_tool();
/// let mut result = parse(&registry, &["history", "--output", "JSON", "--count", "ten"]);
/// coerce(&registry, &mut result);
///
/// assert_eq!(result.get("output"), Some(&OptionValue::Enumerated("json".into())));
/// assert_eq!(
///     result.errors[0].to_string(),
///     "Option --count requires an integer value (got: 'ten')"
/// );
/// ```
pub fn coerce(registry: &SchemaRegistry, result: &mut ParseResult) {
    let command = result.command.clone();
    let subcommand = result.subcommand.clone();
    let mut errors = Vec::new();

    for (name, value) in result.options.iter_mut() {
        let OptionValue::Raw(raw) = value else {
            continue;
        };
        let Some(schema) = registry.resolve_option(command.as_deref(), subcommand.as_deref(), name)
        else {
            continue;
        };

        match convert(schema, raw) {
            Conversion::Value(converted) => *value = converted,
            Conversion::Unconverted => {
                debug!(option = name, raw = %raw, "Left value unconverted");
            }
            Conversion::Invalid(err) => {
                debug!(option = name, error = %err, "Coercion failed");
                errors.push(rename_option(err, name));
            }
        }
    }

    result.errors.extend(errors);
}

/// Reports the error under the key the user supplied.
fn rename_option(err: ArgError, key: &str) -> ArgError {
    match err {
        ArgError::InvalidInteger { raw, .. } => ArgError::InvalidInteger {
            option: key.to_string(),
            raw,
        },
        ArgError::InvalidChoice { raw, allowed, .. } => ArgError::InvalidChoice {
            option: key.to_string(),
            raw,
            allowed,
        },
        other => other,
    }
}
