//! Structural validation of a [`SchemaRegistry`].
//!
//! Catches grammar mistakes before any token is parsed: colliding names,
//! short aliases outside the global scope, subcommands nested too deeply,
//! enum options without values and defaults that do not convert under
//! their own declared type. Range rules must repeat the bounds their Int
//! option declares.
//!
//! # Examples
//!
//! ```
//! use wuctl_grammar::*;
//!
//! let registry = SchemaRegistry::new("tool", "1.0.0")
//!     .with_global_option(OptionSchema::flag("help").with_short("h"));
//! assert!(validate_registry(&registry).is_empty());
//!
//! let bad = registry.with_global_option(OptionSchema::flag("host").with_short("h"));
//! assert_eq!(
//!     validate_registry(&bad),
//!     vec![SchemaError::DuplicateShortAlias("h".to_string())]
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::SchemaRegistry;
use crate::coerce::{Conversion, convert};
use crate::rules::RuleKind;
use crate::types::{CommandSchema, OptionSchema, OptionType};

/// Registry structure errors.
///
/// Each variant describes one structural problem. The `Display` impl
/// provides a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Program name is empty or whitespace-only.
    #[error("program name cannot be empty")]
    EmptyProgramName,
    /// Command or subcommand name is empty.
    #[error("command name cannot be empty")]
    EmptyCommandName,
    /// Two commands share a name.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),
    /// Two subcommands of one command share a name.
    #[error("duplicate subcommand: {0}")]
    DuplicateSubcommand(String),
    /// A subcommand declares subcommands of its own.
    #[error("subcommands may only nest one level: {0}")]
    NestedSubcommand(String),
    /// An option has an empty name.
    #[error("option name cannot be empty in scope: {0}")]
    EmptyOptionName(String),
    /// Two options in the same scope share a name.
    #[error("duplicate option in scope {scope}: {name}")]
    DuplicateOption { scope: String, name: String },
    /// Two global options share a short alias.
    #[error("duplicate short alias: {0}")]
    DuplicateShortAlias(String),
    /// A command-scoped option declares a short alias.
    #[error("short alias only allowed on global options: {scope} --{name}")]
    ScopedShortAlias { scope: String, name: String },
    /// An enum option has no allowed values.
    #[error("enum option has no allowed values: {0}")]
    MissingAllowedValues(String),
    /// A default does not convert under the option's declared type.
    #[error("default '{default}' is not valid for option --{option}")]
    InvalidDefault { option: String, default: String },
    /// A validation rule has an empty identifier.
    #[error("validation rule id cannot be empty")]
    EmptyRuleId,
    /// Two validation rules share an identifier.
    #[error("duplicate validation rule: {0}")]
    DuplicateRule(String),
    /// A range rule's bounds differ from the bounds its option declares.
    #[error("range rule {rule} disagrees with the bounds declared on --{option}")]
    RangeMismatch { rule: String, option: String },
}

/// Validates a registry.
///
/// Stops at the first problem found, in the order: program name, global
/// options, commands (and their subcommands), rules.
pub fn validate_registry(registry: &SchemaRegistry) -> Vec<SchemaError> {
    let mut errors = Vec::new();

    if registry.program.trim().is_empty() {
        errors.push(SchemaError::EmptyProgramName);
        return errors;
    }

    errors.extend(validate_options(&registry.global_options, "global", true));
    if !errors.is_empty() {
        return errors;
    }

    errors.extend(validate_commands(&registry.commands, None));
    if !errors.is_empty() {
        return errors;
    }

    let mut seen_rules: HashSet<&str> = HashSet::new();
    for rule in &registry.rules {
        let id = rule.id.trim();
        if id.is_empty() {
            errors.push(SchemaError::EmptyRuleId);
            return errors;
        }
        if !seen_rules.insert(id) {
            errors.push(SchemaError::DuplicateRule(id.to_string()));
            return errors;
        }
        if let RuleKind::NumericRange {
            option, min, max, ..
        } = &rule.kind
        {
            let drifted = all_options(registry)
                .filter(|o| o.option_type == OptionType::Int && o.matches(option))
                .any(|o| (o.min.is_some() || o.max.is_some()) && (o.min, o.max) != (*min, *max));
            if drifted {
                errors.push(SchemaError::RangeMismatch {
                    rule: id.to_string(),
                    option: option.clone(),
                });
                return errors;
            }
        }
    }

    errors
}

/// Every option declared anywhere in the registry.
fn all_options(registry: &SchemaRegistry) -> impl Iterator<Item = &OptionSchema> {
    let scoped = registry.commands.iter().flat_map(|c| {
        c.options
            .iter()
            .chain(c.subcommands.iter().flat_map(|s| s.options.iter()))
    });
    registry.global_options.iter().chain(scoped)
}

fn validate_commands(commands: &[CommandSchema], parent: Option<&str>) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for command in commands {
        let name = command.name.trim();
        if name.is_empty() {
            errors.push(SchemaError::EmptyCommandName);
            return errors;
        }

        let path = match parent {
            Some(parent) => format!("{parent} {name}"),
            None => name.to_string(),
        };

        if !seen.insert(name.to_ascii_lowercase()) {
            errors.push(match parent {
                Some(_) => SchemaError::DuplicateSubcommand(path),
                None => SchemaError::DuplicateCommand(path),
            });
            return errors;
        }

        errors.extend(validate_options(&command.options, &path, false));
        if !errors.is_empty() {
            return errors;
        }

        if parent.is_some() {
            if let Some(nested) = command.subcommands.first() {
                errors.push(SchemaError::NestedSubcommand(format!(
                    "{path} {}",
                    nested.name
                )));
                return errors;
            }
        } else {
            errors.extend(validate_commands(&command.subcommands, Some(&path)));
            if !errors.is_empty() {
                return errors;
            }
        }
    }

    errors
}

fn validate_options(options: &[OptionSchema], scope: &str, global: bool) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();
    let mut shorts = HashSet::new();

    for option in options {
        let name = option.name.trim();
        if name.is_empty() {
            errors.push(SchemaError::EmptyOptionName(scope.to_string()));
            return errors;
        }
        if !names.insert(name.to_ascii_lowercase()) {
            errors.push(SchemaError::DuplicateOption {
                scope: scope.to_string(),
                name: name.to_string(),
            });
            return errors;
        }

        if let Some(short) = &option.short {
            if !global {
                errors.push(SchemaError::ScopedShortAlias {
                    scope: scope.to_string(),
                    name: name.to_string(),
                });
                return errors;
            }
            if !shorts.insert(short.to_ascii_lowercase()) {
                errors.push(SchemaError::DuplicateShortAlias(short.clone()));
                return errors;
            }
        }

        if option.option_type == OptionType::Enum && option.allowed_values.is_empty() {
            errors.push(SchemaError::MissingAllowedValues(name.to_string()));
            return errors;
        }

        if let Some(default) = &option.default {
            if !matches!(convert(option, default), Conversion::Value(_)) {
                errors.push(SchemaError::InvalidDefault {
                    option: name.to_string(),
                    default: default.clone(),
                });
                return errors;
            }
        }
    }

    errors
}
