//! Declarative cross-option validation rules.
//!
//! Rules are data: a [`ValidationRule`] pairs an id with a [`RuleKind`]
//! carrying its parameters, so a registry's whole rule list can be
//! serialized and reloaded. Rules are evaluated in registry order, every
//! applicable rule runs and violations accumulate.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::SchemaRegistry;
use crate::error::ArgError;
use crate::parsed::ParseResult;
use crate::parser::{HELP_COMMAND, VERSION_COMMAND};
use crate::selection::SelectionTag;

/// When an option counts as "used" by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The option was supplied, whatever its value.
    Present,
    /// The option reads as `Flag(true)`, defaults included.
    Enabled,
}

impl Trigger {
    fn fires(self, registry: &SchemaRegistry, parsed: &ParseResult, option: &str) -> bool {
        match self {
            Trigger::Present => parsed.has(option),
            Trigger::Enabled => parsed.flag(registry, option),
        }
    }
}

/// An option taking part in a multi-option rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRef {
    pub option: String,
    pub trigger: Trigger,
    /// Value placeholder shown in messages, e.g. `expression`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl OptionRef {
    pub fn present(option: &str) -> Self {
        Self {
            option: option.to_string(),
            trigger: Trigger::Present,
            hint: None,
        }
    }

    pub fn enabled(option: &str) -> Self {
        Self {
            option: option.to_string(),
            trigger: Trigger::Enabled,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    fn fires(&self, registry: &SchemaRegistry, parsed: &ParseResult) -> bool {
        self.trigger.fires(registry, parsed, &self.option)
    }

    fn usage(&self) -> String {
        match &self.hint {
            Some(hint) => format!("--{} <{hint}>", self.option),
            None => format!("--{}", self.option),
        }
    }
}

/// Textual shape a supplied value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Non-blank and starting with a selection tag (`kb:` / `index:`).
    SelectionTag,
    /// A well-formed GUID.
    Guid,
    /// Not empty or whitespace-only.
    NonBlank,
}

/// The closed set of rule shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// A command must be given.
    CommandPresent,
    /// A given command must exist in the registry.
    CommandRecognized,
    /// When `option` is supplied, `requires` must read as `value`
    /// (defaults included, case-insensitive).
    RequiresOptionValue {
        option: String,
        requires: String,
        value: String,
    },
    /// When `option` fires, the command must be one of `commands`.
    AllowedForCommands {
        option: String,
        trigger: Trigger,
        commands: Vec<String>,
    },
    /// For `commands`, exactly one of `options` must fire.
    OneOfPresent {
        commands: Vec<String>,
        options: Vec<OptionRef>,
    },
    /// At most one of `options` may be supplied.
    MutuallyExclusive { options: Vec<String> },
    /// For `command` (and `subcommand`, if set), `option` must be supplied.
    RequiredIf {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subcommand: Option<String>,
        option: String,
        /// Value usage appended to the message, e.g. `<guid>`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<String>,
    },
    /// A supplied value must match `pattern`.
    Pattern { option: String, pattern: PatternKind },
    /// A supplied integer must lie within `[min, max]`.
    NumericRange {
        option: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
        /// Extra text appended to the message in parentheses.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// `command` needs one of its declared subcommands.
    SubcommandRequired { command: String },
}

/// A named validation rule.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::*;
///
/// let registry = SchemaRegistry::new("tool", "1.0.0")
///     .with_command(CommandSchema::new("run", "Run"))
///     .with_rule(ValidationRule::new(
///         "command-required",
///         "A command must be provided",
///         RuleKind::CommandPresent,
///     ));
///
/// let errors = validate(&registry, &ParseResult::new());
/// assert_eq!(errors[0].rule_id(), Some("command-required"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub id: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl ValidationRule {
    pub fn new(id: &str, description: &str, kind: RuleKind) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            kind,
        }
    }

    /// Returns `true` if the rule should run for this invocation.
    pub fn applies(&self, registry: &SchemaRegistry, parsed: &ParseResult) -> bool {
        match &self.kind {
            RuleKind::CommandPresent => true,
            RuleKind::CommandRecognized => parsed.command.is_some(),
            RuleKind::RequiresOptionValue { option, .. } => parsed.has(option),
            RuleKind::AllowedForCommands {
                option, trigger, ..
            } => trigger.fires(registry, parsed, option),
            RuleKind::OneOfPresent { commands, .. } => is_one_of(parsed, commands),
            RuleKind::MutuallyExclusive { .. } => true,
            RuleKind::RequiredIf {
                command,
                subcommand,
                ..
            } => {
                parsed.command_is(command)
                    && subcommand.as_deref().is_none_or(|sub| parsed.subcommand_is(sub))
            }
            RuleKind::Pattern { option, .. } => parsed.has(option),
            // Values that failed coercion already carry an error.
            RuleKind::NumericRange { option, .. } => {
                parsed.get(option).is_some_and(|v| v.as_int().is_some())
            }
            RuleKind::SubcommandRequired { command } => parsed.command_is(command),
        }
    }

    /// Checks an applicable rule, returning the violation message.
    pub fn check(&self, registry: &SchemaRegistry, parsed: &ParseResult) -> Option<String> {
        match &self.kind {
            RuleKind::CommandPresent => parsed.command.is_none().then(|| {
                "No command specified. Use --help to see available commands.".to_string()
            }),
            RuleKind::CommandRecognized => {
                let command = parsed.command.as_deref()?;
                if registry.find_command(command).is_some() {
                    return None;
                }
                Some(format!(
                    "Unknown command '{command}'. Valid commands: {}",
                    registry.command_names().join(", ")
                ))
            }
            RuleKind::RequiresOptionValue {
                option,
                requires,
                value,
            } => {
                let actual = parsed.text(registry, requires).unwrap_or_default();
                (!actual.eq_ignore_ascii_case(value)).then(|| {
                    format!("--{option} can only be used when --{requires} is '{value}'")
                })
            }
            RuleKind::AllowedForCommands {
                option, commands, ..
            } => {
                if is_one_of(parsed, commands) {
                    return None;
                }
                Some(match commands.as_slice() {
                    [only] => format!("--{option} is only allowed for the {only} command"),
                    _ => format!("--{option} is only allowed for: {}", commands.join(", ")),
                })
            }
            RuleKind::OneOfPresent { options, .. } => {
                let active: Vec<&OptionRef> =
                    options.iter().filter(|o| o.fires(registry, parsed)).collect();
                match active.len() {
                    1 => None,
                    0 => {
                        let usages: Vec<String> = options.iter().map(OptionRef::usage).collect();
                        Some(format!(
                            "{} requires either {}",
                            parsed.command.as_deref().unwrap_or_default(),
                            usages.join(" or ")
                        ))
                    }
                    _ => {
                        let names: Vec<String> =
                            active.iter().map(|o| format!("--{}", o.option)).collect();
                        Some(format!("Cannot use both {}; choose one", names.join(" and ")))
                    }
                }
            }
            RuleKind::MutuallyExclusive { options } => {
                let supplied: Vec<String> = options
                    .iter()
                    .filter(|o| parsed.has(o))
                    .map(|o| format!("--{o}"))
                    .collect();
                (supplied.len() > 1)
                    .then(|| format!("{} cannot be used together", supplied.join(", ")))
            }
            RuleKind::RequiredIf {
                command,
                subcommand,
                option,
                usage,
            } => {
                if parsed.has(option) {
                    return None;
                }
                let scope = match subcommand {
                    Some(sub) => format!("{command} {sub}"),
                    None => command.clone(),
                };
                Some(match usage {
                    Some(usage) => format!("{scope} requires --{option} {usage}"),
                    None => format!("{scope} requires --{option}"),
                })
            }
            RuleKind::Pattern { option, pattern } => check_pattern(parsed, option, *pattern),
            RuleKind::NumericRange {
                option,
                min,
                max,
                note,
            } => {
                let value = parsed.get(option).and_then(|v| v.as_int())?;
                let below = min.is_some_and(|min| value < min);
                let above = max.is_some_and(|max| value > max);
                if !below && !above {
                    return None;
                }
                let bounds = match (min, max) {
                    (Some(min), Some(max)) => format!("must be between {min} and {max}"),
                    (Some(min), None) => format!("must be >= {min}"),
                    (None, Some(max)) => format!("must be <= {max}"),
                    (None, None) => return None,
                };
                Some(match note {
                    Some(note) => format!("--{option} {bounds} ({note})"),
                    None => format!("--{option} {bounds}"),
                })
            }
            RuleKind::SubcommandRequired { command } => {
                let valid = registry
                    .find_command(command)
                    .map(|c| c.subcommand_names())
                    .unwrap_or_default();
                match parsed.subcommand.as_deref() {
                    None => Some(format!(
                        "{command} command requires a subcommand: {}",
                        valid.join(" or ")
                    )),
                    Some(sub) if !valid.iter().any(|v| v.eq_ignore_ascii_case(sub)) => {
                        Some(format!(
                            "Invalid {command} subcommand '{sub}'. Valid: {}",
                            valid.join(", ")
                        ))
                    }
                    Some(_) => None,
                }
            }
        }
    }

    /// Runs the rule, returning the violation as an [`ArgError`].
    pub fn evaluate(&self, registry: &SchemaRegistry, parsed: &ParseResult) -> Option<ArgError> {
        if !self.applies(registry, parsed) {
            trace!(rule = %self.id, "Rule not applicable");
            return None;
        }
        let message = self.check(registry, parsed)?;
        debug!(rule = %self.id, message = %message, "Rule violated");
        Some(ArgError::Rule {
            rule: self.id.clone(),
            message,
        })
    }
}

fn is_one_of(parsed: &ParseResult, commands: &[String]) -> bool {
    commands.iter().any(|c| parsed.command_is(c))
}

fn check_pattern(parsed: &ParseResult, option: &str, pattern: PatternKind) -> Option<String> {
    let value = parsed.get(option)?;
    match pattern {
        PatternKind::SelectionTag => {
            let text = value.to_string();
            if text.trim().is_empty() {
                Some(format!("--{option} cannot be empty"))
            } else if SelectionTag::strip(&text).is_none() {
                Some(format!(
                    "--{option} must start with 'kb:' or 'index:' \
                     (e.g., --{option} kb:KB5001234 or --{option} index:1,2,3)"
                ))
            } else {
                None
            }
        }
        PatternKind::Guid => {
            if value.as_identifier().is_some() {
                return None;
            }
            let text = value.to_string();
            Uuid::parse_str(text.trim())
                .is_err()
                .then(|| format!("--{option} must be a valid GUID (got: '{text}')"))
        }
        PatternKind::NonBlank => value
            .to_string()
            .trim()
            .is_empty()
            .then(|| format!("--{option} cannot be empty")),
    }
}

/// Evaluates every registry rule against a coerced parse result.
///
/// Returns nothing for help and version requests. Otherwise every
/// applicable rule runs, in registry order, and all violations are
/// returned. Parse and coercion errors already in `parsed` are not
/// included; see [`evaluate`](crate::evaluate) for the combined list.
pub fn validate(registry: &SchemaRegistry, parsed: &ParseResult) -> Vec<ArgError> {
    let informational = parsed.command_is(HELP_COMMAND)
        || parsed.command_is(VERSION_COMMAND)
        || parsed.flag(registry, HELP_COMMAND)
        || parsed.flag(registry, VERSION_COMMAND);
    if informational {
        debug!("Help or version requested, skipping rules");
        return Vec::new();
    }

    registry
        .rules
        .iter()
        .filter_map(|rule| rule.evaluate(registry, parsed))
        .collect()
}
