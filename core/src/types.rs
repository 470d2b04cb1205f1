//! Schema type definitions for the command grammar.
//!
//! This module defines the declarative data the parser, coercer and rule
//! engine read from: what options exist, which scope owns them, what type
//! their values have, and which commands accept them. The types are
//! serializable with [`serde`] so a registry can be dumped for
//! documentation or loaded from a file.

use serde::{Deserialize, Serialize};

/// Declared value type of an option.
///
/// The type decides two things: whether the tokenizer consumes a value
/// token after the option name, and which conversion the coercer applies.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::OptionType;
///
/// assert!(OptionType::Flag.is_flag());
/// assert!(!OptionType::Int.is_flag());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Boolean switch; never takes a value token.
    Flag,
    /// Free text stored as-is.
    String,
    /// Base-10 integer.
    Int,
    /// One value out of a fixed, case-insensitive set.
    Enum,
    /// GUID text such as a service identifier.
    Guid,
}

impl OptionType {
    /// Returns `true` for [`OptionType::Flag`].
    pub fn is_flag(self) -> bool {
        self == OptionType::Flag
    }
}

/// Schema for a single option.
///
/// Names are stored without leading dashes (`"log-level"`, short `"h"`).
/// Use the typed constructors ([`flag`](OptionSchema::flag),
/// [`string`](OptionSchema::string), [`int`](OptionSchema::int),
/// [`enumeration`](OptionSchema::enumeration), [`guid`](OptionSchema::guid))
/// and chain builder methods.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{OptionSchema, OptionType};
///
/// let level = OptionSchema::enumeration("log-level", &["Trace", "Debug", "Info"])
///     .with_default("Info")
///     .with_description("Minimum log level");
/// assert_eq!(level.option_type, OptionType::Enum);
/// assert_eq!(level.usage(), "--log-level <Trace|Debug|Info>");
///
/// let help = OptionSchema::flag("help").with_short("h");
/// assert!(help.matches("H"));
/// assert_eq!(help.usage(), "-h|--help");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSchema {
    /// Canonical long name without dashes.
    pub name: String,
    /// Short alias without the dash (global options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared value type.
    #[serde(rename = "type")]
    pub option_type: OptionType,
    /// Default value in raw textual form, converted on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Allowed values for [`OptionType::Enum`], in canonical casing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// Inclusive lower bound for [`OptionType::Int`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Inclusive upper bound for [`OptionType::Int`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Commands this global option applies to (`None` = all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_commands: Option<Vec<String>>,
    /// Commands this global option never applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden_commands: Vec<String>,
    /// Whether the option must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Example invocation fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl OptionSchema {
    fn new(name: &str, option_type: OptionType) -> Self {
        Self {
            name: name.to_string(),
            short: None,
            description: None,
            option_type,
            default: None,
            allowed_values: Vec::new(),
            min: None,
            max: None,
            allowed_commands: None,
            forbidden_commands: Vec::new(),
            required: false,
            example: None,
        }
    }

    /// Creates a boolean switch.
    pub fn flag(name: &str) -> Self {
        Self::new(name, OptionType::Flag)
    }

    /// Creates a free-text option.
    pub fn string(name: &str) -> Self {
        Self::new(name, OptionType::String)
    }

    /// Creates an integer option.
    pub fn int(name: &str) -> Self {
        Self::new(name, OptionType::Int)
    }

    /// Creates an enumerated option with its allowed values in canonical
    /// casing.
    pub fn enumeration(name: &str, allowed: &[&str]) -> Self {
        let mut schema = Self::new(name, OptionType::Enum);
        schema.allowed_values = allowed.iter().map(|v| v.to_string()).collect();
        schema
    }

    /// Creates a GUID option.
    pub fn guid(name: &str) -> Self {
        Self::new(name, OptionType::Guid)
    }

    /// Adds a short alias (without the dash).
    pub fn with_short(mut self, short: &str) -> Self {
        self.short = Some(short.to_string());
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Sets the raw default value.
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Sets inclusive numeric bounds.
    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Restricts a global option to the given commands.
    pub fn only_for(mut self, commands: &[&str]) -> Self {
        self.allowed_commands = Some(commands.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Excludes a global option from the given commands.
    pub fn forbidden_for(mut self, commands: &[&str]) -> Self {
        self.forbidden_commands = commands.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Marks the option as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Adds an example fragment.
    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    /// Checks if `name` is this option's long name or short alias,
    /// ignoring case.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .short
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(name))
    }

    /// Returns `true` if this (global) option is available to `command`
    /// according to its allow and forbid lists.
    pub fn applies_to(&self, command: &str) -> bool {
        if self
            .forbidden_commands
            .iter()
            .any(|c| c.eq_ignore_ascii_case(command))
        {
            return false;
        }
        match &self.allowed_commands {
            Some(allowed) => allowed.iter().any(|c| c.eq_ignore_ascii_case(command)),
            None => true,
        }
    }

    /// Renders the usage fragment, e.g. `-h|--help` or
    /// `--timeout-seconds <int:1-3600>`.
    pub fn usage(&self) -> String {
        let short = self
            .short
            .as_deref()
            .map(|s| format!("-{s}|"))
            .unwrap_or_default();
        if self.option_type.is_flag() {
            format!("{short}--{}", self.name)
        } else {
            format!("{short}--{} <{}>", self.name, self.value_hint())
        }
    }

    fn value_hint(&self) -> String {
        if !self.allowed_values.is_empty() {
            return self.allowed_values.join("|");
        }
        match (self.option_type, self.min, self.max) {
            (OptionType::Int, Some(min), Some(max)) => format!("int:{min}-{max}"),
            (OptionType::Int, _, _) => "int".to_string(),
            (OptionType::String, _, _) => "string".to_string(),
            (OptionType::Guid, _, _) => "guid".to_string(),
            _ => "value".to_string(),
        }
    }
}

/// Schema for a command (verb).
///
/// Commands own their options and may declare one level of subcommands
/// (e.g. `services list`). Subcommands are themselves `CommandSchema`
/// values and may carry options of their own.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{CommandSchema, OptionSchema};
///
/// let services = CommandSchema::new("services", "List or remove update services")
///     .with_subcommand(CommandSchema::new("list", "List registered update services"))
///     .with_subcommand(
///         CommandSchema::new("remove", "Remove an update service")
///             .requiring_admin()
///             .with_option(OptionSchema::guid("service-id").required()),
///     );
///
/// assert_eq!(services.subcommand_names(), vec!["list", "remove"]);
/// assert!(services.find_subcommand("REMOVE").unwrap().requires_admin);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSchema {
    /// Command name (lower-case).
    pub name: String,
    /// Short description.
    pub description: String,
    /// Whether running the command needs administrator privileges.
    #[serde(default)]
    pub requires_admin: bool,
    /// Options owned by this command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSchema>,
    /// Nested subcommands (one level deep).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandSchema>,
    /// Example invocations, without the program name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl CommandSchema {
    /// Creates a command schema with the given name and description.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// Marks the command as requiring administrator privileges.
    pub fn requiring_admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    /// Adds an option owned by this command.
    pub fn with_option(mut self, option: OptionSchema) -> Self {
        self.options.push(option);
        self
    }

    /// Adds a subcommand.
    pub fn with_subcommand(mut self, sub: CommandSchema) -> Self {
        self.subcommands.push(sub);
        self
    }

    /// Adds an example invocation.
    pub fn with_example(mut self, example: &str) -> Self {
        self.examples.push(example.to_string());
        self
    }

    /// Finds one of this command's own options by long name.
    pub fn find_option(&self, name: &str) -> Option<&OptionSchema> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }

    /// Finds a subcommand by name, ignoring case.
    pub fn find_subcommand(&self, name: &str) -> Option<&CommandSchema> {
        self.subcommands
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Gets all subcommand names.
    pub fn subcommand_names(&self) -> Vec<&str> {
        self.subcommands.iter().map(|s| s.name.as_str()).collect()
    }
}
