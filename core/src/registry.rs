//! The schema registry: every command, option and rule in one immutable
//! value.
//!
//! A registry is built once and passed by reference into
//! [`parse`](crate::parse), [`coerce`](crate::coerce) and
//! [`validate`](crate::validate). It holds no interior mutability, so it can
//! be shared across threads freely. Several registries may coexist, which is
//! how tests exercise custom grammars.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::ValidationRule;
use crate::types::{CommandSchema, OptionSchema};
use crate::validate::validate_registry;

/// Version of the serialized registry format (semver).
pub const REGISTRY_FORMAT_VERSION: &str = "1.0.0";

/// Immutable definition of a command-line grammar.
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{CommandSchema, OptionSchema, SchemaRegistry};
///
/// let registry = SchemaRegistry::new("tool", "1.0.0")
///     .with_global_option(OptionSchema::flag("help").with_short("h"))
///     .with_command(
///         CommandSchema::new("search", "Search for updates")
///             .with_option(OptionSchema::string("criteria")),
///     );
///
/// assert!(registry.find_command("SEARCH").is_some());
/// assert_eq!(registry.canonical_option_name("H"), "help");
/// assert!(registry.find_command_option("search", "criteria").is_some());
/// assert!(registry.find_command_option("search", "help").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    /// Registry format version (populated from [`REGISTRY_FORMAT_VERSION`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Program name.
    pub program: String,
    /// Program version.
    pub version: String,
    /// One-line program description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Options accepted before or after any command.
    #[serde(default)]
    pub global_options: Vec<OptionSchema>,
    /// Top-level commands.
    #[serde(default)]
    pub commands: Vec<CommandSchema>,
    /// Validation rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<ValidationRule>,
}

impl SchemaRegistry {
    /// Creates an empty registry for `program`.
    pub fn new(program: &str, version: &str) -> Self {
        Self {
            schema_version: Some(REGISTRY_FORMAT_VERSION.to_string()),
            program: program.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds a global option.
    pub fn with_global_option(mut self, option: OptionSchema) -> Self {
        self.global_options.push(option);
        self
    }

    /// Adds a command.
    pub fn with_command(mut self, command: CommandSchema) -> Self {
        self.commands.push(command);
        self
    }

    /// Appends a validation rule.
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Finds a command by name, ignoring case.
    pub fn find_command(&self, name: &str) -> Option<&CommandSchema> {
        self.commands
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Finds a global option by long name or short alias, ignoring case.
    pub fn find_global_option(&self, name_or_short: &str) -> Option<&OptionSchema> {
        self.global_options
            .iter()
            .find(|o| o.matches(name_or_short))
    }

    /// Finds an option owned by `command`.
    pub fn find_command_option(&self, command: &str, name: &str) -> Option<&OptionSchema> {
        self.find_command(command)?.find_option(name)
    }

    /// Finds an option owned by `command`'s subcommand `subcommand`.
    pub fn find_subcommand_option(
        &self,
        command: &str,
        subcommand: &str,
        name: &str,
    ) -> Option<&OptionSchema> {
        self.find_command(command)?
            .find_subcommand(subcommand)?
            .find_option(name)
    }

    /// Resolves an option for an invocation, narrowest scope first:
    /// subcommand, then command, then global.
    pub fn resolve_option(
        &self,
        command: Option<&str>,
        subcommand: Option<&str>,
        name: &str,
    ) -> Option<&OptionSchema> {
        let scoped = command.and_then(|cmd| {
            subcommand
                .and_then(|sub| self.find_subcommand_option(cmd, sub, name))
                .or_else(|| self.find_command_option(cmd, name))
        });
        scoped.or_else(|| self.find_global_option(name))
    }

    /// Maps a global short alias to its canonical long name.
    ///
    /// Only the global short table is consulted; any other name is returned
    /// unchanged.
    pub fn canonical_option_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.global_options
            .iter()
            .find(|o| {
                o.short
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(name))
            })
            .map(|o| o.name.as_str())
            .unwrap_or(name)
    }

    /// Returns every option usable with `command`: global options that pass
    /// their allow/forbid lists, followed by the command's own options.
    pub fn options_applicable_to(&self, command: &str) -> Vec<&OptionSchema> {
        let mut options: Vec<&OptionSchema> = self
            .global_options
            .iter()
            .filter(|o| o.applies_to(command))
            .collect();
        if let Some(cmd) = self.find_command(command) {
            options.extend(cmd.options.iter());
        }
        options
    }

    /// Gets all command names in declaration order.
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns whether the invocation needs administrator privileges.
    ///
    /// A recognized subcommand decides on its own; otherwise the command's
    /// flag applies. Unknown commands never require elevation.
    pub fn requires_admin(&self, command: &str, subcommand: Option<&str>) -> bool {
        let Some(cmd) = self.find_command(command) else {
            return false;
        };
        match subcommand.and_then(|sub| cmd.find_subcommand(sub)) {
            Some(sub) => sub.requires_admin,
            None => cmd.requires_admin,
        }
    }

    /// Parses a registry from JSON and checks its structure.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError`](crate::RegistryError::JsonError) on malformed
    /// input or [`InvalidSchema`](crate::RegistryError::InvalidSchema) when
    /// the structure is inconsistent.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let registry: Self = serde_json::from_str(raw)?;
        registry.checked()
    }

    /// Parses a registry from YAML and checks its structure.
    ///
    /// # Errors
    ///
    /// Returns [`YamlError`](crate::RegistryError::YamlError) on malformed
    /// input or [`InvalidSchema`](crate::RegistryError::InvalidSchema) when
    /// the structure is inconsistent.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let registry: Self = serde_yaml::from_str(raw)?;
        registry.checked()
    }

    /// Loads a registry file. Files ending in `.yaml` or `.yml` are read as
    /// YAML, anything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be read, plus the errors of [`from_json_str`](Self::from_json_str) /
    /// [`from_yaml_str`](Self::from_yaml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let registry: Self = if is_yaml(path) {
            serde_yaml::from_reader(reader)?
        } else {
            serde_json::from_reader(reader)?
        };
        registry.checked()
    }

    /// Saves the registry, choosing the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot
    /// be written, or a serialization error.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(std::fs::File::create(path)?);
        if is_yaml(path) {
            serde_yaml::to_writer(writer, self)?;
        } else {
            serde_json::to_writer_pretty(writer, self)?;
        }
        Ok(())
    }

    fn checked(self) -> Result<Self> {
        match validate_registry(&self).into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(self),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryError;

    fn sample() -> SchemaRegistry {
        SchemaRegistry::new("tool", "1.0.0")
            .with_global_option(OptionSchema::flag("help").with_short("h"))
            .with_global_option(OptionSchema::guid("service-id").only_for(&["search"]))
            .with_global_option(OptionSchema::flag("accept-eulas").only_for(&["install"]))
            .with_command(
                CommandSchema::new("search", "Search")
                    .with_option(OptionSchema::string("criteria").with_default("IsInstalled=0")),
            )
            .with_command(
                CommandSchema::new("services", "Services")
                    .with_subcommand(CommandSchema::new("list", "List"))
                    .with_subcommand(
                        CommandSchema::new("remove", "Remove")
                            .requiring_admin()
                            .with_option(OptionSchema::guid("service-id").required()),
                    ),
            )
    }

    #[test]
    fn test_options_applicable_to_filters_globals() {
        let registry = sample();
        let names: Vec<&str> = registry
            .options_applicable_to("search")
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["help", "service-id", "criteria"]);

        let names: Vec<&str> = registry
            .options_applicable_to("services")
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["help"]);
    }

    #[test]
    fn test_resolve_option_prefers_narrowest_scope() {
        let registry = sample();
        let global = registry.resolve_option(Some("search"), None, "service-id").unwrap();
        assert!(!global.required);

        let scoped = registry
            .resolve_option(Some("services"), Some("remove"), "service-id")
            .unwrap();
        assert!(scoped.required);

        assert!(registry.resolve_option(None, None, "criteria").is_none());
    }

    #[test]
    fn test_requires_admin_uses_subcommand_flag() {
        let registry = sample();
        assert!(registry.requires_admin("services", Some("remove")));
        assert!(!registry.requires_admin("services", Some("list")));
        assert!(!registry.requires_admin("services", None));
        assert!(!registry.requires_admin("nope", None));
    }

    #[test]
    fn test_canonical_option_name_leaves_unknown_names() {
        let registry = sample();
        assert_eq!(registry.canonical_option_name("h"), "help");
        assert_eq!(registry.canonical_option_name("criteria"), "criteria");
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_registry_and_results_are_send_sync() {
        assert_send_sync::<SchemaRegistry>();
        assert_send_sync::<crate::ParseResult>();
        assert_send_sync::<crate::Evaluation>();
    }

    #[test]
    fn test_registry_shared_across_threads() {
        let registry = SchemaRegistry::update_tool();
        let (download, uninstall) = std::thread::scope(|s| {
            let download = s.spawn(|| crate::evaluate(&registry, &["download", "--all"]));
            let uninstall = s.spawn(|| crate::evaluate(&registry, &["uninstall"]));
            (download.join().unwrap(), uninstall.join().unwrap())
        });
        assert!(download.is_valid());
        assert_eq!(uninstall.errors[0].rule_id(), Some("uninstall-select"));
    }

    #[test]
    fn test_json_round_trip_and_invalid_schema() {
        let registry = sample();
        let json = serde_json::to_string(&registry).unwrap();
        assert_eq!(SchemaRegistry::from_json_str(&json).unwrap(), registry);

        let dup = registry.with_command(CommandSchema::new("search", "Again"));
        let json = serde_json::to_string(&dup).unwrap();
        assert!(matches!(
            SchemaRegistry::from_json_str(&json),
            Err(RegistryError::InvalidSchema(_))
        ));
    }
}
