//! The built-in grammar of the `wuctl` update tool.
//!
//! [`SchemaRegistry::update_tool`] declares every command, option and
//! validation rule the tool accepts. The typed readers at the bottom turn
//! the enum options a dispatcher branches on into Rust enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SchemaRegistry;
use crate::parsed::ParseResult;
use crate::rules::{OptionRef, PatternKind, RuleKind, Trigger, ValidationRule};
use crate::types::{CommandSchema, OptionSchema};

/// Program name of the update tool.
pub const PROGRAM_NAME: &str = "wuctl";
/// Program version of the update tool.
pub const PROGRAM_VERSION: &str = "1.0.0";
/// Log file used when `--log-path` is not given.
pub const DEFAULT_LOG_PATH: &str = r"%SystemDrive%\Wuctl\Logs\wuctl.log";

const SAMPLE_SERVICE_ID: &str = "7971f918-a847-4430-9279-4a52d1efe18d";

impl SchemaRegistry {
    /// Builds the update tool's registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use wuctl_grammar::SchemaRegistry;
    ///
    /// let registry = SchemaRegistry::update_tool();
    /// assert_eq!(registry.command_names()[..3], ["search", "download", "install"]);
    /// assert!(registry.requires_admin("install", None));
    /// assert!(!registry.requires_admin("services", Some("list")));
    /// ```
    pub fn update_tool() -> Self {
        let mut registry = SchemaRegistry::new(PROGRAM_NAME, PROGRAM_VERSION)
            .with_description("Windows Update Agent CLI Tool");
        registry.global_options = global_options();
        registry.commands = commands();
        registry.rules = rules();
        registry
    }
}

fn global_options() -> Vec<OptionSchema> {
    vec![
        OptionSchema::flag("help")
            .with_short("h")
            .with_description("Show help information")
            .with_default("false"),
        OptionSchema::flag("version")
            .with_short("v")
            .with_description("Show version information")
            .with_default("false"),
        OptionSchema::string("log-path")
            .with_description("Path to log file")
            .with_default(DEFAULT_LOG_PATH)
            .with_example(r"--log-path C:\Logs\wu.log"),
        OptionSchema::enumeration("log-level", &["Trace", "Debug", "Info", "Warn", "Error"])
            .with_description("Minimum log level")
            .with_default("Info"),
        OptionSchema::int("timeout-seconds")
            .with_description("Operation timeout in seconds")
            .with_default("300")
            .with_range(1, 3600),
        OptionSchema::enumeration("server", &["windowsupdate", "microsoftupdate"])
            .with_description("Windows Update server to use")
            .with_default("windowsupdate")
            .forbidden_for(&["help", "version"]),
        OptionSchema::guid("service-id")
            .with_description("Specific service ID (GUID) to target")
            .only_for(&["search", "download", "install"])
            .with_example(&format!("--service-id {SAMPLE_SERVICE_ID}")),
        OptionSchema::flag("accept-eulas")
            .with_description("Automatically accept EULAs for updates")
            .with_default("false")
            .only_for(&["install"]),
        OptionSchema::flag("whatif")
            .with_description("Show what would happen without making changes")
            .with_default("false")
            .only_for(&["download", "install", "uninstall"]),
        OptionSchema::flag("noreboot")
            .with_description("Suppress reboot prompt; only show reboot-required message")
            .with_default("false")
            .only_for(&["install", "uninstall"]),
    ]
}

fn criteria() -> OptionSchema {
    OptionSchema::string("criteria")
        .with_description("Windows Update search criteria")
        .with_default("IsInstalled=0")
}

fn output() -> OptionSchema {
    OptionSchema::enumeration("output", &["table", "json", "json-full"])
        .with_description("Output format")
        .with_default("table")
}

fn select(description: &str) -> OptionSchema {
    OptionSchema::string("select").with_description(description)
}

fn flag(name: &str, description: &str) -> OptionSchema {
    OptionSchema::flag(name)
        .with_description(description)
        .with_default("false")
}

fn commands() -> Vec<CommandSchema> {
    let search = CommandSchema::new("search", "Search for updates by criteria and show results")
        .with_option(criteria().with_example("--criteria \"IsInstalled=0 AND Type='Software'\""))
        .with_option(flag("include-hidden", "Include hidden updates in search results"))
        .with_option(
            OptionSchema::int("max-results")
                .with_description("Maximum number of results to return")
                .with_default("50")
                .with_range(1, 500),
        )
        .with_option(output())
        .with_example("search")
        .with_example("search --criteria \"IsInstalled=0 AND Type='Software'\"")
        .with_example("search --include-hidden --max-results 100")
        .with_example("search --output json --server microsoftupdate");

    let download = CommandSchema::new("download", "Download selected updates")
        .requiring_admin()
        .with_option(flag("all", "Select all updates from search results"))
        .with_option(
            select("Selection expression: kb:KBxxxx,... or index:1,2,...")
                .with_example("--select kb:KB5001234,KB5001235"),
        )
        .with_option(criteria())
        .with_option(flag("force", "Force re-download even if already cached"))
        .with_example("download --all")
        .with_example("download --select kb:KB5001234")
        .with_example("download --select kb:KB5001234,KB5001235 --force")
        .with_example("download --criteria \"IsInstalled=0\" --select index:1,2,3")
        .with_example("download --all --whatif");

    let install = CommandSchema::new("install", "Install selected updates")
        .requiring_admin()
        .with_option(flag("all", "Select all updates from search results"))
        .with_option(
            select("Selection expression: kb:KBxxxx,... or index:1,2,...")
                .with_example("--select kb:KB5001234,KB5001235"),
        )
        .with_option(criteria())
        .with_option(flag("force", "Force reinstallation"))
        .with_example("install --all --accept-eulas")
        .with_example("install --select kb:KB5001234 --accept-eulas")
        .with_example("install --all --accept-eulas --noreboot")
        .with_example("install --select index:1,2 --whatif");

    let uninstall = CommandSchema::new("uninstall", "Uninstall selected updates")
        .requiring_admin()
        .with_option(
            select("Selection expression: kb:KBxxxx,...")
                .required()
                .with_example("--select kb:KB5001234"),
        )
        .with_option(flag("force", "Force uninstallation"))
        .with_example("uninstall --select kb:KB5001234")
        .with_example("uninstall --select kb:KB5001234 --noreboot")
        .with_example("uninstall --select kb:KB5001234 --whatif");

    let history = CommandSchema::new("history", "Query update installation history")
        .with_option(
            OptionSchema::int("start-index")
                .with_description("Starting index in history")
                .with_default("0")
                .with_range(0, i64::from(i32::MAX)),
        )
        .with_option(
            OptionSchema::int("count")
                .with_description("Number of history entries to retrieve (0 or omit for all)")
                .with_default("0")
                .with_range(0, i64::from(i32::MAX)),
        )
        .with_option(output())
        .with_example("history")
        .with_example("history --count 100")
        .with_example("history --start-index 50 --count 25")
        .with_example("history --output json-full");

    let remove_example = format!("services remove --service-id {SAMPLE_SERVICE_ID}");
    let services = CommandSchema::new("services", "List or remove update services")
        .with_subcommand(
            CommandSchema::new("list", "List registered update services")
                .with_example("services list"),
        )
        .with_subcommand(
            CommandSchema::new("remove", "Remove an update service")
                .requiring_admin()
                .with_option(
                    OptionSchema::guid("service-id")
                        .with_description("Service ID (GUID) to remove")
                        .required(),
                )
                .with_example(&remove_example),
        )
        .with_example("services list")
        .with_example(&remove_example);

    vec![
        search,
        download,
        install,
        uninstall,
        history,
        services,
        CommandSchema::new("status", "Show system reboot-required status").with_example("status"),
        CommandSchema::new("help", "Show help information")
            .with_example("help")
            .with_example("help search")
            .with_example("help install"),
        CommandSchema::new("version", "Show version information").with_example("version"),
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn only_for(id: &str, option: &str, trigger: Trigger, commands: &[&str]) -> ValidationRule {
    ValidationRule::new(
        id,
        &format!("--{option} is only allowed for {}", commands.join(", ")),
        RuleKind::AllowedForCommands {
            option: option.to_string(),
            trigger,
            commands: strings(commands),
        },
    )
}

fn range(id: &str, description: &str, option: &str, min: i64, max: Option<i64>) -> ValidationRule {
    ValidationRule::new(
        id,
        description,
        RuleKind::NumericRange {
            option: option.to_string(),
            min: Some(min),
            max,
            note: None,
        },
    )
}

fn pattern(id: &str, description: &str, option: &str, pattern: PatternKind) -> ValidationRule {
    ValidationRule::new(
        id,
        description,
        RuleKind::Pattern {
            option: option.to_string(),
            pattern,
        },
    )
}

fn rules() -> Vec<ValidationRule> {
    let mutating = ["download", "install", "uninstall"];

    vec![
        ValidationRule::new(
            "command-required",
            "Exactly one command must be provided",
            RuleKind::CommandPresent,
        ),
        ValidationRule::new(
            "command-known",
            "Command must be a recognized command",
            RuleKind::CommandRecognized,
        ),
        ValidationRule::new(
            "service-id-server",
            "--service-id is only allowed with --server microsoftupdate",
            RuleKind::RequiresOptionValue {
                option: "service-id".into(),
                requires: "server".into(),
                value: "microsoftupdate".into(),
            },
        ),
        only_for("whatif-commands", "whatif", Trigger::Enabled, &mutating),
        ValidationRule::new(
            "all-or-select",
            "download and install commands require --all or --select",
            RuleKind::OneOfPresent {
                commands: strings(&["download", "install"]),
                options: vec![
                    OptionRef::enabled("all"),
                    OptionRef::present("select").with_hint("expression"),
                ],
            },
        ),
        ValidationRule::new(
            "uninstall-select",
            "uninstall command requires --select",
            RuleKind::RequiredIf {
                command: "uninstall".into(),
                subcommand: None,
                option: "select".into(),
                usage: Some("kb:KBxxxx".into()),
            },
        ),
        pattern(
            "select-format",
            "--select must be in format 'kb:KBxxxx,...' or 'index:1,2,...'",
            "select",
            PatternKind::SelectionTag,
        ),
        only_for("force-commands", "force", Trigger::Enabled, &mutating),
        only_for("accept-eulas-command", "accept-eulas", Trigger::Enabled, &["install"]),
        only_for("noreboot-commands", "noreboot", Trigger::Enabled, &["install", "uninstall"]),
        only_for("output-commands", "output", Trigger::Present, &["search", "history"]),
        only_for("include-hidden-command", "include-hidden", Trigger::Enabled, &["search"]),
        only_for("max-results-command", "max-results", Trigger::Present, &["search"]),
        range(
            "timeout-range",
            "--timeout-seconds must be between 1 and 3600",
            "timeout-seconds",
            1,
            Some(3600),
        ),
        range(
            "max-results-range",
            "--max-results must be between 1 and 500",
            "max-results",
            1,
            Some(500),
        ),
        ValidationRule::new(
            "count-range",
            "--count must be between 0 and 2147483647 (0 means all entries)",
            RuleKind::NumericRange {
                option: "count".into(),
                min: Some(0),
                max: Some(i64::from(i32::MAX)),
                note: Some("use 0 for all entries".into()),
            },
        ),
        range(
            "start-index-range",
            "--start-index must be between 0 and 2147483647",
            "start-index",
            0,
            Some(i64::from(i32::MAX)),
        ),
        ValidationRule::new(
            "services-subcommand",
            "services command requires a subcommand (list or remove)",
            RuleKind::SubcommandRequired {
                command: "services".into(),
            },
        ),
        ValidationRule::new(
            "services-remove-service-id",
            "services remove requires --service-id",
            RuleKind::RequiredIf {
                command: "services".into(),
                subcommand: Some("remove".into()),
                option: "service-id".into(),
                usage: Some("<guid>".into()),
            },
        ),
        pattern(
            "service-id-guid",
            "--service-id must be a valid GUID",
            "service-id",
            PatternKind::Guid,
        ),
        pattern(
            "criteria-not-blank",
            "--criteria cannot be empty",
            "criteria",
            PatternKind::NonBlank,
        ),
    ]
}

/// Error returned when text names no variant of a typed option.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $option:literal, $kind:literal, default = $default:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Name of the option this value is read from.
            pub const OPTION: &'static str = $option;

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Reads the option from a validated result, falling back to the
            /// schema default and then to [`Default`].
            pub fn read(registry: &SchemaRegistry, parsed: &ParseResult) -> Self {
                parsed
                    .text(registry, Self::OPTION)
                    .and_then(|text| text.parse().ok())
                    .unwrap_or_default()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(UnknownVariant {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_enum! {
    /// Which update server the tool talks to.
    ServerMode, "server", "server mode", default = WindowsUpdate {
        WindowsUpdate => "windowsupdate",
        MicrosoftUpdate => "microsoftupdate",
    }
}

option_enum! {
    /// Result rendering requested with `--output`.
    OutputFormat, "output", "output format", default = Table {
        Table => "table",
        Json => "json",
        JsonFull => "json-full",
    }
}

option_enum! {
    /// Minimum log level requested with `--log-level`.
    LogLevel, "log-level", "log level", default = Info {
        Trace => "Trace",
        Debug => "Debug",
        Info => "Info",
        Warn => "Warn",
        Error => "Error",
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
