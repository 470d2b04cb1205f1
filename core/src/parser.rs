//! Argument tokenizer.
//!
//! One left-to-right pass with a single token of lookahead and no
//! backtracking. Whether an option consumes the following token is decided
//! by its schema: flags never do, value-taking options take the next token
//! unless it looks like another option, and unknown options are treated as
//! flags.
//!
//! No defaults are written here. An option missing from the result means
//! "not supplied"; defaults are resolved when a value is read.

use tracing::{debug, trace};

use crate::SchemaRegistry;
use crate::error::ArgError;
use crate::parsed::ParseResult;
use crate::value::OptionValue;

/// Command produced by a leading `-h`/`--help` or by an empty invocation.
pub const HELP_COMMAND: &str = "help";
/// Command produced by a leading `-v`/`--version`.
pub const VERSION_COMMAND: &str = "version";

/// Parses raw argument tokens (without the program name).
///
/// Never fails: problems are recorded in [`ParseResult::errors`].
///
/// # Examples
///
/// ```
/// use wuctl_grammar::{OptionValue, SchemaRegistry, parse};
///
/// let registry = SchemaRegistry::update_tool();
/// let result = parse(&registry, &["services", "remove", "--service-id", "abc"]);
///
/// assert_eq!(result.command.as_deref(), Some("services"));
/// assert_eq!(result.subcommand.as_deref(), Some("remove"));
/// assert_eq!(result.get("service-id"), Some(&OptionValue::Raw("abc".into())));
/// ```
pub fn parse<S: AsRef<str>>(registry: &SchemaRegistry, tokens: &[S]) -> ParseResult {
    ArgParser::new(registry, tokens).run()
}

struct ArgParser<'a, S> {
    registry: &'a SchemaRegistry,
    tokens: &'a [S],
    pos: usize,
    result: ParseResult,
}

impl<'a, S: AsRef<str>> ArgParser<'a, S> {
    fn new(registry: &'a SchemaRegistry, tokens: &'a [S]) -> Self {
        Self {
            registry,
            tokens,
            pos: 0,
            result: ParseResult::new(),
        }
    }

    fn run(mut self) -> ParseResult {
        if self.tokens.is_empty() {
            debug!("Empty invocation, defaulting to help");
            self.result.command = Some(HELP_COMMAND.to_string());
            return self.result;
        }

        while let Some(token) = self.peek() {
            trace!(position = self.pos, token, "Parsing token");

            if self.result.command.is_none() {
                if token == "-h" || token == "--help" {
                    return self.short_circuit(HELP_COMMAND);
                }
                if token == "-v" || token == "--version" {
                    return self.short_circuit(VERSION_COMMAND);
                }
            }

            self.pos += 1;
            if token.starts_with('-') {
                self.parse_option(token);
            } else if self.result.command.is_none() {
                self.parse_command(token);
            } else {
                self.result.positional.push(token.to_string());
            }
        }

        self.result
    }

    fn peek(&self) -> Option<&'a str> {
        let tokens = self.tokens;
        tokens.get(self.pos).map(AsRef::as_ref)
    }

    fn short_circuit(mut self, command: &str) -> ParseResult {
        debug!(command, "Help/version requested before any command");
        self.result.command = Some(command.to_string());
        self.result.set(command, OptionValue::Flag(true));
        self.result
    }

    fn parse_command(&mut self, token: &str) {
        let command = token.to_lowercase();
        debug!(command = %command, "Recognized command");

        if let Some(next) = self.peek().filter(|next| !next.starts_with('-')) {
            let is_subcommand = self
                .registry
                .find_command(&command)
                .is_some_and(|cmd| cmd.find_subcommand(next).is_some());
            if is_subcommand {
                debug!(subcommand = next, "Recognized subcommand");
                self.result.subcommand = Some(next.to_lowercase());
                self.pos += 1;
            }
        }

        self.result.command = Some(command);
    }

    fn parse_option(&mut self, token: &str) {
        let (name, value) = match token.find('=') {
            Some(idx) if idx > 0 => (
                token[..idx].trim_start_matches('-'),
                token[idx + 1..].to_string(),
            ),
            _ => {
                let name = token.trim_start_matches('-');
                match self.take_value(name) {
                    Some(value) => (name, value),
                    None => return,
                }
            }
        };

        let registry = self.registry;
        let canonical = registry.canonical_option_name(name);
        trace!(option = canonical, value = %value, "Stored option");
        self.result.set(canonical, OptionValue::Raw(value));
    }

    /// Decides the value of a `--name` token written without `=`.
    fn take_value(&mut self, name: &str) -> Option<String> {
        let registry = self.registry;
        let canonical = registry.canonical_option_name(name);
        let schema = registry.resolve_option(
            self.result.command.as_deref(),
            self.result.subcommand.as_deref(),
            canonical,
        );

        let Some(schema) = schema else {
            debug!(option = name, "Unknown option, treating as flag");
            return Some("true".to_string());
        };
        if schema.option_type.is_flag() {
            return Some("true".to_string());
        }

        match self.peek() {
            Some(next) if !next.starts_with('-') => {
                self.pos += 1;
                Some(next.to_string())
            }
            _ => {
                debug!(option = name, "Option is missing its value");
                self.result.errors.push(ArgError::MissingValue {
                    option: name.to_string(),
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CommandSchema, OptionSchema};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new("tool", "1.0.0")
            .with_global_option(OptionSchema::flag("help").with_short("h"))
            .with_global_option(OptionSchema::flag("version").with_short("v"))
            .with_global_option(OptionSchema::int("timeout").with_short("t"))
            .with_global_option(OptionSchema::flag("whatif"))
            .with_command(
                CommandSchema::new("search", "Search")
                    .with_option(OptionSchema::string("criteria"))
                    .with_option(OptionSchema::flag("include-hidden")),
            )
            .with_command(
                CommandSchema::new("services", "Services")
                    .with_subcommand(CommandSchema::new("list", "List")),
            )
    }

    fn raw(s: &str) -> OptionValue {
        OptionValue::Raw(s.to_string())
    }

    #[test]
    fn test_empty_invocation_is_help() {
        let tokens: [&str; 0] = [];
        let result = parse(&registry(), &tokens);
        assert_eq!(result.command.as_deref(), Some("help"));
        assert!(result.options.is_empty());
    }

    #[test]
    fn test_help_short_circuits_before_command() {
        let result = parse(&registry(), &["--help", "--timeout"]);
        assert_eq!(result.command.as_deref(), Some("help"));
        assert_eq!(result.get("help"), Some(&OptionValue::Flag(true)));
        assert!(result.errors.is_empty());

        let result = parse(&registry(), &["-v", "search"]);
        assert_eq!(result.command.as_deref(), Some("version"));
    }

    #[test]
    fn test_help_after_command_is_an_option() {
        let result = parse(&registry(), &["search", "-h"]);
        assert_eq!(result.command.as_deref(), Some("search"));
        assert_eq!(result.get("help"), Some(&raw("true")));
    }

    #[test]
    fn test_flag_never_consumes_next_token() {
        let result = parse(&registry(), &["search", "--include-hidden", "extra"]);
        assert_eq!(result.get("include-hidden"), Some(&raw("true")));
        assert_eq!(result.positional, vec!["extra"]);
    }

    #[test]
    fn test_unknown_option_is_flag_and_leaves_next_token() {
        let result = parse(&registry(), &["search", "--bogus", "value"]);
        assert_eq!(result.get("bogus"), Some(&raw("true")));
        assert_eq!(result.positional, vec!["value"]);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_value_option_consumes_next_token() {
        let result = parse(&registry(), &["search", "--criteria", "IsInstalled=1"]);
        assert_eq!(result.get("criteria"), Some(&raw("IsInstalled=1")));
        assert!(result.positional.is_empty());
    }

    #[test]
    fn test_missing_value_is_parse_error_and_option_dropped() {
        let result = parse(&registry(), &["search", "--criteria", "--include-hidden"]);
        assert!(!result.has("criteria"));
        assert!(result.has("include-hidden"));
        assert_eq!(
            result.errors,
            vec![ArgError::MissingValue {
                option: "criteria".into()
            }]
        );

        let result = parse(&registry(), &["search", "--timeout"]);
        assert_eq!(result.errors[0].to_string(), "Option --timeout requires a value");
    }

    #[test]
    fn test_embedded_equals_splits_at_first_equals() {
        let result = parse(&registry(), &["search", "--criteria=IsInstalled=0", "next"]);
        assert_eq!(result.get("criteria"), Some(&raw("IsInstalled=0")));
        assert_eq!(result.positional, vec!["next"]);

        let result = parse(&registry(), &["search", "--criteria="]);
        assert_eq!(result.get("criteria"), Some(&raw("")));
    }

    #[test]
    fn test_short_alias_normalized_to_long_name() {
        let short = parse(&registry(), &["search", "-t", "30"]);
        let long = parse(&registry(), &["search", "--timeout", "30"]);
        assert_eq!(short.get("timeout"), Some(&raw("30")));
        assert_eq!(short.options, long.options);

        let upper = parse(&registry(), &["search", "-T=30"]);
        assert_eq!(upper.get("timeout"), Some(&raw("30")));
    }

    #[test]
    fn test_repeated_option_overwrites() {
        let result = parse(&registry(), &["search", "--criteria", "a", "--CRITERIA", "b"]);
        assert_eq!(result.options.len(), 1);
        assert_eq!(result.get("criteria"), Some(&raw("b")));
    }

    #[test]
    fn test_command_lowercased_and_subcommand_recognized() {
        let result = parse(&registry(), &["SERVICES", "List", "more"]);
        assert_eq!(result.command.as_deref(), Some("services"));
        assert_eq!(result.subcommand.as_deref(), Some("list"));
        assert_eq!(result.positional, vec!["more"]);
    }

    #[test]
    fn test_unmatched_subcommand_becomes_positional() {
        let result = parse(&registry(), &["services", "purge"]);
        assert_eq!(result.subcommand, None);
        assert_eq!(result.positional, vec!["purge"]);

        let result = parse(&registry(), &["search", "list"]);
        assert_eq!(result.subcommand, None);
    }

    #[test]
    fn test_options_before_command_are_kept() {
        let result = parse(&registry(), &["--whatif", "search"]);
        assert_eq!(result.command.as_deref(), Some("search"));
        assert_eq!(result.get("whatif"), Some(&raw("true")));
    }
}
