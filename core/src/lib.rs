//! Schema-driven command-line grammar engine.
//!
//! This crate turns raw argument tokens into a typed, validated result
//! against an explicit grammar:
//!
//! - [`SchemaRegistry`]: the immutable grammar of global options,
//!   [`CommandSchema`]s with their [`OptionSchema`]s, and ordered
//!   [`ValidationRule`]s.
//! - [`parse`]: a single-pass tokenizer producing a [`ParseResult`] of raw
//!   values. Whether an option consumes the next token is decided by its
//!   schema.
//! - [`coerce`]: converts raw values to typed [`OptionValue`]s.
//! - [`validate`]: runs every applicable cross-option rule.
//! - [`SelectionSpec`]: the `kb:` / `index:` selection sub-grammar.
//!
//! [`evaluate`] runs the whole pipeline and returns every problem at once
//! as [`ArgError`]s, parse and coercion errors first. Registries can be
//! built in code ([`SchemaRegistry::update_tool`] is the built-in one) or
//! loaded from JSON/YAML and checked with [`validate_registry`].
//!
//! # Example
//!
//! ```
//! use wuctl_grammar::*;
//!
//! let registry = SchemaRegistry::update_tool();
//!
//! let ok = evaluate(&registry, &["download", "--all", "--whatif"]);
//! assert!(ok.is_valid());
//! assert!(ok.args.flag(&registry, "whatif"));
//!
//! let bad = evaluate(&registry, &["uninstall"]);
//! assert_eq!(bad.errors[0].to_string(), "uninstall requires --select kb:KBxxxx");
//! ```

mod builtin;
mod coerce;
mod error;
mod parsed;
mod parser;
mod registry;
mod rules;
mod selection;
mod types;
mod validate;
mod value;

use serde::Serialize;
use tracing::debug;

pub use builtin::{
    DEFAULT_LOG_PATH, LogLevel, OutputFormat, PROGRAM_NAME, PROGRAM_VERSION, ServerMode,
    UnknownVariant,
};
pub use coerce::coerce;
pub use error::{ArgError, ErrorKind, RegistryError, Result, format_errors};
pub use parsed::{OptionMap, ParseResult};
pub use parser::{HELP_COMMAND, VERSION_COMMAND, parse};
pub use registry::{REGISTRY_FORMAT_VERSION, SchemaRegistry};
pub use rules::{OptionRef, PatternKind, RuleKind, Trigger, ValidationRule, validate};
pub use selection::{SelectionError, SelectionSpec, SelectionTag};
pub use types::*;
pub use validate::{SchemaError, validate_registry};
pub use value::OptionValue;

/// Outcome of running the full pipeline on one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// The coerced parse result.
    pub args: ParseResult,
    /// Parse and coercion errors followed by rule violations.
    #[serde(serialize_with = "parsed::serialize_messages")]
    pub errors: Vec<ArgError>,
}

impl Evaluation {
    /// Returns `true` if no error of any kind was found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Renders the errors for display; see [`format_errors`].
    pub fn error_report(&self) -> Option<String> {
        format_errors(&self.errors)
    }
}

/// Parses, coerces and validates `tokens` (without the program name).
pub fn evaluate<S: AsRef<str>>(registry: &SchemaRegistry, tokens: &[S]) -> Evaluation {
    let mut args = parse(registry, tokens);
    coerce(registry, &mut args);

    let mut errors = args.errors.clone();
    errors.extend(validate(registry, &args));
    debug!(
        command = args.command.as_deref().unwrap_or_default(),
        errors = errors.len(),
        "Evaluated invocation"
    );

    Evaluation { args, errors }
}
