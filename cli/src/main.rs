use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use wuctl_grammar::{SchemaRegistry, evaluate, format_errors};

/// Exit code used when `check` finds argument errors.
const EXIT_INVALID_ARGS: i32 = 2;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "wuctl-grammar")]
#[command(about = "Inspect and exercise the wuctl argument grammar", version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. debug, wuctl_grammar=trace).
    #[arg(long, default_value = "warn")]
    log_filter: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run argument tokens through parse, coerce and validate.
    Check(CheckArgs),
    /// Print the built-in registry.
    Dump(DumpArgs),
    /// Check registry files for structural errors.
    Lint(LintArgs),
    /// List the options a command accepts.
    Options(OptionsArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Registry file (JSON or YAML) to use instead of the built-in one.
    #[arg(long)]
    schema: Option<PathBuf>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Tokens to evaluate, without the program name. Use `--` before tokens
    /// that start with a dash.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[derive(Debug, Args)]
struct DumpArgs {
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Write to a file instead of stdout; the format follows the extension.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct LintArgs {
    /// Registry files to check.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct OptionsArgs {
    /// Command name.
    command: String,
    /// Subcommand name.
    subcommand: Option<String>,
    /// Registry file (JSON or YAML) to use instead of the built-in one.
    #[arg(long)]
    schema: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_filter)),
        )
        .init();

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Dump(args) => run_dump(args),
        Command::Lint(args) => run_lint(args),
        Command::Options(args) => run_options(args),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_INVALID_ARGS),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn load_registry(schema: Option<&PathBuf>) -> Result<SchemaRegistry, String> {
    match schema {
        Some(path) => {
            debug!(path = %path.display(), "Loading registry");
            SchemaRegistry::load(path).map_err(|e| format!("{}: {e}", path.display()))
        }
        None => Ok(SchemaRegistry::update_tool()),
    }
}

fn render<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        CliOutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    }
}

/// Returns `Ok(false)` when the tokens produced errors.
fn run_check(args: CheckArgs) -> Result<bool, String> {
    let registry = load_registry(args.schema.as_ref())?;
    let evaluation = evaluate(&registry, args.tokens.as_slice());
    info!(
        tokens = args.tokens.len(),
        errors = evaluation.errors.len(),
        "Checked invocation"
    );

    println!("{}", render(&evaluation, args.format)?);
    if let Some(report) = format_errors(&evaluation.errors) {
        eprintln!("{report}");
    }
    Ok(evaluation.is_valid())
}

fn run_dump(args: DumpArgs) -> Result<bool, String> {
    let registry = SchemaRegistry::update_tool();
    match args.output {
        Some(path) => {
            registry
                .save(&path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            println!("Wrote registry to {}", path.display());
        }
        None => println!("{}", render(&registry, args.format)?),
    }
    Ok(true)
}

fn run_lint(args: LintArgs) -> Result<bool, String> {
    let mut failures = Vec::new();
    for path in &args.inputs {
        match SchemaRegistry::load(path) {
            Ok(registry) => debug!(
                path = %path.display(),
                commands = registry.commands.len(),
                rules = registry.rules.len(),
                "Registry is valid"
            ),
            Err(err) => failures.push(format!("{}: {err}", path.display())),
        }
    }

    if !failures.is_empty() {
        return Err(failures.join("\n"));
    }
    println!("Validated {} registry file(s).", args.inputs.len());
    Ok(true)
}

fn run_options(args: OptionsArgs) -> Result<bool, String> {
    let registry = load_registry(args.schema.as_ref())?;
    let command = registry
        .find_command(&args.command)
        .ok_or_else(|| format!("unknown command '{}'", args.command))?;

    let mut options = registry.options_applicable_to(&command.name);
    if let Some(sub) = &args.subcommand {
        let subcommand = command
            .find_subcommand(sub)
            .ok_or_else(|| format!("unknown subcommand '{} {sub}'", command.name))?;
        options.extend(subcommand.options.iter());
    }

    let admin = registry.requires_admin(&command.name, args.subcommand.as_deref());
    println!(
        "{}{} (requires admin: {})",
        command.name,
        args.subcommand
            .as_deref()
            .map(|s| format!(" {s}"))
            .unwrap_or_default(),
        if admin { "yes" } else { "no" }
    );
    for option in options {
        let description = option.description.as_deref().unwrap_or_default();
        println!("  {:<40} {description}", option.usage());
    }
    Ok(true)
}
