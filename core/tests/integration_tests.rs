use wuctl_grammar::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run(tokens: &[&str]) -> Evaluation {
    evaluate(&SchemaRegistry::update_tool(), tokens)
}

fn messages(eval: &Evaluation) -> Vec<String> {
    eval.errors.iter().map(ToString::to_string).collect()
}

const GUID: &str = "7971f918-a847-4430-9279-4a52d1efe18d";

// ---------------------------------------------------------------------------
// Tokenizer properties
// ---------------------------------------------------------------------------

#[test]
fn test_short_and_long_aliases_are_equivalent() {
    let registry = SchemaRegistry::update_tool();
    let short = parse(&registry, &["search", "-h"]);
    let long = parse(&registry, &["search", "--help"]);
    assert_eq!(short.options, long.options);
    assert!(short.has("help"));
}

#[test]
fn test_flags_never_consume_the_next_token() {
    let eval = run(&["install", "--accept-eulas", "--all", "--noreboot", "trailing"]);
    assert_eq!(eval.args.positional, vec!["trailing"]);
    assert!(eval.args.flag(&SchemaRegistry::update_tool(), "accept-eulas"));
    assert!(eval.is_valid(), "{:?}", messages(&eval));
}

#[test]
fn test_command_scope_wins_on_name_collision() {
    let registry = SchemaRegistry::new("tool", "1.0.0")
        .with_global_option(OptionSchema::flag("target"))
        .with_command(
            CommandSchema::new("deploy", "Deploy").with_option(OptionSchema::string("target")),
        );

    let result = parse(&registry, &["deploy", "--target", "prod"]);
    assert_eq!(result.get("target"), Some(&OptionValue::Raw("prod".into())));
    assert!(result.positional.is_empty());

    let result = parse(&registry, &["other", "--target", "prod"]);
    assert_eq!(result.get("target"), Some(&OptionValue::Raw("true".into())));
    assert_eq!(result.positional, vec!["prod"]);
}

#[test]
fn test_subcommand_scope_wins_over_command_and_global() {
    let registry = SchemaRegistry::update_tool();
    let eval = evaluate(&registry, &["services", "remove", "--service-id", GUID]);
    let expected = OptionValue::Identifier(GUID.parse().unwrap());
    assert_eq!(eval.args.get("service-id"), Some(&expected));
}

// ---------------------------------------------------------------------------
// Defaults and presence
// ---------------------------------------------------------------------------

#[test]
fn test_default_read_does_not_imply_presence() {
    let registry = SchemaRegistry::update_tool();
    let eval = evaluate(&registry, &["search"]);

    assert!(!eval.args.has("max-results"));
    assert_eq!(eval.args.int(&registry, "max-results"), Some(50));
    assert_eq!(eval.args.text(&registry, "criteria").as_deref(), Some("IsInstalled=0"));
    assert!(!eval.args.flag(&registry, "include-hidden"));
    assert!(eval.is_valid());
}

#[test]
fn test_history_defaults() {
    let registry = SchemaRegistry::update_tool();
    let eval = evaluate(&registry, &["history"]);
    assert_eq!(eval.args.int(&registry, "count"), Some(0));
    assert_eq!(eval.args.int(&registry, "start-index"), Some(0));
    assert_eq!(OutputFormat::read(&registry, &eval.args), OutputFormat::Table);
}

// ---------------------------------------------------------------------------
// Selection rules
// ---------------------------------------------------------------------------

#[test]
fn test_download_all_is_valid_without_select() {
    let eval = run(&["download", "--all"]);
    assert!(eval.is_valid(), "{:?}", messages(&eval));
    assert!(!eval.args.has("select"));
}

#[test]
fn test_download_requires_exactly_one_selector() {
    assert_eq!(
        messages(&run(&["download"])),
        vec!["download requires either --all or --select <expression>"]
    );
    assert_eq!(
        messages(&run(&["install", "--all", "--select", "kb:KB1"])),
        vec!["Cannot use both --all and --select; choose one"]
    );
    assert!(run(&["install", "--select", "index:1,2"]).is_valid());
}

#[test]
fn test_all_false_counts_as_not_selected() {
    assert_eq!(
        messages(&run(&["download", "--all=false"])),
        vec!["download requires either --all or --select <expression>"]
    );
}

#[test]
fn test_all_yes_is_not_a_boolean_spelling() {
    let eval = run(&["install", "--all=yes"]);
    assert!(eval.args.get("all").unwrap().is_raw());
    assert_eq!(
        messages(&eval),
        vec!["install requires either --all or --select <expression>"]
    );
}

#[test]
fn test_uninstall_requires_select() {
    let eval = run(&["uninstall"]);
    assert!(messages(&eval).contains(&"uninstall requires --select kb:KBxxxx".to_string()));
}

#[test]
fn test_select_expression_parsing() {
    let eval = run(&["download", "--select", "kb:KB5001234,KB5001235"]);
    assert!(eval.is_valid());
    let spec = eval.args.selection().unwrap().unwrap();
    assert_eq!(spec.tag, SelectionTag::Kb);
    assert_eq!(spec.values, vec!["KB5001234", "KB5001235"]);

    let eval = run(&["download", "--select", "index:1,,3"]);
    let spec = eval.args.selection().unwrap().unwrap();
    assert_eq!(spec.tag, SelectionTag::Index);
    assert_eq!(spec.values, vec!["1", "3"]);
}

#[test]
fn test_select_format_errors() {
    assert_eq!(
        messages(&run(&["download", "--select", "KB5001234"])),
        vec![
            "--select must start with 'kb:' or 'index:' (e.g., --select kb:KB5001234 or --select index:1,2,3)"
        ]
    );
    assert_eq!(
        messages(&run(&["download", "--select="])),
        vec!["--select cannot be empty"]
    );
}

#[test]
fn test_select_without_value_is_a_parse_error_then_rule_error() {
    let eval = run(&["download", "--select"]);
    assert_eq!(
        messages(&eval),
        vec![
            "Option --select requires a value",
            "download requires either --all or --select <expression>",
        ]
    );
    assert_eq!(eval.errors[0].kind(), ErrorKind::Parse);
    assert_eq!(eval.errors[1].kind(), ErrorKind::Validation);
}

// ---------------------------------------------------------------------------
// Ranges and coercion
// ---------------------------------------------------------------------------

#[test]
fn test_max_results_out_of_range_is_coerced_then_rejected() {
    let eval = run(&["search", "--max-results", "1000"]);
    assert_eq!(eval.args.get("max-results"), Some(&OptionValue::Int(1000)));
    assert_eq!(messages(&eval), vec!["--max-results must be between 1 and 500"]);
}

#[test]
fn test_max_results_outside_search_is_rejected() {
    assert_eq!(
        messages(&run(&["history", "--max-results", "50"])),
        vec!["--max-results is only allowed for the search command"]
    );
}

#[test]
fn test_invalid_integer_reports_once() {
    let eval = run(&["search", "--timeout-seconds", "soon"]);
    assert_eq!(
        messages(&eval),
        vec!["Option --timeout-seconds requires an integer value (got: 'soon')"]
    );
    assert_eq!(eval.errors[0].kind(), ErrorKind::Coercion);
}

#[test]
fn test_range_rules() {
    assert_eq!(
        messages(&run(&["status", "--timeout-seconds", "0"])),
        vec!["--timeout-seconds must be between 1 and 3600"]
    );
    assert_eq!(
        messages(&run(&["history", "--count=-1", "--start-index=-5"])),
        vec![
            "--count must be between 0 and 2147483647 (use 0 for all entries)",
            "--start-index must be between 0 and 2147483647",
        ]
    );
}

#[test]
fn test_history_paging_values_above_i32_are_rejected() {
    let eval = run(&["history", "--count", "99999999999", "--start-index", "5000000000"]);
    assert_eq!(eval.args.get("count"), Some(&OptionValue::Int(99_999_999_999)));
    assert_eq!(
        messages(&eval),
        vec![
            "--count must be between 0 and 2147483647 (use 0 for all entries)",
            "--start-index must be between 0 and 2147483647",
        ]
    );

    assert!(run(&["history", "--count", "2147483647"]).is_valid());
}

#[test]
fn test_enum_values_are_normalized_or_rejected() {
    let eval = run(&["search", "--output", "JSON"]);
    assert_eq!(eval.args.get("output"), Some(&OptionValue::Enumerated("json".into())));
    assert!(eval.is_valid());

    assert_eq!(
        messages(&run(&["search", "--output", "xml"])),
        vec!["Option --output must be one of: table, json, json-full (got: 'xml')"]
    );
}

#[test]
fn test_output_limited_to_search_and_history() {
    assert_eq!(
        messages(&run(&["status", "--output", "json"])),
        vec!["--output is only allowed for: search, history"]
    );
}

#[test]
fn test_flag_restrictions() {
    assert_eq!(
        messages(&run(&["search", "--whatif", "--force", "--accept-eulas", "--noreboot"])),
        vec![
            "--whatif is only allowed for: download, install, uninstall",
            "--force is only allowed for: download, install, uninstall",
            "--accept-eulas is only allowed for the install command",
            "--noreboot is only allowed for: install, uninstall",
        ]
    );
    assert_eq!(
        messages(&run(&["history", "--include-hidden"])),
        vec!["--include-hidden is only allowed for the search command"]
    );
}

#[test]
fn test_unrecognized_flag_text_is_left_raw() {
    let registry = SchemaRegistry::update_tool();
    let eval = evaluate(&registry, &["search", "--whatif=maybe"]);
    assert_eq!(eval.args.get("whatif"), Some(&OptionValue::Raw("maybe".into())));
    assert!(!eval.args.flag(&registry, "whatif"));
    assert!(eval.is_valid());
}

// ---------------------------------------------------------------------------
// Commands, help and services
// ---------------------------------------------------------------------------

#[test]
fn test_help_short_circuits_everything() {
    let eval = run(&["--help", "--timeout-seconds", "--bogus=", "install"]);
    assert_eq!(eval.args.command.as_deref(), Some(HELP_COMMAND));
    assert!(eval.is_valid());

    let eval = run(&["download", "--help"]);
    assert_eq!(eval.args.command.as_deref(), Some("download"));
    assert!(eval.is_valid());
}

#[test]
fn test_empty_invocation_is_help() {
    let tokens: [&str; 0] = [];
    let eval = run(&tokens);
    assert_eq!(eval.args.command.as_deref(), Some("help"));
    assert!(eval.is_valid());
}

#[test]
fn test_unknown_command() {
    assert_eq!(
        messages(&run(&["reboot"])),
        vec![
            "Unknown command 'reboot'. Valid commands: search, download, install, uninstall, history, services, status, help, version"
        ]
    );
}

#[test]
fn test_options_without_command() {
    assert_eq!(
        messages(&run(&["--whatif"])),
        vec![
            "No command specified. Use --help to see available commands.",
            "--whatif is only allowed for: download, install, uninstall",
        ]
    );
}

#[test]
fn test_services_subcommands() {
    assert_eq!(
        messages(&run(&["services"])),
        vec!["services command requires a subcommand: list or remove"]
    );
    assert!(run(&["services", "list"]).is_valid());

    let eval = run(&["services", "remove"]);
    assert!(messages(&eval).contains(&"services remove requires --service-id <guid>".to_string()));
}

#[test]
fn test_service_id_rules() {
    assert_eq!(
        messages(&run(&["search", "--service-id", GUID])),
        vec!["--service-id can only be used when --server is 'microsoftupdate'"]
    );
    assert!(run(&["search", "--server", "MicrosoftUpdate", "--service-id", GUID]).is_valid());
    assert_eq!(
        messages(&run(&["search", "--server", "microsoftupdate", "--service-id", "xyz"])),
        vec!["--service-id must be a valid GUID (got: 'xyz')"]
    );
}

#[test]
fn test_blank_criteria() {
    assert_eq!(
        messages(&run(&["search", "--criteria", "  "])),
        vec!["--criteria cannot be empty"]
    );
}

#[test]
fn test_all_errors_reported_in_one_pass() {
    let eval = run(&[
        "history",
        "--count",
        "x",
        "--start-index=-2",
        "--output",
        "csv",
        "--whatif",
    ]);
    assert_eq!(
        messages(&eval),
        vec![
            "Option --count requires an integer value (got: 'x')",
            "Option --output must be one of: table, json, json-full (got: 'csv')",
            "--whatif is only allowed for: download, install, uninstall",
            "--start-index must be between 0 and 2147483647",
        ]
    );
    let report = eval.error_report().unwrap();
    assert!(report.starts_with("Validation errors:"));
    assert!(report.ends_with("Use --help to see valid options and combination rules."));
}

// ---------------------------------------------------------------------------
// Registry files
// ---------------------------------------------------------------------------

#[test]
fn test_registry_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SchemaRegistry::update_tool();

    for name in ["grammar.json", "grammar.yaml"] {
        let path = dir.path().join(name);
        registry.save(&path).unwrap();
        let loaded = SchemaRegistry::load(&path).unwrap();
        assert_eq!(loaded, registry, "round trip through {name}");
    }
}

#[test]
fn test_loaded_registry_drives_the_pipeline() {
    let yaml = r#"
program: deployer
version: 2.0.0
global_options:
  - name: verbose
    short: V
    type: flag
commands:
  - name: ship
    description: Ship a build
    options:
      - name: env
        type: enum
        allowed_values: [dev, prod]
        default: dev
      - name: pick
        type: string
rules:
  - id: command-required
    description: A command is needed
    kind: command_present
  - id: pick-format
    description: Pick must be a selection
    kind: pattern
    option: pick
    pattern: selection_tag
"#;
    let registry = SchemaRegistry::from_yaml_str(yaml).unwrap();

    let eval = evaluate(&registry, &["ship", "-V", "--env", "PROD", "--pick", "index:4"]);
    assert!(eval.is_valid(), "{:?}", messages(&eval));
    assert!(eval.args.flag(&registry, "verbose"));
    assert_eq!(eval.args.text(&registry, "env").as_deref(), Some("prod"));

    let eval = evaluate(&registry, &["--verbose"]);
    assert_eq!(eval.errors.len(), 1);
    assert_eq!(eval.errors[0].rule_id(), Some("command-required"));
}

#[test]
fn test_invalid_registry_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    let bad = SchemaRegistry::new("tool", "1.0.0")
        .with_global_option(OptionSchema::int("limit").with_default("many"));
    std::fs::write(&path, serde_json::to_string(&bad).unwrap()).unwrap();

    match SchemaRegistry::load(&path) {
        Err(RegistryError::InvalidSchema(SchemaError::InvalidDefault { option, .. })) => {
            assert_eq!(option, "limit");
        }
        other => panic!("expected invalid default, got {other:?}"),
    }
}

#[test]
fn test_evaluation_serializes_messages() {
    let eval = run(&["search", "--max-results", "1000"]);
    let json = serde_json::to_value(&eval).unwrap();
    assert_eq!(json["args"]["command"], "search");
    assert_eq!(json["args"]["options"]["max-results"]["value"], 1000);
    assert_eq!(json["errors"][0], "--max-results must be between 1 and 500");
}
