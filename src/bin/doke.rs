//! Command-line interface for doke
//! This binary extracts typed data trees from Markdown documents using a root config and its definition sources.
//!
//! Usage:
//!   doke parse --config `<root.yaml>` `<file>...` [--format `<format>`] [--trace]  - Assemble documents and print their value graphs
//!   doke check --config `<root.yaml>`                                            - Load the grammar and list its types
//!   doke split `<file>`                                                          - Show how a document is split into statements

use clap::{Arg, ArgAction, Command};
use doke::doke::document::split;
use doke::doke::matching::MatchTrace;
use doke::doke::statements::{Statement, StatementTreeBuilder};
use doke::{DokeParser, ParsedDocument};
use doke_config::{DokeSettings, Loader, OutputFormat};
use std::error::Error;
use std::path::Path;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

fn main() {
    let matches = Command::new("doke")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract typed data trees from semi-structured Markdown")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (-v debug, -vv trace); RUST_LOG wins when set")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("parse")
                .about("Assemble documents and print their value graphs")
                .arg(config_arg())
                .arg(
                    Arg::new("files")
                        .help("Markdown documents to parse")
                        .required(true)
                        .num_args(1..)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format ('json' or 'debug'); defaults to the settings value")
                        .value_parser(["json", "debug"]),
                )
                .arg(
                    Arg::new("trace")
                        .long("trace")
                        .help("Print every attempted rule to stderr")
                        .action(ArgAction::SetTrue),
                )
                .arg(settings_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Load every definition source and list the registered types")
                .arg(config_arg())
                .arg(settings_arg()),
        )
        .subcommand(
            Command::new("split")
                .about("Show the frontmatter, body statements and trailing text of a document")
                .arg(
                    Arg::new("path")
                        .help("Path to the Markdown document")
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    init_tracing(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("parse", parse_matches)) => {
            let config = parse_matches.get_one::<String>("config").unwrap();
            let files: Vec<&String> = parse_matches.get_many::<String>("files").unwrap().collect();
            let format = parse_matches.get_one::<String>("format").map(String::as_str);
            let settings = load_settings(config, parse_matches.get_one::<String>("settings"), format);
            handle_parse_command(config, &files, parse_matches.get_flag("trace"), &settings);
        }
        Some(("check", check_matches)) => {
            let config = check_matches.get_one::<String>("config").unwrap();
            let settings = load_settings(config, check_matches.get_one::<String>("settings"), None);
            handle_check_command(config, &settings);
        }
        Some(("split", split_matches)) => {
            let path = split_matches.get_one::<String>("path").unwrap();
            handle_split_command(path);
        }
        _ => unreachable!(),
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .help("Path to the root config (root type, children, parsers)")
        .required(true)
}

fn settings_arg() -> Arg {
    Arg::new("settings")
        .long("settings")
        .help("TOML settings layered over the defaults and the project doke.toml")
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second subscriber only happens in tests that run main twice; ignore it.
    let _ = SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Settings for a run against the root config at `config`: defaults, then the
/// project's `doke.toml`, then `--settings`, then flags.
fn load_settings(config: &str, path: Option<&String>, format: Option<&str>) -> DokeSettings {
    let project_dir = Path::new(config).parent().unwrap_or_else(|| Path::new("."));
    let mut loader = Loader::new().with_project_dir(project_dir);
    if let Some(path) = path {
        loader = loader.with_settings_file(path);
    }
    if let Some(format) = format {
        loader = loader.with_override("output.format", format).unwrap_or_else(|e| {
            eprintln!("Error: invalid --format: {}", e);
            std::process::exit(1);
        });
    }
    loader.load().unwrap_or_else(|e| {
        eprintln!("Error loading settings: {}", e);
        std::process::exit(1);
    })
}

fn load_parser(config: &str, settings: &DokeSettings) -> DokeParser {
    match DokeParser::from_config_file(config) {
        Ok(parser) => parser.with_settings(settings),
        Err(e) => {
            report(config, &e);
            std::process::exit(1);
        }
    }
}

/// Print an error and its chain of causes.
fn report(context: &str, err: &dyn Error) {
    eprintln!("Error: {}: {}", context, err);
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}

/// Handle the parse command
fn handle_parse_command(config: &str, files: &[&String], trace: bool, settings: &DokeSettings) {
    let parser = load_parser(config, settings);

    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error reading {}: {}", path, e);
            std::process::exit(1);
        });
        sources.push(source);
    }

    let results: Vec<_> = if trace {
        sources
            .iter()
            .zip(files)
            .map(|(source, path)| {
                let match_trace = MatchTrace::new();
                let result = parser.parse_traced(source, &match_trace);
                eprintln!("trace of {}:\n{}", path, match_trace.render());
                result
            })
            .collect()
    } else {
        parser.parse_all(&sources)
    };

    let mut failed = false;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(parsed) => {
                if files.len() > 1 {
                    println!("==> {} <==", path);
                }
                match render(&parsed, settings) {
                    Ok(output) => println!("{}", output),
                    Err(e) => {
                        report(path, &e);
                        failed = true;
                    }
                }
            }
            Err(e) => {
                report(path, &e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn render(parsed: &ParsedDocument, settings: &DokeSettings) -> Result<String, serde_json::Error> {
    match (settings.output.format, settings.output.pretty) {
        (OutputFormat::Json, true) => serde_json::to_string_pretty(parsed),
        (OutputFormat::Json, false) => serde_json::to_string(parsed),
        (OutputFormat::Debug, true) => Ok(format!("{:#?}", parsed)),
        (OutputFormat::Debug, false) => Ok(format!("{:?}", parsed)),
    }
}

/// Handle the check command
fn handle_check_command(config: &str, settings: &DokeSettings) {
    let parser = load_parser(config, settings);
    let registry = parser.registry();

    println!("root: {}", parser.config().root);
    for field in &parser.config().children.fields {
        println!("  {}", describe_field(field));
    }

    println!("types:");
    for registered in registry.types() {
        let kind = if registered.is_table() { "table" } else { "rules" };
        println!("  {} ({} {})", registered.name, registered.rules.len(), kind);
        if let Some(children) = registry.children_of(&registered.name) {
            for field in &children.fields {
                println!("    {}", describe_field(field));
            }
        }
    }
}

fn describe_field(field: &doke::doke::config::FieldSpec) -> String {
    let optional = if field.optional { "?" } else { "" };
    if field.is_array() {
        format!("{}{}: [{}]", field.name, optional, field.type_name)
    } else {
        format!("{}{}: {}", field.name, optional, field.type_name)
    }
}

/// Handle the split command
fn handle_split_command(path: &str) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file: {}", e);
        std::process::exit(1);
    });

    let document = split(&source).unwrap_or_else(|e| {
        report(path, &e);
        std::process::exit(1);
    });

    println!("frontmatter:");
    for (key, value) in &document.frontmatter {
        println!("  {} = {}", key, value);
    }

    println!("body (from line {}):", document.spans.body_line);
    let statements = StatementTreeBuilder::starting_at_line(document.spans.body_line).build(&document.body);
    for statement in &statements {
        print_statement(statement, 1);
    }

    println!("trailing:");
    for line in document.trailing.lines() {
        println!("  {}", line);
    }
}

fn print_statement(statement: &Statement, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{}{:>4}: {}", indent, statement.source_line, statement.text);
    if !statement.links.is_empty() {
        println!("{}      links: {}", indent, statement.links.join(", "));
    }
    for child in &statement.children {
        print_statement(child, depth + 1);
    }
}
