use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use option_precedence_core::{OptionSchema, SchemaPackage};
use option_precedence_engine::{
    EffectiveValues, InvocationPlan, OptionsParser, ParseError, ParsedOccurrence, PlanError,
    PriorityCategory,
};
use serde::Serialize;

/// Exit code for a schema that breaks the engine (`EX_SOFTWARE`).
const FATAL_EXIT_CODE: i32 = 70;

/// Output format for `parse`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "optprec")]
#[command(about = "Layered, priority-ordered option parsing against a schema")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate one or more schema files (JSON or YAML).
    Validate(ValidateArgs),
    /// Parse arguments and print effective values, residue and warnings.
    Parse(ParseArgs),
    /// Print the canonical form of the parsed arguments.
    Canonicalize(CanonicalizeArgs),
    /// Show which occurrences were parsed, with priority and source.
    Explain(ExplainArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema files and/or directories containing schema files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Schema file (.json, .yaml or .yml).
    #[arg(long)]
    schema: PathBuf,
    /// Invocation plan applied before the command-line arguments.
    #[arg(long)]
    plan: Option<PathBuf>,
    /// Priority category of the arguments after `--`.
    #[arg(long, default_value = "command-line")]
    category: PriorityCategory,
    /// Arguments to parse.
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct CanonicalizeArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Also print the SHA-256 fingerprint of the canonical form.
    #[arg(long)]
    fingerprint: bool,
}

#[derive(Debug, Args)]
struct ExplainArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Include occurrences produced by expansion.
    #[arg(long)]
    all: bool,
}

/// Failure of a subcommand.
#[derive(Debug)]
enum CliError {
    /// Bad input: unknown option, malformed file, invalid value.
    User(String),
    /// The schema itself is broken.
    Fatal(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Fatal(_) => FATAL_EXIT_CODE,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(msg) | Self::Fatal(msg) => f.write_str(msg),
        }
    }
}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self::User(msg)
    }
}

impl From<ParseError> for CliError {
    fn from(err: ParseError) -> Self {
        if err.is_fatal() {
            Self::Fatal(err.to_string())
        } else {
            Self::User(err.to_string())
        }
    }
}

impl From<PlanError> for CliError {
    fn from(err: PlanError) -> Self {
        match &err {
            PlanError::Batch { error, .. } if error.is_fatal() => Self::Fatal(err.to_string()),
            _ => Self::User(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    values: EffectiveValues,
    residue: &'a [String],
    warnings: &'a [String],
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Parse(args) => run_parse(args),
        Command::Canonicalize(args) => run_canonicalize(args),
        Command::Explain(args) => run_explain(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    let paths = collect_schema_paths(&args.inputs)?;
    if paths.is_empty() {
        return Err("No schema files found.".to_string().into());
    }

    let mut option_count = 0usize;
    let mut failures = Vec::new();
    for path in &paths {
        match load_schema(path) {
            Ok(schema) => option_count += schema.len(),
            Err(err) => failures.push(err),
        }
    }
    if !failures.is_empty() {
        return Err(failures.join("\n").into());
    }

    println!(
        "Validated {} schema file(s) with {option_count} option(s).",
        paths.len()
    );
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), CliError> {
    let schema = load_schema(&args.input.schema)?;
    let parser = build_parser(&schema, &args.input)?;

    let report = ParseReport {
        values: parser.effective_values()?,
        residue: parser.residue(),
        warnings: parser.warnings(),
    };
    let raw = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|e| format!("JSON serialization failed: {e}"))?,
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(&report).map_err(|e| format!("YAML serialization failed: {e}"))?
        }
        CliOutputFormat::Table => report_to_table(&report),
    };
    println!("{}", raw.trim_end());
    Ok(())
}

fn run_canonicalize(args: CanonicalizeArgs) -> Result<(), CliError> {
    let schema = load_schema(&args.input.schema)?;
    let parser = build_parser(&schema, &args.input)?;
    print_warnings(&parser);

    for token in parser.canonical_form() {
        println!("{token}");
    }
    if args.fingerprint {
        println!("sha256:{}", parser.canonical_fingerprint());
    }
    Ok(())
}

fn run_explain(args: ExplainArgs) -> Result<(), CliError> {
    let schema = load_schema(&args.input.schema)?;
    let parser = build_parser(&schema, &args.input)?;
    print_warnings(&parser);

    let occurrences = if args.all {
        parser.all_occurrences()
    } else {
        parser.explicit_occurrences()
    };
    print!("{}", occurrences_to_table(&occurrences));
    Ok(())
}

/// Applies the plan, if any, then the trailing arguments.
fn build_parser<'a>(schema: &'a OptionSchema, input: &InputArgs) -> Result<OptionsParser<'a>, CliError> {
    let plan = match &input.plan {
        Some(path) => InvocationPlan::load(path)
            .map_err(|err| format!("Failed to load plan '{}': {err}", path.display()))?,
        None => InvocationPlan::default(),
    };

    let mut parser = OptionsParser::new(schema).with_config(plan.parser.clone());
    plan.apply(&mut parser)?;
    parser.parse_args(input.category, "command line", input.args.iter().cloned())?;
    Ok(parser)
}

fn load_schema(path: &Path) -> Result<OptionSchema, String> {
    SchemaPackage::load(path)
        .and_then(SchemaPackage::into_schema)
        .map_err(|err| format!("Failed to load schema '{}': {err}", path.display()))
}

/// Expands directories into the schema files they contain, sorted.
fn collect_schema_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }
        let entries = fs::read_dir(input)
            .map_err(|err| format!("Failed to read directory '{}': {err}", input.display()))?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_schema_file(path))
            .collect();
        found.sort();
        paths.extend(found);
    }
    Ok(paths)
}

fn is_schema_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "yaml" | "yml")
    )
}

fn print_warnings(parser: &OptionsParser<'_>) {
    for warning in parser.warnings() {
        eprintln!("warning: {warning}");
    }
}

fn report_to_table(report: &ParseReport<'_>) -> String {
    let mut out = String::new();
    let width = report
        .values
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(6)
        .max("Option".len());

    out.push_str(&format!("{:<width$}  Value\n", "Option"));
    for (name, value) in report.values.iter() {
        out.push_str(&format!("{name:<width$}  {value}\n"));
    }

    if !report.residue.is_empty() {
        out.push_str(&format!("\nResidue: {}\n", report.residue.join(" ")));
    }
    if !report.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in report.warnings {
            out.push_str(&format!("  {warning}\n"));
        }
    }
    out
}

fn occurrences_to_table(occurrences: &[&ParsedOccurrence]) -> String {
    let priorities: Vec<String> = occurrences.iter().map(|o| o.priority().to_string()).collect();
    let priority_width = priorities.iter().map(String::len).max().unwrap_or(0);
    let form_width = occurrences
        .iter()
        .map(|o| o.command_line_form().len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (occurrence, priority) in occurrences.iter().zip(&priorities) {
        out.push_str(&format!(
            "{priority:<priority_width$}  {:<form_width$}  {}\n",
            occurrence.command_line_form(),
            occurrence.source()
        ));
    }
    out
}
