use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("optprec_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn path(&self) -> &PathBuf {
        &self.path
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

const BUILD_SCHEMA: &str = r#"version: "1.0.0"
name: build
options:
  - name: verbose
    abbreviation: v
    kind: boolean
    default: "false"
  - name: jobs
    abbreviation: j
    value_type: number
    default: "4"
  - name: tag
    kind: repeated
    value_type: string
    allow_multiple: true
  - name: fast
    kind: void
    expansion: ["--jobs=16", "--noverbose"]
  - name: old_jobs
    value_type: number
    deprecation: use --jobs
  - name: broken
    kind: void
    expansion: ["--jobs=1", "stray"]
"#;

/// Writes the build schema used by most tests.
fn write_build_schema(dir: &TempDir) -> PathBuf {
    let path = dir.join("build.yaml");
    fs::write(&path, BUILD_SCHEMA).expect("failed to write schema");
    path
}

fn write_plan(dir: &TempDir) -> PathBuf {
    let yaml = r#"version: "1.0"
batches:
  - category: rc-file
    source: ~/.buildrc
    args: ["--jobs=2", "--tag=rc"]
  - category: invocation-policy
    source: site policy
    args: ["--noverbose"]
"#;
    let path = dir.join("plan.yaml");
    fs::write(&path, yaml).expect("failed to write plan");
    path
}

fn optprec(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_optprec"))
        .args(args)
        .output()
        .expect("failed to run optprec")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_schema_directory() {
    let dir = TempDir::new("validate_ok");
    write_build_schema(&dir);
    fs::write(
        dir.join("tiny.json"),
        r#"{"version": "1.0.0", "name": "tiny", "options": [{"name": "quiet", "kind": "boolean"}]}"#,
    )
    .unwrap();
    fs::write(dir.join("README.txt"), "not a schema").unwrap();

    let output = optprec(&["validate", dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Validated 2 schema file(s) with 7 option(s)."));
}

#[test]
fn validate_reports_duplicate_options() {
    let dir = TempDir::new("validate_dup");
    let path = dir.join("dup.yaml");
    fs::write(
        &path,
        "version: \"1.0.0\"\nname: dup\noptions:\n  - name: jobs\n  - name: jobs\n",
    )
    .unwrap();

    let output = optprec(&["validate", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("jobs"));
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_effective_values_as_json() {
    let dir = TempDir::new("parse_json");
    let schema = write_build_schema(&dir);

    let output = optprec(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--",
        "-v",
        "--jobs",
        "8",
        "--tag=a,b",
        "target",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["values"]["verbose"], true);
    assert_eq!(report["values"]["jobs"], 8);
    assert_eq!(report["values"]["tag"], serde_json::json!(["a", "b"]));
    assert_eq!(report["residue"], serde_json::json!(["target"]));
}

#[test]
fn parse_applies_plan_layers() {
    let dir = TempDir::new("parse_plan");
    let schema = write_build_schema(&dir);
    let plan = write_plan(&dir);

    let output = optprec(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--plan",
        plan.to_str().unwrap(),
        "--format",
        "yaml",
        "--",
        "--verbose",
        "--tag=cli",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_yaml::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["values"]["verbose"].as_bool(), Some(false));
    assert_eq!(report["values"]["jobs"].as_i64(), Some(2));
    let tags: Vec<&str> = report["values"]["tag"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(serde_yaml::Value::as_str)
        .collect();
    assert_eq!(tags, vec!["rc", "cli"]);
}

#[test]
fn parse_lower_category_does_not_override_plan() {
    let dir = TempDir::new("parse_category");
    let schema = write_build_schema(&dir);
    let plan = write_plan(&dir);

    let output = optprec(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--plan",
        plan.to_str().unwrap(),
        "--category",
        "computed-default",
        "--",
        "--jobs=32",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["values"]["jobs"], 2);
}

#[test]
fn parse_table_lists_warnings() {
    let dir = TempDir::new("parse_table");
    let schema = write_build_schema(&dir);

    let output = optprec(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--format",
        "table",
        "--",
        "--old_jobs=3",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.starts_with("Option"));
    assert!(out.contains("old_jobs  3"));
    assert!(out.contains("option 'old_jobs' is deprecated: use --jobs"));
}

#[test]
fn parse_unknown_option_exits_with_user_error() {
    let dir = TempDir::new("parse_unknown");
    let schema = write_build_schema(&dir);

    let output = optprec(&["parse", "--schema", schema.to_str().unwrap(), "--", "--bogus", "x"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error: unrecognized option: --bogus"));
}

#[test]
fn parse_broken_expansion_exits_with_fatal_error() {
    let dir = TempDir::new("parse_fatal");
    let schema = write_build_schema(&dir);

    let output = optprec(&["parse", "--schema", schema.to_str().unwrap(), "--", "--broken"]);
    assert_eq!(output.status.code(), Some(70));
    assert!(stderr(&output).contains("expanded to non-option arguments: stray"));
}

// ---------------------------------------------------------------------------
// canonicalize / explain
// ---------------------------------------------------------------------------

#[test]
fn canonicalize_prints_tokens_and_fingerprint() {
    let dir = TempDir::new("canonicalize");
    let schema = write_build_schema(&dir);

    let output = optprec(&[
        "canonicalize",
        "--schema",
        schema.to_str().unwrap(),
        "--fingerprint",
        "--",
        "--tag=x",
        "--fast",
        "-v",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(&lines[..3], &["--verbose", "--jobs=16", "--tag=x"]);
    let fingerprint = lines[3].strip_prefix("sha256:").unwrap();
    assert_eq!(fingerprint.len(), 64);
    assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn explain_shows_sources() {
    let dir = TempDir::new("explain");
    let schema = write_build_schema(&dir);
    let plan = write_plan(&dir);
    let schema_arg = schema.to_str().unwrap();
    let plan_arg = plan.to_str().unwrap();

    let output = optprec(&["explain", "--schema", schema_arg, "--plan", plan_arg, "--", "--fast"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("rc-file#0"));
    assert!(out.contains("~/.buildrc"));
    assert!(out.contains("site policy"));
    assert!(!out.contains("expanded from option --fast"));

    let output = optprec(&["explain", "--schema", schema_arg, "--plan", plan_arg, "--all", "--", "--fast"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("expanded from option --fast"));
}
