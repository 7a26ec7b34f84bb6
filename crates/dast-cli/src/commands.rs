use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::bail;
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info, warn};

use dast_diff::diff;
use dast_hash::fingerprint;
use dast_render::{render, summarize, unparse, GenericLayout, Layout, PythonLayout};
use dast_types::Value;

use crate::cli::*;
use crate::config::DastConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }
    let mut config = DastConfig::load(cli.config.as_deref())?;
    let output = Output {
        format: cli.format,
        layout: cli.layout,
        summary: cli.summary,
    };
    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();

    match cli.command {
        Command::Diff(args) => {
            config.apply(&args);
            cmd_diff(&args.paths, &config, &output, &mut out, &mut err)
        }
        Command::Fingerprint(args) => {
            config.ignore(&args.ignore);
            cmd_fingerprint(&args.path, &config, &output, &mut out)
        }
        Command::Unparse(args) => cmd_unparse(&args.path, &config, &output, &mut out),
    }
}

/// Output settings shared by every command.
pub struct Output {
    pub format: OutputFormat,
    pub layout: LayoutChoice,
    pub summary: bool,
}

impl Output {
    fn layout(&self, config: &DastConfig) -> Box<dyn Layout> {
        let hidden = config.diff.ignored_fields.iter().cloned();
        match self.layout {
            LayoutChoice::Python => Box::new(PythonLayout::hiding(hidden)),
            LayoutChoice::Generic => Box::new(GenericLayout::hiding(hidden)),
        }
    }
}

/// Why a file or a pair could not be processed. `kind` is a stable name
/// for the report.
#[derive(Debug)]
pub struct Failure {
    pub kind: &'static str,
    pub message: String,
}

impl Failure {
    fn new(kind: &'static str, err: impl fmt::Display) -> Self {
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Failure {}

fn is_tree_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn load_tree(path: &Path) -> Result<Value, Failure> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Failure::new("io", format!("{}: {e}", path.display())))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| Failure::new("invalid-json", format!("{}: {e}", path.display())))?;
    Value::from_json(&json)
        .map_err(|e| Failure::new("invalid-tree", format!("{}: {e}", path.display())))
}

/// Diff consecutive before/after pairs. A pair with a file that is not a
/// JSON tree is skipped. A failed pair is reported on `err` and leaves no
/// output; the other pairs still run.
pub fn cmd_diff(
    paths: &[PathBuf],
    config: &DastConfig,
    output: &Output,
    out: &mut impl Write,
    err: &mut impl Write,
) -> anyhow::Result<()> {
    if paths.len() % 2 != 0 {
        bail!("expected before/after pairs, got {} files", paths.len());
    }

    let layout = output.layout(config);
    let mut failed = 0;
    let mut attempted = 0;
    for pair in paths.chunks_exact(2) {
        let (before, after) = (&pair[0], &pair[1]);
        if !is_tree_file(before) || !is_tree_file(after) {
            warn!(before = %before.display(), after = %after.display(), "skipping pair that is not two JSON trees");
            continue;
        }
        attempted += 1;
        match diff_pair(before, after, config, output, layout.as_ref()) {
            Ok(text) => {
                out.write_all(text.as_bytes())?;
                info!(before = %before.display(), after = %after.display(), "pair diffed");
            }
            Err(failure) => {
                failed += 1;
                warn!(before = %before.display(), after = %after.display(), kind = failure.kind, "pair failed");
                writeln!(
                    err,
                    "{} {} -> {}: {failure}",
                    "error:".red().bold(),
                    before.display(),
                    after.display(),
                )?;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {attempted} pairs failed");
    }
    Ok(())
}

/// The complete output for one pair, built before anything is written.
/// Outside the JSON report an unchanged pair prints nothing.
fn diff_pair(
    before_path: &Path,
    after_path: &Path,
    config: &DastConfig,
    output: &Output,
    layout: &dyn Layout,
) -> Result<String, Failure> {
    let before = load_tree(before_path)?;
    let after = load_tree(after_path)?;
    let changes = diff(&before, &after, &config.diff).map_err(|e| Failure::new(e.kind(), e))?;
    let rendered = render(&changes, &before, &after, layout, &config.render)
        .map_err(|e| Failure::new(e.kind(), e))?;
    let notes = if output.summary {
        summarize(&changes, &before, layout)
    } else {
        Vec::new()
    };
    debug!(records = changes.len(), notes = notes.len(), "pair rendered");

    if output.format == OutputFormat::Json {
        let report = json!({
            "before": before_path.display().to_string(),
            "after": after_path.display().to_string(),
            "counts": {
                "additions": changes.additions(),
                "removals": changes.removals(),
                "changes": changes.changes(),
                "reorders": changes.reorders(),
            },
            "changes": changes,
            "rendered": rendered,
            "summary": notes,
        });
        let mut text =
            serde_json::to_string_pretty(&report).map_err(|e| Failure::new("serialization", e))?;
        text.push('\n');
        return Ok(text);
    }

    if changes.is_empty() {
        return Ok(String::new());
    }
    let header = format!("diff --dast {}", after_path.display());
    let (header, body) = match output.format {
        OutputFormat::Text => (header.bold().to_string(), rendered.to_ansi()),
        _ => (header, rendered.to_markers()),
    };
    let mut text = format!("{header}\n{body}");
    if !text.ends_with('\n') {
        text.push('\n');
    }
    for note in notes {
        text.push_str(&format!("# {note}\n"));
    }
    Ok(text)
}

pub fn cmd_fingerprint(
    path: &Path,
    config: &DastConfig,
    output: &Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let tree = load_tree(path)?;
    let fp = fingerprint(&tree, &config.diff.policy()).map_err(|e| Failure::new("malformed-tree", e))?;
    match output.format {
        OutputFormat::Json => writeln!(
            out,
            "{}",
            json!({"path": path.display().to_string(), "fingerprint": fp.to_hex()})
        )?,
        _ => writeln!(out, "{}  {}", fp.to_hex(), path.display())?,
    }
    Ok(())
}

pub fn cmd_unparse(
    path: &Path,
    config: &DastConfig,
    output: &Output,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let tree = load_tree(path)?;
    let text = unparse(&tree, output.layout(config).as_ref());
    match output.format {
        OutputFormat::Json => writeln!(
            out,
            "{}",
            json!({"path": path.display().to_string(), "text": text})
        )?,
        _ if text.ends_with('\n') => write!(out, "{text}")?,
        _ => writeln!(out, "{text}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn assign(value: i64) -> serde_json::Value {
        json!({
            "_type": "Assign",
            "targets": [{"_type": "Name", "id": "x", "ctx": {"_type": "Store"}}],
            "value": {"_type": "Constant", "value": value},
            "lineno": value
        })
    }

    fn module(value: i64) -> serde_json::Value {
        json!({"_type": "Module", "body": [assign(value)], "type_ignores": []})
    }

    fn write(dir: &TempDir, name: &str, json: &serde_json::Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    fn markers() -> Output {
        Output {
            format: OutputFormat::Markers,
            layout: LayoutChoice::Python,
            summary: false,
        }
    }

    fn run_diff(paths: &[PathBuf], output: &Output) -> (anyhow::Result<()>, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = cmd_diff(paths, &DastConfig::default(), output, &mut out, &mut err);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn diff_prints_header_and_marked_source() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(&dir, "a.json", &module(1));
        let after = write(&dir, "b.json", &module(2));

        let (result, out, err) = run_diff(&[before, after.clone()], &markers());
        assert!(result.is_ok());
        assert!(err.is_empty());
        assert_eq!(
            out,
            format!("diff --dast {}\nx = [-1-]->{{+2+}}\n", after.display())
        );
    }

    #[test]
    fn summary_lines_follow_the_diff() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(&dir, "a.json", &module(1));
        let after = write(&dir, "b.json", &module(2));
        let output = Output { summary: true, ..markers() };

        let (_, out, _) = run_diff(&[before, after], &output);
        assert!(out.ends_with("# value 1 changed in constant\n"));
    }

    #[test]
    fn failed_pair_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let list = write(&dir, "list.json", &json!([1, 2]));
        let node = write(&dir, "node.json", &module(1));
        let before = write(&dir, "c.json", &module(1));
        let after = write(&dir, "d.json", &module(2));

        let (result, out, err) = run_diff(&[list, node.clone(), before, after.clone()], &markers());
        assert!(result.is_err());
        assert_eq!(out, format!("diff --dast {}\nx = [-1-]->{{+2+}}\n", after.display()));
        assert!(err.contains("schema-mismatch"));
        assert!(err.contains(&node.display().to_string()));
    }

    #[test]
    fn unreadable_json_is_reported_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let fine = write(&dir, "fine.json", &module(1));

        let (result, out, err) = run_diff(&[broken, fine], &markers());
        assert!(result.is_err());
        assert!(out.is_empty());
        assert!(err.contains("invalid-json"));
    }

    #[test]
    fn pair_with_non_json_file_is_skipped_whole() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(&dir, "a.json", &module(1));
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "ignored").unwrap();
        let before = write(&dir, "c.json", &module(3));
        let after = write(&dir, "d.json", &module(4));

        let (result, out, err) = run_diff(&[first, notes, before, after.clone()], &markers());
        assert!(result.is_ok());
        assert!(err.is_empty());
        assert_eq!(out, format!("diff --dast {}\nx = [-3-]->{{+4+}}\n", after.display()));
    }

    #[test]
    fn unchanged_pair_prints_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(&dir, "a.json", &module(1));
        let after = write(&dir, "b.json", &module(1));
        let (result, out, err) = run_diff(&[before, after], &markers());
        assert!(result.is_ok());
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn odd_number_of_paths_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let only = write(&dir, "a.json", &module(1));
        let (result, out, _) = run_diff(&[only], &markers());
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn json_report_carries_counters() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(&dir, "a.json", &module(1));
        let after = write(&dir, "b.json", &module(2));
        let output = Output { format: OutputFormat::Json, ..markers() };

        let (_, out, _) = run_diff(&[before, after], &output);
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(report["counts"]["changes"], 1);
        assert_eq!(report["counts"]["additions"], 0);
        assert_eq!(report["changes"]["records"].as_array().map(Vec::len), Some(1));
        assert!(report["summary"].as_array().unwrap().is_empty());
    }

    #[test]
    fn fingerprint_ignores_positions() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(&dir, "a.json", &json!({"_type": "Pass", "lineno": 1}));
        let b = write(&dir, "b.json", &json!({"_type": "Pass", "lineno": 9}));
        let print = |path: &Path| {
            let mut out = Vec::new();
            cmd_fingerprint(path, &DastConfig::default(), &markers(), &mut out).unwrap();
            String::from_utf8(out).unwrap()
        };
        let (fa, fb) = (print(&a), print(&b));
        assert_eq!(fa.split_whitespace().next(), fb.split_whitespace().next());
        assert_eq!(fa.split_whitespace().next().map(str::len), Some(64));
    }

    #[test]
    fn unparse_prints_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "t.json", &module(3));
        let mut out = Vec::new();
        cmd_unparse(&path, &DastConfig::default(), &markers(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "x = 3\n");
    }

    #[test]
    fn missing_file_fails_with_io_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        let err = cmd_unparse(&dir.path().join("gone.json"), &DastConfig::default(), &markers(), &mut out)
            .unwrap_err();
        assert!(err.to_string().starts_with("io:"));
    }
}
