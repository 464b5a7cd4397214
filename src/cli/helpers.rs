//! Shared helper functions for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::verdict::Verdict;
use crate::entities::report::QaReport;
use crate::yaml::{parse_yaml_file, write_yaml_file};

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Tabs and newlines would break TSV columns
pub fn escape_tsv(s: &str) -> String {
    s.replace(['\t', '\n'], " ")
}

/// Verdict label coloured for the terminal. `None` marks a reference row.
pub fn format_verdict(verdict: Option<Verdict>) -> String {
    match verdict {
        Some(Verdict::Pass) => style("Pass").green().bold().to_string(),
        Some(Verdict::Fail) => style("Fail").red().bold().to_string(),
        Some(Verdict::Undetermined) => style(Verdict::Undetermined.label()).dim().to_string(),
        None => style("ref").dim().to_string(),
    }
}

/// Config for the current directory, with the `--decimals` flag applied
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut config = Config::load(&cwd).map_err(|e| miette::miette!("{}", e))?;
    if global.decimals.is_some() {
        config.decimals = global.decimals;
    }
    Ok(config)
}

pub fn load_report(path: &Path) -> Result<QaReport> {
    if !path.exists() {
        return Err(miette::miette!("Report not found: {}", path.display()));
    }
    Ok(parse_yaml_file(path)?)
}

pub fn save_report(path: &Path, report: &QaReport) -> Result<()> {
    Ok(write_yaml_file(path, report)?)
}

/// `report.qat.yaml` -> `report.<extension>`
pub fn sibling_path(report: &Path, extension: &str) -> PathBuf {
    let name = report
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(".qat.yaml")
        .or_else(|| name.strip_suffix(".yaml"))
        .or_else(|| name.strip_suffix(".yml"))
        .unwrap_or(&name);
    report.with_file_name(format!("{}.{}", stem, extension))
}
