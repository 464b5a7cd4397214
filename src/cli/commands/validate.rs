//! `qat validate` command - Check report files

use console::style;
use miette::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::helpers::load_config;
use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::entities::report::QaReport;
use crate::yaml::parse_yaml_file;

const REPORT_SUFFIX: &str = ".qat.yaml";

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Files or directories to validate (default: current directory)
    #[arg()]
    pub paths: Vec<PathBuf>,

    /// Strict mode - warnings become errors
    #[arg(long)]
    pub strict: bool,

    /// Continue validation after first error
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
}

/// Findings for one parsed report
#[derive(Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let mut stats = ValidationStats::default();
    let mut had_error = false;

    let files = if args.paths.is_empty() {
        expand_paths(&[PathBuf::from(".")])
    } else {
        expand_paths(&args.paths)
    };

    println!(
        "{} Validating {} file(s)...\n",
        style("→").blue(),
        files.len()
    );

    for path in &files {
        stats.files_checked += 1;

        let report: QaReport = match parse_yaml_file(path) {
            Ok(report) => report,
            Err(e) => {
                stats.files_failed += 1;
                stats.total_errors += 1;
                had_error = true;
                if !args.summary {
                    println!("{} {} - invalid report", style("✗").red(), path.display());
                    let report = miette::Report::new(e);
                    println!("{:?}", report);
                }
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        let findings = check_report(&report, &config);
        let error_count = findings.errors.len()
            + if args.strict { findings.warnings.len() } else { 0 };
        stats.total_warnings += findings.warnings.len();

        if error_count == 0 {
            stats.files_passed += 1;
            if !args.summary {
                println!("{} {}", style("✓").green(), path.display());
                for warning in &findings.warnings {
                    println!("    {} {}", style("warning:").yellow(), warning);
                }
            }
            continue;
        }

        stats.files_failed += 1;
        stats.total_errors += error_count;
        had_error = true;
        if !args.summary {
            println!(
                "{} {} - {} error(s)",
                style("✗").red(),
                path.display(),
                error_count
            );
            for error in &findings.errors {
                println!("    {} {}", style("error:").red(), error);
            }
            let label = if args.strict { "error:" } else { "warning:" };
            for warning in &findings.warnings {
                println!("    {} {}", style(label).yellow(), warning);
            }
        }
        if !args.keep_going {
            break;
        }
    }

    // Print summary
    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    if stats.total_warnings > 0 {
        println!("  Total warnings: {}", style(stats.total_warnings).yellow());
    }
    println!();

    if had_error {
        if stats.files_failed == 1 {
            Err(miette::miette!("Validation failed: 1 file has errors"))
        } else {
            Err(miette::miette!(
                "Validation failed: {} files have errors",
                stats.files_failed
            ))
        }
    } else {
        println!("{} All files passed validation!", style("✓").green().bold());
        Ok(())
    }
}

fn check_report(report: &QaReport, config: &Config) -> Findings {
    let mut findings = Findings::default();

    for table in &report.tests {
        let name = match table.tube() {
            Some(tube) => format!("{} ({})", table.kind(), tube),
            None => table.kind().to_string(),
        };

        if let Err(e) = table.validate(config) {
            findings.errors.push(format!("{}: {}", name, e));
        }
        if table.tube().is_some() && !report.equipment.double_tube {
            findings
                .warnings
                .push(format!("{}: tube set on a single-tube unit", name));
        }
        let unparseable = table.unparseable_readings();
        if unparseable > 0 {
            findings
                .warnings
                .push(format!("{}: {} unparseable reading(s)", name, unparseable));
        }
    }

    for (kind, tube) in report.missing_tests() {
        let name = match tube {
            Some(tube) => format!("{} ({})", kind, tube),
            None => kind.to_string(),
        };
        findings.warnings.push(format!("{}: required test has no table", name));
    }

    findings
}

/// Expand paths - if a directory is given, find all report files in it
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .into_iter()
                .filter_entry(|e| {
                    // Skip .qat, .git and other hidden directories
                    let name = e.file_name().to_string_lossy();
                    !name.starts_with('.') || e.depth() == 0
                })
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                if is_report_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if path.exists() {
            files.push(path.clone());
        }
    }

    files.sort();
    files
}

fn is_report_file(path: &Path) -> bool {
    path.to_string_lossy().ends_with(REPORT_SUFFIX)
}
