//! `qat eval` command - Evaluate a report

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{format_verdict, load_config, load_report};
use crate::cli::output::effective_format;
use crate::cli::table::{evaluation_table, flat_rows, to_csv, to_tsv};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::verdict::Verdict;
use crate::entities::test_table::TestKind;

#[derive(clap::Args, Debug)]
pub struct EvalArgs {
    /// Report file (*.qat.yaml)
    pub report: PathBuf,

    /// Only show tables of this test type
    #[arg(long, short = 't', value_enum)]
    pub test: Option<TestKind>,

    /// Exit with an error when the overall result is Fail
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: EvalArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let report = load_report(&args.report)?;
    let mut evaluation = report
        .evaluate(&config)
        .map_err(|e| miette::miette!("{}: {}", args.report.display(), e))?;

    if let Some(kind) = args.test {
        evaluation.tables.retain(|t| t.test == kind);
    }

    let decimals = config.decimals();
    match effective_format(global.format, false) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&evaluation).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&evaluation).into_diagnostic()?);
        }
        OutputFormat::Tsv => print!("{}", to_tsv(&flat_rows(&evaluation, decimals))),
        OutputFormat::Csv => print!("{}", to_csv(&flat_rows(&evaluation, decimals))),
        OutputFormat::Table | OutputFormat::Auto => {
            println!(
                "{} {}",
                style(&evaluation.title).bold(),
                style(format!("({})", report.id.short())).dim()
            );
            println!("{}", style(report.equipment.equipment_type.display_name()).dim());

            for table in &evaluation.tables {
                println!();
                let tube = table
                    .tube
                    .map(|t| format!(" [{}]", t))
                    .unwrap_or_default();
                println!(
                    "{}{} {}",
                    style(table.test.title()).cyan().bold(),
                    tube,
                    format_verdict(Some(table.verdict))
                );
                if table.rows.is_empty() {
                    println!("  {}", style("no rows").dim());
                } else {
                    println!("{}", evaluation_table(table, decimals));
                }
            }

            if !evaluation.missing.is_empty() {
                println!();
                println!(
                    "{} Missing tests: {}",
                    style("!").yellow(),
                    evaluation.missing.join(", ")
                );
            }

            println!();
            println!(
                "{}: {}",
                style("Overall").bold(),
                format_verdict(Some(evaluation.verdict))
            );
        }
    }

    if args.strict && evaluation.verdict == Verdict::Fail {
        return Err(miette::miette!(
            "{} failed one or more tests",
            args.report.display()
        ));
    }

    Ok(())
}
