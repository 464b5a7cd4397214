//! `qat calc` command - Evaluate one statistic against a tolerance

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::helpers::{format_verdict, load_config};
use crate::cli::output::effective_format;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::reading::{valid_values, Reading};
use crate::core::stats::StatisticKind;
use crate::core::tolerance::ToleranceSpec;
use crate::core::verdict::{self, Verdict};
use crate::render::format_value;

#[derive(clap::Args, Debug)]
pub struct CalcArgs {
    /// Readings (blank or non-numeric entries are ignored)
    #[arg(required = true, allow_negative_numbers = true)]
    pub values: Vec<String>,

    /// Statistic to compute
    #[arg(long, short = 's', value_enum, default_value = "mean")]
    pub stat: StatisticKind,

    /// Nominal value for deviations; also centres a ± tolerance
    #[arg(long, short = 'n', allow_negative_numbers = true)]
    pub nominal: Option<f64>,

    /// Tolerance, e.g. "<= 5%", ">= 2.9", "± 2"
    #[arg(long, short = 't')]
    pub tolerance: Option<ToleranceSpec>,

    /// Centre for a ± tolerance (default: --nominal)
    #[arg(long, allow_negative_numbers = true)]
    pub center: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CalcResult {
    statistic: StatisticKind,
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tolerance: Option<String>,
    verdict: Verdict,
}

pub fn run(args: CalcArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let readings: Vec<Reading> = args.values.iter().map(Reading::parse).collect();
    let values = valid_values(&readings);

    let value = args.stat.compute(&values, args.nominal);

    let rule = match &args.tolerance {
        Some(spec) => {
            let spec = match (spec.is_plus_minus(), spec.center, args.center.or(args.nominal)) {
                (true, None, Some(center)) => spec.centered_at(center),
                _ => spec.clone(),
            };
            let rule = spec.to_rule().map_err(|e| miette::miette!("{}", e))?;
            Some(if args.stat.is_fraction() {
                rule.as_fraction()
            } else {
                rule
            })
        }
        None => None,
    };
    let verdict = verdict::evaluate_optional(value, rule.as_ref());

    let result = CalcResult {
        statistic: args.stat,
        value,
        tolerance: rule.map(|r| r.to_string()),
        verdict,
    };

    match effective_format(global.format, false) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&result).into_diagnostic()?);
        }
        OutputFormat::Tsv | OutputFormat::Csv => {
            let sep = if global.format == OutputFormat::Csv { "," } else { "\t" };
            println!(
                "{}{sep}{}{sep}{}",
                result.statistic,
                result
                    .value
                    .map(|v| format!("{:.*}", config.decimals(), v))
                    .unwrap_or_default(),
                result.verdict
            );
        }
        OutputFormat::Table | OutputFormat::Auto => {
            println!(
                "{}: {}",
                style(result.statistic).bold(),
                format_value(result.value, config.decimals())
            );
            if let Some(tolerance) = &result.tolerance {
                println!("{}: {}", style("Tolerance").bold(), tolerance);
            }
            println!(
                "{}: {}",
                style("Result").bold(),
                format_verdict(Some(result.verdict))
            );
        }
    }

    Ok(())
}
