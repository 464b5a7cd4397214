//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    calc::CalcArgs, completions::CompletionsArgs, eval::EvalArgs, import::ImportArgs,
    init::InitArgs, new::NewArgs, render::RenderArgs, validate::ValidateArgs,
};

/// QA Tolerance Toolkit - evaluate AERB X-ray QA test tables kept as YAML
#[derive(Parser, Debug)]
#[command(name = "qat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Decimal places for statistics (overrides config and QAT_DECIMALS)
    #[arg(long, global = true)]
    pub decimals: Option<usize>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Table on a terminal, YAML for single documents
    #[default]
    Auto,
    Table,
    Yaml,
    Json,
    /// Tab-separated values
    Tsv,
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a .qat/config.yaml in the current directory
    Init(InitArgs),

    /// Create a report skeleton for a piece of equipment
    New(NewArgs),

    /// Compute a statistic over values and judge it against a tolerance
    Calc(CalcArgs),

    /// Evaluate every test table of a report
    Eval(EvalArgs),

    /// Import test rows from a CSV file into a report
    Import(ImportArgs),

    /// Check reports for malformed tolerances and missing tests
    Validate(ValidateArgs),

    /// Render a report as printable HTML
    Render(RenderArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_opts_after_subcommand() {
        let cli = Cli::try_parse_from(["qat", "eval", "report.qat.yaml", "-f", "json", "-vv"])
            .unwrap();
        assert_eq!(cli.global.format, OutputFormat::Json);
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.command, Commands::Eval(_)));
    }
}
