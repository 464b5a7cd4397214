//! `qat render` command - Printable HTML report

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::{load_config, load_report, sibling_path};
use crate::cli::GlobalOpts;
use crate::render::ReportRenderer;

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Report file (*.qat.yaml)
    pub report: PathBuf,

    /// Output file (default: report name with .html)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write the HTML to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

pub fn run(args: RenderArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let report = load_report(&args.report)?;
    let evaluation = report
        .evaluate(&config)
        .map_err(|e| miette::miette!("{}: {}", args.report.display(), e))?;

    let renderer = ReportRenderer::new().map_err(|e| miette::miette!("{}", e))?;
    let html = renderer
        .render_html(&report, &evaluation, config.decimals())
        .map_err(|e| miette::miette!("{}", e))?;

    if args.stdout {
        print!("{}", html);
        return Ok(());
    }

    let path = args
        .output
        .unwrap_or_else(|| sibling_path(&args.report, "html"));
    std::fs::write(&path, html).into_diagnostic()?;

    println!(
        "{} Rendered {}",
        style("✓").green(),
        style(path.display()).cyan()
    );

    Ok(())
}
