//! `qat init` command - Create project configuration

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;

use crate::core::config::{Config, PROJECT_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let path = Config::project_path(&cwd);

    if path.exists() && !args.force {
        return Err(miette::miette!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }

    fs::create_dir_all(cwd.join(PROJECT_DIR)).into_diagnostic()?;
    fs::write(&path, Config::template()).into_diagnostic()?;

    println!(
        "{} Initialized QA project in {}",
        style("✓").green(),
        style(cwd.display()).cyan()
    );
    println!("   {}", style(path.display()).dim());
    println!();
    println!(
        "Next: {}",
        style("qat new --type ct --title \"Annual QA\"").yellow()
    );

    Ok(())
}
