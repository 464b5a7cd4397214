//! `qat import` command - Load test rows from CSV

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{load_report, save_report};
use crate::entities::equipment::Tube;
use crate::entities::test_table::TestKind;
use crate::import::read_table_file;

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Report file to update
    pub report: PathBuf,

    /// Test type the CSV rows belong to
    #[arg(long, short = 't', value_enum)]
    pub test: TestKind,

    /// CSV file with a header row
    #[arg(long)]
    pub csv: PathBuf,

    /// Tube the rows belong to (double-tube units only)
    #[arg(long, value_enum)]
    pub tube: Option<Tube>,

    /// Replace existing rows instead of appending
    #[arg(long)]
    pub replace: bool,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let mut report = load_report(&args.report)?;
    if report.status.is_locked() {
        return Err(miette::miette!(
            "{} is {}; its readings can no longer change",
            args.report.display(),
            report.status
        ));
    }

    match (report.equipment.double_tube, args.tube) {
        (true, None) => {
            return Err(miette::miette!(
                "{} has two tubes; pass --tube frontal or --tube lateral",
                args.report.display()
            ))
        }
        (false, Some(tube)) => {
            return Err(miette::miette!(
                "--tube {} given but the report is for a single-tube unit",
                tube
            ))
        }
        _ => {}
    }

    let imported = read_table_file(args.test, &args.csv)
        .map_err(|e| miette::miette!("{}: {}", args.csv.display(), e))?;

    let table = report.table_or_insert(args.test, args.tube);
    if args.replace {
        table.clear_rows();
    }
    let added = table
        .append(imported)
        .map_err(|_| miette::miette!("imported table does not match {}", args.test))?;
    let total = table.row_count();

    save_report(&args.report, &report)?;

    println!(
        "{} Imported {} row(s) into {} ({} total)",
        style("✓").green(),
        style(added).cyan(),
        style(args.test).yellow(),
        total
    );
    if !report.equipment.equipment_type.required_tests().contains(&args.test) {
        println!(
            "   {} {} is not a required test for {}",
            style("note:").dim(),
            args.test,
            report.equipment.equipment_type
        );
    }

    Ok(())
}
