//! `qat new` command - Create a report skeleton

use chrono::NaiveDate;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{load_config, save_report};
use crate::cli::GlobalOpts;
use crate::core::entity::Entity;
use crate::entities::equipment::{EquipmentInfo, EquipmentType};
use crate::entities::report::QaReport;

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Equipment type
    #[arg(long, short = 't', value_enum)]
    pub r#type: EquipmentType,

    /// Report title (default: "<equipment> QA")
    #[arg(long)]
    pub title: Option<String>,

    /// Tester name (default: config `tester`, then $USER)
    #[arg(long)]
    pub tester: Option<String>,

    #[arg(long)]
    pub make: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub serial: Option<String>,

    /// Room or department
    #[arg(long)]
    pub location: Option<String>,

    /// Date of test (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Biplane unit: create frontal and lateral tables
    #[arg(long)]
    pub double_tube: bool,

    /// Output file (default: <id>.qat.yaml in the current directory)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;

    if args.double_tube && !args.r#type.supports_double_tube() {
        return Err(miette::miette!(
            "{} units have a single tube; --double-tube is not available",
            args.r#type
        ));
    }

    let tester = args
        .tester
        .or_else(|| config.tester.clone())
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string());
    let title = args
        .title
        .unwrap_or_else(|| format!("{} QA", args.r#type.display_name()));

    let mut equipment = EquipmentInfo::new(args.r#type);
    equipment.make = args.make;
    equipment.model = args.model;
    equipment.serial_number = args.serial;
    equipment.location = args.location;
    equipment.double_tube = args.double_tube;

    let mut report = QaReport::skeleton(title, equipment, tester);
    report.institution = config.institution.clone();
    report.test_date = args.date;

    let path = args.output.unwrap_or_else(|| PathBuf::from(report.file_name()));
    if path.exists() {
        return Err(miette::miette!("{} already exists", path.display()));
    }
    save_report(&path, &report)?;

    println!(
        "{} Created report {} with {} test table(s)",
        style("✓").green(),
        style(report.id.short()).cyan(),
        report.tests.len()
    );
    println!("   {}", style(path.display()).dim());

    Ok(())
}
