//! Report case command handlers

use std::path::Path;

use crate::config::Config;
use crate::services::ReportCases;

pub fn cmd_report_cases_list(config: &Config) -> anyhow::Result<()> {
    let cases = ReportCases::load(Path::new(&config.reports.cases_path))?;

    if cases.is_empty() {
        println!("No report cases defined.");
        return Ok(());
    }

    println!("Report cases ({} total)", cases.len());
    println!("{:-<70}", "");
    for case in cases.sorted() {
        println!("{:>3}. {:<24} {}", case.number, case.case_type, case.description);
    }
    Ok(())
}

pub fn cmd_report_cases_add(
    config: &Config,
    case_type: &str,
    description: &str,
) -> anyhow::Result<()> {
    let path = Path::new(&config.reports.cases_path);
    let mut cases = ReportCases::load(path)?;

    let number = cases.add(case_type, description)?.number;
    cases.save(path)?;

    println!("Added case {number}.{case_type} to {}", path.display());
    Ok(())
}
