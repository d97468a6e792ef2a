//! Validate command - surface input problems without generating a full report

use crate::cmd::read_movements;
use crate::core::{Fifo, Warning};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Movements file (CSV or JSON). Reads CSV from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: &'static str,
    entry: usize,
    tx: String,
    date: String,
    message: String,
}

impl From<&Warning> for ValidationIssue {
    fn from(warning: &Warning) -> Self {
        match warning {
            Warning::OutOfOrder {
                index, id, date, ..
            } => ValidationIssue {
                issue_type: warning.kind(),
                entry: index + 1,
                tx: id.clone(),
                date: date.format("%Y-%m-%d").to_string(),
                message: warning.to_string(),
            },
        }
    }
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    movement_count: usize,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let movements = read_movements(&self.file)?;
        let fifo = Fifo::new(&movements);

        let issues: Vec<ValidationIssue> =
            fifo.warnings().iter().map(ValidationIssue::from).collect();

        if self.json {
            self.print_json(movements.len(), &issues)?;
        } else {
            self.print_text(movements.len(), &issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, movement_count: usize, issues: &[ValidationIssue]) {
        println!();
        println!("VALIDATION RESULTS ({} movements)", movement_count);
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
        } else {
            println!("\u{26A0} {} issue(s) found:", issues.len());
            println!();

            for (i, issue) in issues.iter().enumerate() {
                println!(
                    "  {}. [{}] {} tx {}",
                    i + 1,
                    issue.issue_type,
                    issue.date,
                    issue.tx
                );
                println!("     {}", issue.message);
                println!();
            }
        }
    }

    fn print_json(&self, movement_count: usize, issues: &[ValidationIssue]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            movement_count,
            issue_count: issues.len(),
            issues: issues.to_vec(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
