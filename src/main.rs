use clap::{Parser, Subcommand};

mod cmd;
mod core;
mod money;

use cmd::{report::ReportCommand, schema::SchemaCommand, validate::ValidateCommand};

/// FIFO cost basis with short/long-term gain classification
#[derive(Parser, Debug)]
#[command(name = "accfifo", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match movements FIFO and report realised lots and disposals
    Report(ReportCommand),
    /// Check movements for problems that would distort the report
    Validate(ValidateCommand),
    /// Print the expected input formats
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
