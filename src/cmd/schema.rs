//! Schema command - describe the movement input the decoder accepts

use crate::core::input::{Column, MovementInput, COLUMNS, MAX_FACTOR, MAX_PRICE, MAX_VOLUME};
use clap::{Args, ValueEnum};
use schemars::schema_for;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct SchemaCommand {
    #[arg(value_enum, default_value_t = SchemaFormat::JsonSchema)]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema of the `{"movements": [...]}` input
    JsonSchema,
    /// CSV header row with every recognised column
    CsvHeader,
    /// Table of CSV columns and input limits
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let out = match self.format {
            SchemaFormat::JsonSchema => serde_json::to_string_pretty(&schema_for!(MovementInput))?,
            SchemaFormat::CsvHeader => csv_header(),
            SchemaFormat::CsvFields => csv_fields(),
        };
        println!("{}", out);
        Ok(())
    }
}

fn csv_header() -> String {
    COLUMNS
        .iter()
        .map(|column| column.name)
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "Column")]
    name: &'static str,
    #[tabled(rename = "Required")]
    required: &'static str,
    #[tabled(rename = "Description")]
    description: &'static str,
}

impl From<&Column> for ColumnRow {
    fn from(column: &Column) -> Self {
        ColumnRow {
            name: column.name,
            required: if column.required { "yes" } else { "" },
            description: column.description,
        }
    }
}

fn csv_fields() -> String {
    let mut table = Table::new(COLUMNS.iter().map(ColumnRow::from));
    table.with(Style::rounded());
    format!(
        "{}\n\nRows must be in date order. Any other non-empty column is kept as metadata.\n\
         Limits: total |Qty| {}, Cost {}, |Factor| {}.",
        table, MAX_VOLUME, MAX_PRICE, MAX_FACTOR
    )
}
