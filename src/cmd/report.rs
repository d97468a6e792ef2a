//! Report command - FIFO matches and disposal groups

use crate::cmd::read_movements;
use crate::core::{Fifo, Munch, TaxRow, Term, Warning};
use crate::money::{Money, CURRENCY_CODE};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Movements file (CSV or JSON). Reads CSV from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Only show disposal groups of this term
    #[arg(short, long, value_enum)]
    term: Option<TermFilter>,

    /// Fail instead of reporting when movements are not in date order
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Summary figures followed by one line per match and per disposal group
    #[default]
    Plain,
    /// Formatted tables
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TermFilter {
    Short,
    Long,
}

impl From<TermFilter> for Term {
    fn from(filter: TermFilter) -> Self {
        match filter {
            TermFilter::Short => Term::Short,
            TermFilter::Long => Term::Long,
        }
    }
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let movements = read_movements(&self.file)?;
        let fifo = Fifo::new(&movements);

        if self.strict && !fifo.warnings().is_empty() {
            anyhow::bail!(
                "{} movement(s) out of date order, first: {}",
                fifo.warnings().len(),
                fifo.warnings()[0]
            );
        }

        let term = self.term.map(Term::from);
        let tax_rows: Vec<TaxRow> = fifo
            .tax_rows()
            .filter(|row| term.map_or(true, |t| row.term() == t))
            .collect();

        match self.format {
            OutputFormat::Plain => {
                self.print_plain(&fifo, &tax_rows);
                Ok(())
            }
            OutputFormat::Table => {
                self.print_tables(&fifo, &tax_rows);
                Ok(())
            }
            OutputFormat::Json => self.print_json(&fifo, &tax_rows),
        }
    }

    fn print_plain(&self, fifo: &Fifo, tax_rows: &[TaxRow]) {
        println!("Available Stock          :  {}", fifo.stock());
        println!("Stock Valuation          :  {}", fifo.valuation());
        println!("Average Cost             :  {}", format_optional(fifo.average_cost()));
        println!("Factored Stock Valuation :  {}", fifo.valuation_factored());
        println!(
            "Factored Average Cost    :  {}",
            format_optional(fifo.average_cost_factored())
        );
        println!("Profit and Loss          :  {}", fifo.profit_and_loss());
        println!("Trace Length             :  {}", fifo.trace().len());
        println!("Total Runtime            :  {:?}", fifo.runtime());

        for munch in fifo.trace() {
            println!("{}", munch);
        }
        for row in tax_rows {
            println!("{}", row);
        }
    }

    fn print_tables(&self, fifo: &Fifo, tax_rows: &[TaxRow]) {
        println!();
        println!("ALL TRANSACTIONS");
        println!();
        if fifo.trace().is_empty() {
            println!("No matched transactions");
        } else {
            let rows: Vec<TraceRow> = fifo.trace().iter().map(TraceRow::from).collect();
            println!("{}", styled(Table::new(rows)));
        }

        println!();
        println!("DISPOSALS BY TERM (ST/LT)");
        println!();
        if tax_rows.is_empty() {
            println!("No disposals found matching filters");
        } else {
            let rows: Vec<TaxRowView> = tax_rows.iter().map(TaxRowView::from).collect();
            println!("{}", styled(Table::new(rows)));
        }

        println!();
        if fifo.is_empty() {
            println!("No open position");
        } else {
            println!(
                "Open position: {} | Valuation: {} | Average cost: {}",
                fifo.stock(),
                fifo.valuation(),
                format_optional(fifo.average_cost())
            );
        }
    }

    fn print_json(&self, fifo: &Fifo, tax_rows: &[TaxRow]) -> anyhow::Result<()> {
        let output = ReportOutput {
            currency: CURRENCY_CODE,
            stock: fifo.stock(),
            valuation: fifo.valuation(),
            valuation_factored: fifo.valuation_factored(),
            average_cost: fifo.average_cost(),
            average_cost_factored: fifo.average_cost_factored(),
            profit_and_loss: fifo.profit_and_loss(),
            profit_and_loss_factored: fifo.profit_and_loss_factored(),
            trace: fifo.trace().iter().map(TraceOutput::from).collect(),
            tax_rows: tax_rows.iter().map(TaxRowOutput::from).collect(),
            warnings: fifo.warnings(),
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

fn styled(mut table: Table) -> String {
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string()
}

fn format_optional(amount: Option<Money>) -> String {
    amount.map_or_else(|| "-".to_string(), |a| a.to_string())
}

#[derive(Debug, Clone, Tabled)]
struct TraceRow {
    #[tabled(rename = "In Tx")]
    opening_id: String,
    #[tabled(rename = "In Date")]
    opening_date: String,
    #[tabled(rename = "Qty")]
    quantity: i64,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Out Tx")]
    closing_id: String,
    #[tabled(rename = "Out Date")]
    closing_date: String,
    #[tabled(rename = "Term")]
    term: Term,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
}

impl From<&Munch> for TraceRow {
    fn from(m: &Munch) -> Self {
        TraceRow {
            opening_id: m.opening().id.clone(),
            opening_date: m.opening().date.format("%Y-%m-%d").to_string(),
            quantity: m.quantity(),
            cost_basis: m.cost_basis().to_string(),
            closing_id: m.closing_id().to_string(),
            closing_date: m.closing().date.format("%Y-%m-%d").to_string(),
            term: m.term(),
            proceeds: (-m.proceeds()).to_string(),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
struct TaxRowView {
    #[tabled(rename = "Tx")]
    closing_id: String,
    #[tabled(rename = "Qty")]
    quantity: i64,
    #[tabled(rename = "Term")]
    term: Term,
    #[tabled(rename = "Proceeds")]
    proceeds: String,
    #[tabled(rename = "Cost Basis")]
    cost_basis: String,
    #[tabled(rename = "Gain/Loss")]
    gain: String,
}

impl From<&TaxRow<'_>> for TaxRowView {
    fn from(row: &TaxRow<'_>) -> Self {
        TaxRowView {
            closing_id: row.closing_id().to_string(),
            quantity: row.quantity(),
            term: row.term(),
            proceeds: row.proceeds().to_string(),
            cost_basis: row.cost_basis().to_string(),
            gain: row.gain().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    currency: &'static str,
    stock: i64,
    valuation: Money,
    valuation_factored: Money,
    average_cost: Option<Money>,
    average_cost_factored: Option<Money>,
    profit_and_loss: Money,
    profit_and_loss_factored: Money,
    trace: Vec<TraceOutput<'a>>,
    tax_rows: Vec<TaxRowOutput<'a>>,
    warnings: &'a [Warning],
}

#[derive(Debug, Serialize)]
struct TraceOutput<'a> {
    #[serde(flatten)]
    munch: &'a Munch,
    quantity: i64,
    cost_basis: Money,
    proceeds: Money,
    holding_days: i64,
    term: Term,
}

impl<'a> From<&'a Munch> for TraceOutput<'a> {
    fn from(munch: &'a Munch) -> Self {
        TraceOutput {
            munch,
            quantity: munch.quantity(),
            cost_basis: munch.cost_basis(),
            proceeds: munch.proceeds(),
            holding_days: munch.holding_period().num_days(),
            term: munch.term(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TaxRowOutput<'a> {
    tx: &'a str,
    term: Term,
    quantity: i64,
    cost_basis: Money,
    proceeds: Money,
    gain: Money,
    matches: usize,
}

impl<'a> From<&TaxRow<'a>> for TaxRowOutput<'a> {
    fn from(row: &TaxRow<'a>) -> Self {
        TaxRowOutput {
            tx: row.closing_id(),
            term: row.term(),
            quantity: row.quantity(),
            cost_basis: row.cost_basis(),
            proceeds: row.proceeds(),
            gain: row.gain(),
            matches: row.munches().len(),
        }
    }
}
