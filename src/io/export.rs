use anyhow::Result;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{ExpenseFilter, Ledger, format_cents};

/// Output format for `export`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Exporter for writing the expense list to other formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    pub async fn export<W: Write>(
        &self,
        format: ExportFormat,
        filter: &ExpenseFilter,
        writer: W,
    ) -> Result<usize> {
        match format {
            ExportFormat::Csv => self.export_csv(filter, writer).await,
            ExportFormat::Json => self.export_json(filter, writer).await.map(|l| l.count),
        }
    }

    /// Export expenses to CSV format
    pub async fn export_csv<W: Write>(&self, filter: &ExpenseFilter, writer: W) -> Result<usize> {
        let expenses = self.service.list_expenses(filter).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["id", "date", "description", "amount"])?;

        for expense in &expenses {
            csv_writer.write_record([
                expense.id.to_string(),
                expense.date.format("%Y-%m-%d").to_string(),
                expense.description.clone(),
                format_cents(expense.amount),
            ])?;
        }

        csv_writer.flush()?;
        Ok(expenses.len())
    }

    /// Export the matching expenses as a ledger document.
    /// `count` and `total` describe the exported subset; `nextId` is the ledger's.
    pub async fn export_json<W: Write>(
        &self,
        filter: &ExpenseFilter,
        mut writer: W,
    ) -> Result<Ledger> {
        let expenses = self.service.list_expenses(filter).await?;
        let ledger = self.service.load_ledger().await?;

        let mut snapshot = Ledger {
            count: 0,
            total: 0,
            next_id: ledger.next_id,
            expenses,
        };
        snapshot.recompute_totals()?;

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(snapshot)
    }
}
