use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::application::{ExpenseUpdate, LedgerService};
use crate::domain::{Expense, ExpenseFilter, ExpenseId, format_cents};
use crate::io::{ExportFormat, Exporter};
use crate::storage::DEFAULT_LEDGER_FILE;

/// Expense Tracker - record and summarize personal expenses
#[derive(Parser, Debug)]
#[command(name = "expense-tracker")]
#[command(about = "A simple expense tracker backed by a single JSON file")]
#[command(version)]
pub struct Cli {
    /// Ledger file path
    #[arg(long, global = true, env = "EXPENSE_TRACKER_FILE", default_value = DEFAULT_LEDGER_FILE)]
    pub file: String,

    /// Enable verbose (debug) logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a new expense
    Add {
        /// What the money was spent on
        #[arg(short, long)]
        description: String,

        /// Amount spent (e.g., "20" or "12.50")
        #[arg(short, long, allow_hyphen_values = true)]
        amount: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Update an existing expense
    Update {
        /// Expense ID
        id: ExpenseId,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New amount
        #[arg(short, long, allow_hyphen_values = true)]
        amount: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete an expense by ID
    Delete {
        /// Expense ID
        id: ExpenseId,
    },

    /// List expenses
    List(PeriodArgs),

    /// Show the total of all expenses, or of one month
    Summary(PeriodArgs),

    /// Export expenses to CSV or JSON
    Export {
        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        period: PeriodArgs,
    },
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct PeriodArgs {
    /// Only include this month (1-12)
    #[arg(short, long)]
    pub month: Option<u32>,

    /// Only include this year
    #[arg(short, long)]
    pub year: Option<i32>,
}

impl From<PeriodArgs> for ExpenseFilter {
    fn from(args: PeriodArgs) -> Self {
        ExpenseFilter {
            month: args.month,
            year: args.year,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        self.run_with_output(&mut std::io::stdout().lock()).await
    }

    /// Run the command, writing its report to `out` instead of stdout.
    pub async fn run_with_output<W: Write>(self, out: &mut W) -> Result<()> {
        let service = LedgerService::open(&self.file);
        tracing::debug!(file = %self.file, "using ledger file");

        match self.command {
            Commands::Add {
                description,
                amount,
                date,
            } => {
                let date = date.as_deref().map(parse_date).transpose()?;
                let expense = service.add_expense(&description, &amount, date).await?;
                writeln!(out, "Expense added successfully (ID: {})", expense.id)?;
            }

            Commands::Update {
                id,
                description,
                amount,
                date,
            } => {
                let date = date.as_deref().map(parse_date).transpose()?;
                let update = ExpenseUpdate {
                    description,
                    amount,
                    date,
                };
                let expense = service.update_expense(id, update).await?;
                writeln!(out, "Expense updated successfully (ID: {})", expense.id)?;
            }

            Commands::Delete { id } => {
                service.delete_expense(id).await?;
                writeln!(out, "Expense deleted successfully (ID: {})", id)?;
            }

            Commands::List(period) => {
                let expenses = service.list_expenses(&period.into()).await?;
                print_expenses(out, &expenses)?;
            }

            Commands::Summary(period) => {
                let summary = service.get_summary(&period.into()).await?;
                let scope = match (summary.month_name, period.year) {
                    (Some(month), Some(year)) => format!(" for {} {}", month, year),
                    (Some(month), None) => format!(" for {}", month),
                    (None, Some(year)) => format!(" for {}", year),
                    (None, None) => String::new(),
                };
                writeln!(
                    out,
                    "Total expenses{}: ${}",
                    scope,
                    format_cents(summary.total)
                )?;
            }

            Commands::Export {
                format,
                output,
                period,
            } => {
                run_export_command(&service, format, output.as_deref(), &period.into(), out)
                    .await?;
            }
        }

        Ok(())
    }
}

/// The export is rendered in memory first, so a failed export never
/// truncates an existing output file.
async fn run_export_command<W: Write>(
    service: &LedgerService,
    format: ExportFormat,
    output: Option<&str>,
    filter: &ExpenseFilter,
    out: &mut W,
) -> Result<()> {
    let mut buffer = Vec::new();
    let count = Exporter::new(service)
        .export(format, filter, &mut buffer)
        .await?;

    match output {
        Some(path) => {
            std::fs::write(path, &buffer)
                .with_context(|| format!("Failed to write file: {}", path))?;
            eprintln!("Exported {} expenses to {}", count, path);
        }
        None => {
            out.write_all(&buffer)?;
            out.flush()?;
        }
    }

    Ok(())
}

fn print_expenses<W: Write>(out: &mut W, expenses: &[Expense]) -> Result<()> {
    if expenses.is_empty() {
        writeln!(out, "No expenses found.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<6} {:<12} {:<30} {:>10}",
        "ID", "DATE", "DESCRIPTION", "AMOUNT"
    )?;
    writeln!(out, "{}", "-".repeat(61))?;
    for expense in expenses {
        writeln!(
            out,
            "{:<6} {:<12} {:<30} {:>10}",
            expense.id,
            expense.date.format("%Y-%m-%d"),
            truncate(&expense.description, 30),
            format!("${}", format_cents(expense.amount))
        )?;
    }
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_command() {
        let cli = Cli::try_parse_from([
            "expense-tracker",
            "add",
            "--description",
            "Lunch",
            "--amount",
            "20",
        ])
        .unwrap();

        assert_eq!(cli.file, DEFAULT_LEDGER_FILE);
        match cli.command {
            Commands::Add {
                description,
                amount,
                date,
            } => {
                assert_eq!(description, "Lunch");
                assert_eq!(amount, "20");
                assert!(date.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_negative_amount_reaches_validation() {
        let cli =
            Cli::try_parse_from(["expense-tracker", "add", "-d", "Refund", "-a", "-5"]).unwrap();
        assert!(matches!(cli.command, Commands::Add { amount, .. } if amount == "-5"));
    }

    #[test]
    fn test_global_file_option_after_subcommand() {
        let cli =
            Cli::try_parse_from(["expense-tracker", "list", "--file", "/tmp/x.json", "-m", "3"])
                .unwrap();
        assert_eq!(cli.file, "/tmp/x.json");
        match cli.command {
            Commands::List(period) => {
                assert_eq!(ExpenseFilter::from(period), ExpenseFilter::month(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_defaults_to_csv() {
        let cli = Cli::try_parse_from(["expense-tracker", "export"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Export {
                format: ExportFormat::Csv,
                output: None,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_requires_numeric_id() {
        assert!(Cli::try_parse_from(["expense-tracker", "delete", "abc"]).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("29/02/2024").is_err());
    }

    async fn run_in(temp: &tempfile::TempDir, args: &[&str]) -> Result<String> {
        let file = temp.path().join("expenses.json");
        let mut argv = vec!["expense-tracker", "--file", file.to_str().unwrap()];
        argv.extend_from_slice(args);

        let mut out = Vec::new();
        Cli::try_parse_from(argv)?.run_with_output(&mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn test_commands_report_on_output() -> Result<()> {
        let temp = tempfile::TempDir::new()?;

        let out = run_in(&temp, &["add", "-d", "Coffee", "-a", "3.50", "--date", "2024-03-02"]).await?;
        assert_eq!(out, "Expense added successfully (ID: 1)\n");
        run_in(&temp, &["add", "-d", "Rent", "-a", "950", "--date", "2024-04-01"]).await?;
        run_in(&temp, &["add", "-d", "Book", "-a", "12.999", "--date", "2024-03-10"]).await?;

        let out = run_in(&temp, &["update", "1", "-a", "4"]).await?;
        assert_eq!(out, "Expense updated successfully (ID: 1)\n");

        let out = run_in(&temp, &["delete", "2"]).await?;
        assert_eq!(out, "Expense deleted successfully (ID: 2)\n");

        let out = run_in(&temp, &["list"]).await?;
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[0].contains("DESCRIPTION"));
        assert!(lines[2].starts_with("1 ") && lines[2].ends_with("$4.00"));
        assert!(lines[3].starts_with("3 ") && lines[3].ends_with("$13.00"));

        let out = run_in(&temp, &["list", "-m", "4"]).await?;
        assert_eq!(out, "No expenses found.\n");

        let out = run_in(&temp, &["summary"]).await?;
        assert_eq!(out, "Total expenses: $17.00\n");
        let out = run_in(&temp, &["summary", "-m", "3"]).await?;
        assert_eq!(out, "Total expenses for March: $17.00\n");
        let out = run_in(&temp, &["summary", "-m", "3", "-y", "2023"]).await?;
        assert_eq!(out, "Total expenses for March 2023: $0.00\n");

        let out = run_in(&temp, &["export"]).await?;
        assert_eq!(
            out,
            "id,date,description,amount\n1,2024-03-02,Coffee,4.00\n3,2024-03-10,Book,13.00\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_command_errors_propagate() -> Result<()> {
        let temp = tempfile::TempDir::new()?;

        let err = run_in(&temp, &["delete", "7"]).await.unwrap_err();
        assert_eq!(format!("{:#}", err), "Expense not found: 7");

        let err = run_in(&temp, &["add", "-d", "Lunch", "-a", "0"]).await.unwrap_err();
        assert_eq!(format!("{:#}", err), "amount must be positive");

        let err = run_in(&temp, &["add", "-d", "Lunch", "-a", "5", "--date", "yesterday"])
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Use YYYY-MM-DD"));
        Ok(())
    }

    #[tokio::test]
    async fn test_export_to_file() -> Result<()> {
        let temp = tempfile::TempDir::new()?;
        let target = temp.path().join("march.json");
        run_in(&temp, &["add", "-d", "Coffee", "-a", "3.50", "--date", "2024-03-02"]).await?;

        let out = run_in(
            &temp,
            &["export", "-f", "json", "-o", target.to_str().unwrap(), "-m", "3"],
        )
        .await?;
        assert!(out.is_empty());

        let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&target)?)?;
        assert_eq!(doc["count"], 1);
        assert_eq!(doc["expenses"][0]["description"], "Coffee");
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_export_keeps_existing_output_file() -> Result<()> {
        let temp = tempfile::TempDir::new()?;
        let target = temp.path().join("report.csv");
        std::fs::write(&target, "previous report\n")?;

        let err = run_in(&temp, &["export", "-o", target.to_str().unwrap(), "-m", "13"])
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("month must be between 1 and 12"));
        assert_eq!(std::fs::read_to_string(&target)?, "previous report\n");
        Ok(())
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long description here", 10), "a long ...");
    }
}
