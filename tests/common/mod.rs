// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use expense_tracker::application::LedgerService;
use expense_tracker::domain::Expense;
use tempfile::TempDir;

/// Helper to create a test service backed by a ledger file in a temporary directory.
/// The file itself does not exist until the first operation.
pub fn test_service() -> (LedgerService, TempDir) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let service = LedgerService::open(ledger_path(&temp_dir));
    (service, temp_dir)
}

pub fn ledger_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("expenses.json")
}

/// Helper to parse a date string into a NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Read the raw document from disk, bypassing the store.
pub fn read_document(temp_dir: &TempDir) -> serde_json::Value {
    let data = std::fs::read_to_string(ledger_path(temp_dir)).unwrap();
    serde_json::from_str(&data).unwrap()
}

/// Test fixture: a few expenses spread over two months of 2024
pub struct StandardExpenses;

impl StandardExpenses {
    /// Coffee (Mar), Rent (Apr), Groceries (Mar), Cinema (Apr)
    pub async fn create(service: &LedgerService) -> Result<Vec<Expense>> {
        let mut created = Vec::new();
        for (description, amount, date) in [
            ("Coffee", "3.50", "2024-03-02"),
            ("Rent", "950", "2024-04-01"),
            ("Groceries", "42.10", "2024-03-18"),
            ("Cinema", "12", "2024-04-20"),
        ] {
            created.push(
                service
                    .add_expense(description, amount, Some(parse_date(date)))
                    .await?,
            );
        }
        Ok(created)
    }
}
