use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Cents, decimal};

pub type ExpenseId = u64;

/// A single recorded spending entry.
/// The id is assigned by the ledger and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    /// Calendar day the money was spent
    pub date: NaiveDate,
    /// Trimmed, never empty
    pub description: String,
    /// Amount in cents (always positive)
    #[serde(with = "decimal")]
    pub amount: Cents,
}

impl Expense {
    pub fn new(id: ExpenseId, date: NaiveDate, description: String, amount: Cents) -> Self {
        Self {
            id,
            date,
            description,
            amount,
        }
    }

    pub fn is_in_month(&self, month: u32) -> bool {
        self.date.month() == month
    }

    pub fn is_in_year(&self, year: i32) -> bool {
        self.date.year() == year
    }
}

/// Restricts a listing or summary to a calendar month and/or year.
/// An empty filter matches every expense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// 1 = January ... 12 = December
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl ExpenseFilter {
    pub fn month(month: u32) -> Self {
        Self {
            month: Some(month),
            year: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        self.month.is_none_or(|m| expense.is_in_month(m))
            && self.year.is_none_or(|y| expense.is_in_year(y))
    }
}
