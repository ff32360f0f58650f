use std::path::PathBuf;

use chrono::{Local, Month, NaiveDate};

use crate::domain::{
    Cents, Expense, ExpenseFilter, ExpenseId, Ledger, MAX_AMOUNT, format_cents, parse_cents,
    sum_amounts,
};
use crate::storage::LedgerStore;

use super::AppError;

/// Application service providing the expense operations.
/// This is the primary interface for any client (CLI, tests, exporters).
///
/// The service keeps no state of its own: every call loads the ledger from
/// the store, works on that value, and saves it back when it changed.
pub struct LedgerService {
    store: LedgerStore,
}

/// Fields to change on an existing expense. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    /// Raw decimal text, validated like the amount given to `add_expense`
    pub amount: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.amount.is_none() && self.date.is_none()
    }
}

/// Totals over a (possibly filtered) set of expenses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: Cents,
    pub count: usize,
    /// Set when the summary is restricted to a month
    pub month_name: Option<&'static str>,
}

impl LedgerService {
    /// Create a new ledger service with the given store.
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Create a service backed by the JSON document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(LedgerStore::new(path))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Load the current ledger document.
    pub async fn load_ledger(&self) -> Result<Ledger, AppError> {
        Ok(self.store.load().await?)
    }

    // ========================
    // Mutations
    // ========================

    /// Record a new expense. `date` defaults to today.
    pub async fn add_expense(
        &self,
        description: &str,
        amount: &str,
        date: Option<NaiveDate>,
    ) -> Result<Expense, AppError> {
        let description = validate_description(description)?;
        let amount = validate_amount(amount)?;
        let date = date.unwrap_or_else(today);

        let mut ledger = self.store.load().await?;
        let expense = ledger.push(date, description, amount)?.clone();
        self.store.save(&ledger).await?;

        tracing::debug!(id = expense.id, amount = expense.amount, "added expense");
        Ok(expense)
    }

    /// Change the description, amount and/or date of an expense.
    pub async fn update_expense(
        &self,
        id: ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<Expense, AppError> {
        if update.is_empty() {
            return Err(AppError::validation("nothing to update"));
        }
        let description = update
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        let amount = update.amount.as_deref().map(validate_amount).transpose()?;

        let mut ledger = self.store.load().await?;
        if ledger.get(id).is_none() {
            return Err(AppError::NotFound(id));
        }

        // The amount goes first: it is the only change that can still be refused.
        if let Some(amount) = amount {
            ledger.set_amount(id, amount)?;
        }
        if let Some(description) = description {
            ledger.set_description(id, description);
        }
        if let Some(date) = update.date {
            ledger.set_date(id, date);
        }

        let expense = ledger.get(id).cloned().ok_or(AppError::NotFound(id))?;
        self.store.save(&ledger).await?;

        tracing::debug!(id, total = ledger.total, "updated expense");
        Ok(expense)
    }

    /// Delete an expense, returning the removed record.
    /// Ids of the remaining expenses never change.
    pub async fn delete_expense(&self, id: ExpenseId) -> Result<Expense, AppError> {
        let mut ledger = self.store.load().await?;
        let removed = ledger.remove(id).ok_or(AppError::NotFound(id))?;
        self.store.save(&ledger).await?;

        tracing::debug!(id, total = ledger.total, "deleted expense");
        Ok(removed)
    }

    // ========================
    // Queries
    // ========================

    /// List expenses in ledger order, optionally restricted to a month and/or year.
    pub async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, AppError> {
        validate_filter(filter)?;
        let ledger = self.store.load().await?;
        Ok(ledger.filtered(filter).cloned().collect())
    }

    /// Total and count over the filtered expenses.
    /// The total is summed from the expenses, not read from the cached ledger total.
    pub async fn get_summary(&self, filter: &ExpenseFilter) -> Result<Summary, AppError> {
        let month_name = validate_filter(filter)?;
        let ledger = self.store.load().await?;
        let expenses: Vec<&Expense> = ledger.filtered(filter).collect();

        let total = sum_amounts(expenses.iter().copied())
            .ok_or_else(|| anyhow::anyhow!("Ledger total overflows"))?;

        Ok(Summary {
            total,
            count: expenses.len(),
            month_name,
        })
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn validate_description(description: &str) -> Result<String, AppError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("description required"));
    }
    Ok(trimmed.to_string())
}

fn validate_amount(amount: &str) -> Result<Cents, AppError> {
    match parse_cents(amount) {
        Ok(cents) if cents > MAX_AMOUNT => Err(AppError::validation(format!(
            "amount must be at most {}",
            format_cents(MAX_AMOUNT)
        ))),
        Ok(cents) if cents > 0 => Ok(cents),
        _ => Err(AppError::validation("amount must be positive")),
    }
}

/// Check the month range and return its name when one is given.
fn validate_filter(filter: &ExpenseFilter) -> Result<Option<&'static str>, AppError> {
    let Some(month) = filter.month else {
        return Ok(None);
    };
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| Some(m.name()))
        .ok_or_else(|| AppError::validation(format!("month must be between 1 and 12, got {}", month)))
}
