use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Cents, Expense, ExpenseFilter, ExpenseId, MAX_AMOUNT, decimal, format_cents};

/// The whole persisted document: every expense plus the derived totals
/// and the id counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    /// Always equal to `expenses.len()` after a completed operation
    pub count: usize,
    /// Sum of all amounts, in cents
    #[serde(with = "decimal")]
    pub total: Cents,
    /// Next id to hand out. Only ever grows.
    pub next_id: ExpenseId,
    /// Insertion order is chronological add order
    pub expenses: Vec<Expense>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            count: 0,
            total: 0,
            next_id: 1,
            expenses: Vec::new(),
        }
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new expense, assigning it the next id.
    /// Nothing changes if the id counter or the total would overflow.
    pub fn push(
        &mut self,
        date: NaiveDate,
        description: String,
        amount: Cents,
    ) -> Result<&Expense, LedgerError> {
        let id = self.next_id;
        let next_id = id.checked_add(1).ok_or(LedgerError::IdsExhausted)?;
        let total = checked_total(self.total.checked_add(amount))?;

        self.next_id = next_id;
        self.total = total;
        self.expenses.push(Expense::new(id, date, description, amount));
        self.count = self.expenses.len();
        Ok(&self.expenses[self.expenses.len() - 1])
    }

    pub fn get(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    /// Replace the amount of an expense, adjusting the total by the difference.
    /// Returns the previous amount, or `None` if the id is unknown.
    pub fn set_amount(
        &mut self,
        id: ExpenseId,
        amount: Cents,
    ) -> Result<Option<Cents>, LedgerError> {
        let Some(expense) = self.expenses.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        let total = checked_total(
            amount
                .checked_sub(expense.amount)
                .and_then(|diff| self.total.checked_add(diff)),
        )?;

        let previous = std::mem::replace(&mut expense.amount, amount);
        self.total = total;
        Ok(Some(previous))
    }

    pub fn set_description(&mut self, id: ExpenseId, description: String) -> Option<()> {
        let expense = self.expenses.iter_mut().find(|e| e.id == id)?;
        expense.description = description;
        Some(())
    }

    pub fn set_date(&mut self, id: ExpenseId, date: NaiveDate) -> Option<()> {
        let expense = self.expenses.iter_mut().find(|e| e.id == id)?;
        expense.date = date;
        Some(())
    }

    /// Remove an expense. Remaining ids are untouched and `next_id` is not rewound.
    pub fn remove(&mut self, id: ExpenseId) -> Option<Expense> {
        let index = self.expenses.iter().position(|e| e.id == id)?;
        let removed = self.expenses.remove(index);
        self.total -= removed.amount;
        self.count = self.expenses.len();
        Some(removed)
    }

    /// Iterate over the expenses matching a filter, in ledger order.
    pub fn filtered<'a>(
        &'a self,
        filter: &'a ExpenseFilter,
    ) -> impl Iterator<Item = &'a Expense> + 'a {
        self.expenses.iter().filter(move |e| filter.matches(e))
    }

    /// Recompute `count` and `total` from the expense list.
    /// Returns true if either cached value was stale.
    pub fn recompute_totals(&mut self) -> Result<bool, LedgerError> {
        let count = self.expenses.len();
        let total = checked_total(sum_amounts(&self.expenses))?;
        let stale = count != self.count || total != self.total;
        self.count = count;
        self.total = total;
        Ok(stale)
    }

    /// Check the structural invariants that cannot be repaired by recomputation.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for expense in &self.expenses {
            if !seen.insert(expense.id) {
                issues.push(IntegrityIssue::DuplicateId(expense.id));
            }
            if expense.id >= self.next_id {
                issues.push(IntegrityIssue::IdNotBelowNextId {
                    id: expense.id,
                    next_id: self.next_id,
                });
            }
            if expense.amount <= 0 {
                issues.push(IntegrityIssue::NonPositiveAmount {
                    id: expense.id,
                    amount: expense.amount,
                });
            }
            if expense.description.trim().is_empty() {
                issues.push(IntegrityIssue::BlankDescription(expense.id));
            }
        }

        issues
    }
}

/// Sum a set of expense amounts, or `None` on overflow.
pub fn sum_amounts<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Option<Cents> {
    expenses
        .into_iter()
        .try_fold(0 as Cents, |total, e| total.checked_add(e.amount))
}

fn checked_total(total: Option<Cents>) -> Result<Cents, LedgerError> {
    match total {
        Some(total) if (-MAX_AMOUNT..=MAX_AMOUNT).contains(&total) => Ok(total),
        _ => Err(LedgerError::TotalOutOfRange),
    }
}

/// A mutation the ledger refused because a counter would leave its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    /// The total would exceed `MAX_AMOUNT`
    TotalOutOfRange,
    /// `next_id` cannot be incremented any further
    IdsExhausted,
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::TotalOutOfRange => write!(
                f,
                "total would exceed the maximum of {}",
                format_cents(MAX_AMOUNT)
            ),
            LedgerError::IdsExhausted => write!(f, "no expense ids left to assign"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// A broken invariant found in a loaded ledger document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    DuplicateId(ExpenseId),
    IdNotBelowNextId { id: ExpenseId, next_id: ExpenseId },
    NonPositiveAmount { id: ExpenseId, amount: Cents },
    BlankDescription(ExpenseId),
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::DuplicateId(id) => write!(f, "expense id {} appears more than once", id),
            IntegrityIssue::IdNotBelowNextId { id, next_id } => {
                write!(f, "expense id {} is not below nextId {}", id, next_id)
            }
            IntegrityIssue::NonPositiveAmount { id, amount } => write!(
                f,
                "expense {} has non-positive amount {}",
                id,
                format_cents(*amount)
            ),
            IntegrityIssue::BlankDescription(id) => {
                write!(f, "expense {} has an empty description", id)
            }
        }
    }
}
