mod json_store;

pub use json_store::*;

/// File name used when no ledger path is configured
pub const DEFAULT_LEDGER_FILE: &str = "expenses.json";
