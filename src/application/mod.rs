// Application layer - use cases over the ledger document.
// Each operation loads the ledger, validates, mutates, and saves it back.

pub mod error;
mod service;

pub use error::*;
pub use service::*;
