//! Storage Adapters
//!
//! - **InMemorySnapshotStore** - `SnapshotStore` held in memory
//! - **json_ledger_file** - JSON ledger, history and report files for
//!   reconciliation runs

mod in_memory_snapshot_store;
mod json_ledger_file;

pub use in_memory_snapshot_store::InMemorySnapshotStore;
pub use json_ledger_file::{load_agreement_history, load_ledger, write_report, LedgerFileError};
