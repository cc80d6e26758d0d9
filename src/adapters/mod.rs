//! Adapters - Implementations of port interfaces.
//!
//! - `events` - Event bus implementations
//! - `identity` - Identity lookup directories
//! - `locks` - Per-user lock implementations
//! - `storage` - Snapshot stores and ledger files
//! - `clock` - System and fixed clocks

pub mod clock;
pub mod events;
pub mod identity;
pub mod locks;
pub mod storage;

pub use clock::{FixedClock, SystemClock};
pub use events::InMemoryEventBus;
pub use identity::InMemoryIdentityDirectory;
pub use locks::InMemoryUserLocks;
pub use storage::{
    load_agreement_history, load_ledger, write_report, InMemorySnapshotStore, LedgerFileError,
};
