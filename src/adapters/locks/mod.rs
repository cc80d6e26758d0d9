//! Per-user lock adapters.

mod in_memory_user_locks;

pub use in_memory_user_locks::InMemoryUserLocks;
