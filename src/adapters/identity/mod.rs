//! Identity lookup adapters.

mod in_memory_directory;

pub use in_memory_directory::InMemoryIdentityDirectory;
