//! Identity resolution domain module.
//!
//! The only component allowed to translate a payment event's external keys
//! into an internal user id.

mod errors;
mod resolver;

pub use errors::ResolutionError;
pub use resolver::{resolve, Resolution, ResolutionStrategy};
