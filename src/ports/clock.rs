//! Clock port.
//!
//! The state machine never reads the wall clock; handlers ask this port for
//! `now` so tests can pin time.

use crate::domain::foundation::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
