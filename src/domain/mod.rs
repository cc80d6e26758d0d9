//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `payment` - Canonical payment events and the provider payload normalizer
//! - `identity` - Resolution of payment events to internal users
//! - `subscription` - Entitlement snapshots and the subscription state machine
//! - `reconciliation` - Ledger comparison and repair planning

pub mod foundation;
pub mod identity;
pub mod payment;
pub mod reconciliation;
pub mod subscription;
