//! Entitlement Engine - Payment webhook reconciliation and subscription lifecycle
//!
//! Turns asynchronous, duplicate-prone payment-provider notifications into
//! idempotent updates of a user's paid-entitlement state, and compares
//! entitlement ledgers offline to catch what the online path missed.
//!
//! The crate is laid out hexagonally: pure decision logic in [`domain`],
//! collaborator traits in [`ports`], in-memory implementations in
//! [`adapters`] and the handlers that compose them in [`application`].

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
