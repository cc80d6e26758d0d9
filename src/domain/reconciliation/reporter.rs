//! Reconciliation reporter.
//!
//! Merge-joins two ledgers in user-id order. The sequence is lazy and,
//! being `Clone`, restartable: cloning before iterating gives an
//! independent pass over the same inputs.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map;
use std::iter::Peekable;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::SubscriptionSnapshot;

use super::{AgreementHistory, Discrepancy, Ledger, ReconciliationPolicy, ReconciliationRecord};

type Entries<'a> = Peekable<btree_map::Iter<'a, UserId, SubscriptionSnapshot>>;

/// Lazy sequence of one record per user present in either ledger.
#[derive(Clone)]
pub struct Reconciliation<'a> {
    expected: Entries<'a>,
    actual: Entries<'a>,
    history: &'a AgreementHistory,
    policy: ReconciliationPolicy,
}

/// Compares `expected` against `actual`. Pure; nothing is mutated.
pub fn reconcile<'a>(
    expected: &'a Ledger,
    actual: &'a Ledger,
    history: &'a AgreementHistory,
    policy: ReconciliationPolicy,
) -> Reconciliation<'a> {
    Reconciliation {
        expected: expected.iter().peekable(),
        actual: actual.iter().peekable(),
        history,
        policy,
    }
}

impl<'a> Iterator for Reconciliation<'a> {
    type Item = ReconciliationRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.expected.peek(), self.actual.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((e, _)), Some((a, _))) => e.cmp(a),
        };

        let (user_id, expected, actual) = match order {
            Ordering::Less => {
                let (user_id, snapshot) = self.expected.next()?;
                (user_id, Some(snapshot), None)
            }
            Ordering::Greater => {
                let (user_id, snapshot) = self.actual.next()?;
                (user_id, None, Some(snapshot))
            }
            Ordering::Equal => {
                let (user_id, expected) = self.expected.next()?;
                let actual = self.actual.next().map(|(_, snapshot)| snapshot);
                (user_id, Some(expected), actual)
            }
        };

        Some(ReconciliationRecord {
            user_id: user_id.clone(),
            discrepancy: Discrepancy::classify(expected, actual, self.history, &self.policy),
            expected: expected.cloned(),
            actual: actual.cloned(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (expected, _) = self.expected.size_hint();
        let (actual, _) = self.actual.size_hint();
        (expected.max(actual), Some(expected + actual))
    }
}

/// Counts per discrepancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total: usize,
    pub consistent: usize,
    pub missing_renewal: usize,
    pub double_counted: usize,
    pub identity_mismatch: usize,
    pub stale_agreement_id: usize,
}

impl ReconciliationSummary {
    fn count(&mut self, discrepancy: Discrepancy) {
        self.total += 1;
        match discrepancy {
            Discrepancy::None => self.consistent += 1,
            Discrepancy::MissingRenewal => self.missing_renewal += 1,
            Discrepancy::DoubleCounted => self.double_counted += 1,
            Discrepancy::IdentityMismatch => self.identity_mismatch += 1,
            Discrepancy::StaleAgreementId => self.stale_agreement_id += 1,
        }
    }

    pub fn discrepancies(&self) -> usize {
        self.total - self.consistent
    }
}

/// Materialised result of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub generated_at: Timestamp,
    pub summary: ReconciliationSummary,
    pub records: Vec<ReconciliationRecord>,
}

impl ReconciliationReport {
    pub fn from_records(
        records: impl IntoIterator<Item = ReconciliationRecord>,
        generated_at: Timestamp,
    ) -> Self {
        let records: Vec<_> = records.into_iter().collect();
        let mut summary = ReconciliationSummary::default();
        for record in &records {
            summary.count(record.discrepancy);
        }
        Self {
            generated_at,
            summary,
            records,
        }
    }

    /// Records that need attention.
    pub fn discrepancies(&self) -> impl Iterator<Item = &ReconciliationRecord> {
        self.records.iter().filter(|record| !record.is_consistent())
    }
}
