//! Repair planning.
//!
//! Repairs never edit snapshots. A fixable discrepancy becomes a synthetic
//! payment event that is replayed through the state machine like live
//! traffic, so dedup and renewal rules apply to it as well.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, TransactionId};
use crate::domain::payment::PaymentEvent;

use super::{Discrepancy, ReconciliationRecord};

/// What to do about one reconciliation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepairPlan {
    NoAction,
    /// Replay this event through the webhook path.
    Replay { event: PaymentEvent },
    /// Needs an operator.
    ManualReview { reason: String },
}

/// Plans the repair for `record` as of `now`.
///
/// A missing renewal is replayed with a transaction id derived from the
/// user and the expected expiry, so executing the same plan twice is
/// caught as a duplicate.
pub fn plan_repair(record: &ReconciliationRecord, now: Timestamp) -> RepairPlan {
    match record.discrepancy {
        Discrepancy::None => RepairPlan::NoAction,
        Discrepancy::MissingRenewal => {
            let Some(expected) = record.expected.as_ref() else {
                return RepairPlan::ManualReview {
                    reason: "missing renewal without an expected snapshot".to_string(),
                };
            };
            let Some(expected_expiry) = expected.expires_at else {
                return RepairPlan::ManualReview {
                    reason: "missing renewal without an expected expiry".to_string(),
                };
            };

            let raw_id = format!(
                "repair:{}:{}",
                record.user_id,
                expected_expiry.as_unix_secs()
            );
            let transaction_id = match TransactionId::new(raw_id) {
                Ok(id) => id,
                Err(e) => {
                    return RepairPlan::ManualReview {
                        reason: e.to_string(),
                    }
                }
            };
            let billing_agreement_id = expected
                .billing_agreement_id
                .clone()
                .or_else(|| record.actual.as_ref()?.billing_agreement_id.clone());

            RepairPlan::Replay {
                event: PaymentEvent::repair_renewal(
                    record.user_id.clone(),
                    billing_agreement_id,
                    transaction_id,
                    now,
                    format!("missing renewal, expected access until {}", expected_expiry),
                ),
            }
        }
        Discrepancy::DoubleCounted => RepairPlan::ManualReview {
            reason: "actual expiry is a full period ahead; a refund or manual shortening is needed"
                .to_string(),
        },
        Discrepancy::IdentityMismatch => RepairPlan::ManualReview {
            reason: "ledgers disagree on the billing agreement id".to_string(),
        },
        Discrepancy::StaleAgreementId => RepairPlan::ManualReview {
            reason: "stored billing agreement id is not in the user's agreement history"
                .to_string(),
        },
    }
}
