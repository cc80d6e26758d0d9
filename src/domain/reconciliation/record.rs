//! Reconciliation records and discrepancy classification.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::UserId;
use crate::domain::subscription::SubscriptionSnapshot;

use super::AgreementHistory;

/// Thresholds for comparing expiries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationPolicy {
    /// Tolerated lag of the actual expiry behind the expected one.
    pub grace_period: Duration,
    /// Length of one billing period.
    pub period: Duration,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::days(3),
            period: Duration::days(30),
        }
    }
}

/// What is wrong with a user's actual snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discrepancy {
    None,
    MissingRenewal,
    DoubleCounted,
    IdentityMismatch,
    StaleAgreementId,
}

impl Discrepancy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discrepancy::None => "none",
            Discrepancy::MissingRenewal => "missing_renewal",
            Discrepancy::DoubleCounted => "double_counted",
            Discrepancy::IdentityMismatch => "identity_mismatch",
            Discrepancy::StaleAgreementId => "stale_agreement_id",
        }
    }

    /// Classifies one user's pair of observations.
    ///
    /// Identity problems are checked before expiry drift: a renewal cannot
    /// be trusted while the agreement id it arrived under is in doubt.
    ///
    /// With `drift = actual - expected` expiry:
    /// - `drift < -grace_period` is `MissingRenewal`
    /// - `drift >= period - grace_period` is `DoubleCounted`; one extra
    ///   calendar month can be as short as 28 days, so a single
    ///   double-applied renewal must land here
    /// - anything between is consistent
    pub fn classify(
        expected: Option<&SubscriptionSnapshot>,
        actual: Option<&SubscriptionSnapshot>,
        history: &AgreementHistory,
        policy: &ReconciliationPolicy,
    ) -> Self {
        if let (Some(expected), Some(actual)) = (expected, actual) {
            if let (Some(e), Some(a)) = (&expected.billing_agreement_id, &actual.billing_agreement_id)
            {
                if e != a {
                    return Discrepancy::IdentityMismatch;
                }
            }
        }

        if let Some(actual) = actual {
            if let Some(agreement_id) = &actual.billing_agreement_id {
                if history.knows(&actual.user_id, agreement_id) == Some(false) {
                    return Discrepancy::StaleAgreementId;
                }
            }
        }

        let expected_expiry = expected.and_then(|s| s.expires_at);
        let actual_expiry = actual.and_then(|s| s.expires_at);
        match (expected_expiry, actual_expiry) {
            (Some(e), Some(a)) => {
                let drift = a.duration_since(&e);
                if drift < -policy.grace_period {
                    Discrepancy::MissingRenewal
                } else if drift >= policy.period - policy.grace_period {
                    Discrepancy::DoubleCounted
                } else {
                    Discrepancy::None
                }
            }
            (Some(_), None) => Discrepancy::MissingRenewal,
            (None, Some(_)) => Discrepancy::DoubleCounted,
            (None, None) => Discrepancy::None,
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user's expected vs. actual snapshot.
///
/// A side is `None` when the user is absent from that ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub user_id: UserId,
    pub expected: Option<SubscriptionSnapshot>,
    pub actual: Option<SubscriptionSnapshot>,
    pub discrepancy: Discrepancy,
}

impl ReconciliationRecord {
    pub fn is_consistent(&self) -> bool {
        self.discrepancy == Discrepancy::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{BillingAgreementId, Timestamp};
    use crate::domain::subscription::SubscriptionStatus;
    use chrono::{TimeZone, Utc};

    fn at(m: u32, d: u32) -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, m, d, 0, 0, 0).unwrap())
    }

    fn snap(agreement: Option<&str>, expires_at: Option<Timestamp>) -> SubscriptionSnapshot {
        let mut s = SubscriptionSnapshot::new(UserId::new("user-1").unwrap());
        s.billing_agreement_id = agreement.map(|a| BillingAgreementId::new(a).unwrap());
        s.expires_at = expires_at;
        s.status = SubscriptionStatus::Active;
        s.is_active = true;
        s
    }

    fn classify(
        expected: Option<&SubscriptionSnapshot>,
        actual: Option<&SubscriptionSnapshot>,
    ) -> Discrepancy {
        Discrepancy::classify(
            expected,
            actual,
            &AgreementHistory::new(),
            &ReconciliationPolicy::default(),
        )
    }

    #[test]
    fn matching_snapshots_are_consistent() {
        let s = snap(Some("A"), Some(at(4, 1)));
        assert_eq!(classify(Some(&s), Some(&s)), Discrepancy::None);
    }

    #[test]
    fn drift_within_grace_is_consistent() {
        let expected = snap(Some("A"), Some(at(4, 3)));
        let actual = snap(Some("A"), Some(at(4, 1)));
        assert_eq!(classify(Some(&expected), Some(&actual)), Discrepancy::None);
    }

    #[test]
    fn actual_behind_beyond_grace_is_missing_renewal() {
        let expected = snap(Some("A"), Some(at(5, 1)));
        let actual = snap(Some("A"), Some(at(4, 1)));
        assert_eq!(classify(Some(&expected), Some(&actual)), Discrepancy::MissingRenewal);
    }

    #[test]
    fn actual_ahead_by_a_period_is_double_counted() {
        // One extra calendar month over February is only 29 days.
        let expected = snap(Some("A"), Some(at(2, 1)));
        let actual = snap(Some("A"), Some(at(3, 1)));
        assert_eq!(classify(Some(&expected), Some(&actual)), Discrepancy::DoubleCounted);
    }

    #[test]
    fn double_count_threshold_is_period_minus_grace() {
        let expected = snap(Some("A"), Some(at(4, 1)));
        let at_threshold = snap(Some("A"), Some(at(4, 28)));
        let below = snap(Some("A"), Some(at(4, 27)));

        assert_eq!(classify(Some(&expected), Some(&at_threshold)), Discrepancy::DoubleCounted);
        assert_eq!(classify(Some(&expected), Some(&below)), Discrepancy::None);
    }

    #[test]
    fn differing_agreements_are_identity_mismatch() {
        let expected = snap(Some("A"), Some(at(5, 1)));
        let actual = snap(Some("B"), Some(at(4, 1)));
        assert_eq!(classify(Some(&expected), Some(&actual)), Discrepancy::IdentityMismatch);
    }

    #[test]
    fn unknown_actual_agreement_is_stale() {
        let expected = snap(Some("A-OLD"), Some(at(4, 1)));
        let actual = snap(Some("A-OLD"), Some(at(4, 1)));
        let mut history = AgreementHistory::new();
        history.record(
            UserId::new("user-1").unwrap(),
            BillingAgreementId::new("A-NEW").unwrap(),
        );

        let discrepancy = Discrepancy::classify(
            Some(&expected),
            Some(&actual),
            &history,
            &ReconciliationPolicy::default(),
        );
        assert_eq!(discrepancy, Discrepancy::StaleAgreementId);
    }

    #[test]
    fn one_sided_users_are_classified_by_expiry() {
        let paid = snap(Some("A"), Some(at(4, 1)));
        let unpaid = snap(None, None);

        assert_eq!(classify(Some(&paid), None), Discrepancy::MissingRenewal);
        assert_eq!(classify(None, Some(&paid)), Discrepancy::DoubleCounted);
        assert_eq!(classify(Some(&unpaid), None), Discrepancy::None);
    }
}
