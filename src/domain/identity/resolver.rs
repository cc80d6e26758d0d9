//! Identity resolver.
//!
//! Strategies are tried in a fixed order and the first hit wins:
//!
//! 1. `CurrentAgreement` - the event's agreement id is some user's current one
//! 2. `CustomUserId` - the embedded custom field names an existing user
//! 3. `HistoricalAgreement` - the agreement id was held by a user before a
//!    resubscription changed it
//!
//! The current agreement id is exactly what was stored at subscription time,
//! so it outranks the client-supplied custom field; the historical index
//! only answers for events that are already late. Nothing matched means
//! `Unresolvable`: the caller must not guess.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::UserId;
use crate::domain::payment::PaymentEvent;
use crate::ports::IdentityLookup;

use super::ResolutionError;

/// Which strategy produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    CurrentAgreement,
    CustomUserId,
    HistoricalAgreement,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionStrategy::CurrentAgreement => "current_agreement",
            ResolutionStrategy::CustomUserId => "custom_user_id",
            ResolutionStrategy::HistoricalAgreement => "historical_agreement",
        };
        write!(f, "{}", s)
    }
}

/// A resolved user and how they were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub user_id: UserId,
    pub strategy: ResolutionStrategy,
}

/// Resolves the user a payment event refers to.
///
/// Pure given `lookup`; the lookup is the only side-effecting collaborator.
///
/// # Errors
///
/// - `Unresolvable` when no strategy matched
/// - `LookupFailed` when the lookup itself errored (nothing is guessed)
pub async fn resolve(
    event: &PaymentEvent,
    lookup: &dyn IdentityLookup,
) -> Result<Resolution, ResolutionError> {
    if let Some(agreement_id) = &event.billing_agreement_id {
        if let Some(user_id) = lookup.find_by_billing_agreement_id(agreement_id).await? {
            return Ok(found(user_id, ResolutionStrategy::CurrentAgreement));
        }
    }

    if let Some(custom) = &event.custom_user_id {
        if let Some(user_id) = lookup.find_by_user_id(custom).await? {
            return Ok(found(user_id, ResolutionStrategy::CustomUserId));
        }
    }

    if let Some(agreement_id) = &event.billing_agreement_id {
        if let Some(user_id) = lookup.find_by_historical_agreement_id(agreement_id).await? {
            return Ok(found(user_id, ResolutionStrategy::HistoricalAgreement));
        }
    }

    Err(ResolutionError::unresolvable(event))
}

fn found(user_id: UserId, strategy: ResolutionStrategy) -> Resolution {
    tracing::debug!(user_id = %user_id, strategy = %strategy, "Resolved payment event identity");
    Resolution { user_id, strategy }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{BillingAgreementId, DomainError, ErrorCode};
    use crate::domain::payment::{PaymentEventBuilder, PaymentEventKind};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lookup backed by plain maps that counts calls.
    #[derive(Default)]
    struct MapLookup {
        current: HashMap<String, String>,
        users: Vec<String>,
        historical: HashMap<String, String>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MapLookup {
        fn uid(s: &str) -> UserId {
            UserId::new(s).unwrap()
        }

        fn answer(&self, value: Option<&String>) -> Result<Option<UserId>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DomainError::database("connection reset"));
            }
            Ok(value.map(|s| Self::uid(s)))
        }
    }

    #[async_trait]
    impl IdentityLookup for MapLookup {
        async fn find_by_billing_agreement_id(
            &self,
            id: &BillingAgreementId,
        ) -> Result<Option<UserId>, DomainError> {
            self.answer(self.current.get(id.as_str()))
        }

        async fn find_by_user_id(&self, id: &UserId) -> Result<Option<UserId>, DomainError> {
            let hit = self.users.iter().find(|u| u.as_str() == id.as_str());
            self.answer(hit)
        }

        async fn find_by_historical_agreement_id(
            &self,
            id: &BillingAgreementId,
        ) -> Result<Option<UserId>, DomainError> {
            self.answer(self.historical.get(id.as_str()))
        }
    }

    #[tokio::test]
    async fn current_agreement_wins_over_everything() {
        let lookup = MapLookup {
            current: HashMap::from([("AGR-1".to_string(), "alice".to_string())]),
            users: vec!["bob".to_string()],
            historical: HashMap::from([("AGR-1".to_string(), "carol".to_string())]),
            ..Default::default()
        };
        let event = PaymentEventBuilder::sale("T1").agreement("AGR-1").custom_user("bob").build();

        let resolution = resolve(&event, &lookup).await.unwrap();

        assert_eq!(resolution.user_id.as_str(), "alice");
        assert_eq!(resolution.strategy, ResolutionStrategy::CurrentAgreement);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn custom_user_id_covers_first_payment() {
        let lookup = MapLookup {
            users: vec!["bob".to_string()],
            ..Default::default()
        };
        let event = PaymentEventBuilder::sale("T1").agreement("AGR-NEW").custom_user("bob").build();

        let resolution = resolve(&event, &lookup).await.unwrap();

        assert_eq!(resolution.user_id.as_str(), "bob");
        assert_eq!(resolution.strategy, ResolutionStrategy::CustomUserId);
    }

    #[tokio::test]
    async fn historical_agreement_is_last_resort() {
        let lookup = MapLookup {
            current: HashMap::from([("AGR-NEW".to_string(), "dave".to_string())]),
            historical: HashMap::from([("AGR-OLD".to_string(), "dave".to_string())]),
            ..Default::default()
        };
        let event = PaymentEventBuilder::sale("T1").agreement("AGR-OLD").build();

        let resolution = resolve(&event, &lookup).await.unwrap();

        assert_eq!(resolution.user_id.as_str(), "dave");
        assert_eq!(resolution.strategy, ResolutionStrategy::HistoricalAgreement);
    }

    #[tokio::test]
    async fn stale_custom_field_falls_through_to_history() {
        let lookup = MapLookup {
            historical: HashMap::from([("AGR-OLD".to_string(), "erin".to_string())]),
            ..Default::default()
        };
        let event = PaymentEventBuilder::sale("T1")
            .agreement("AGR-OLD")
            .custom_user("deleted-account")
            .build();

        let resolution = resolve(&event, &lookup).await.unwrap();
        assert_eq!(resolution.user_id.as_str(), "erin");
    }

    #[tokio::test]
    async fn nothing_matching_is_unresolvable() {
        let lookup = MapLookup::default();
        let event = PaymentEventBuilder::lifecycle(PaymentEventKind::SubscriptionCancelled)
            .agreement("AGR-X")
            .custom_user("ghost")
            .build();

        let err = resolve(&event, &lookup).await.unwrap_err();

        match err {
            ResolutionError::Unresolvable {
                billing_agreement_id,
                custom_user_id,
                ..
            } => {
                assert_eq!(billing_agreement_id.as_deref(), Some("AGR-X"));
                assert_eq!(custom_user_id.as_deref(), Some("ghost"));
            }
            other => panic!("expected Unresolvable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn event_without_keys_is_unresolvable_without_lookups() {
        let lookup = MapLookup::default();
        let event = PaymentEventBuilder::sale("T1").no_agreement().build();

        assert!(matches!(
            resolve(&event, &lookup).await,
            Err(ResolutionError::Unresolvable { .. })
        ));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lookup_failure_is_not_a_miss() {
        let lookup = MapLookup {
            fail: true,
            ..Default::default()
        };
        let event = PaymentEventBuilder::sale("T1").build();

        let err = resolve(&event, &lookup).await.unwrap_err();
        match err {
            ResolutionError::LookupFailed(inner) => assert_eq!(inner.code, ErrorCode::DatabaseError),
            other => panic!("expected LookupFailed, got {:?}", other),
        }
    }
}
