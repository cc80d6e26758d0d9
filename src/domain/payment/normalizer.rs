//! Event normalizer: raw provider payload → `PaymentEvent`.
//!
//! Pure and total over its input. Unknown event types normalize to
//! `PaymentEventKind::Unknown`; only missing or malformed required fields
//! are errors, and a failed normalization never yields a partial event.
//!
//! Fields consumed:
//!
//! | Path | Used as |
//! |------|---------|
//! | `id` | `event_id` |
//! | `event_type` | `kind` |
//! | `resource.id` | `transaction_id` |
//! | `resource.billing_agreement_id` | `billing_agreement_id` |
//! | `resource.custom` / `resource.custom_id` | `custom_user_id` |
//! | `resource.amount.total` + `.currency` | `amount` |
//! | `resource.create_time` (else `create_time`) | `occurred_at` |

use serde_json::Value;

use crate::domain::foundation::{
    BillingAgreementId, Currency, EventId, Money, Timestamp, TransactionId, UserId,
    ValidationError,
};

use super::{EventOrigin, NormalizationError, PaymentEvent, PaymentEventKind};

const EVENT_ID: &str = "id";
const EVENT_TYPE: &str = "event_type";
const RESOURCE: &str = "resource";
const RESOURCE_ID: &str = "resource.id";
const AGREEMENT_ID: &str = "resource.billing_agreement_id";
const CUSTOM: &str = "resource.custom";
const CUSTOM_ID: &str = "resource.custom_id";
const AMOUNT_TOTAL: &str = "resource.amount.total";
const AMOUNT_CURRENCY: &str = "resource.amount.currency";
const RESOURCE_CREATE_TIME: &str = "resource.create_time";
const ENVELOPE_CREATE_TIME: &str = "create_time";

/// Normalizes a provider webhook payload.
///
/// # Errors
///
/// - `NotAnObject` if the payload (or its `resource`) is not an object
/// - `MissingField` for absent `id`, `event_type`, `resource.id`,
///   creation time, or the amount of a `SaleCompleted`
/// - `InvalidField` for wrongly typed values, bad timestamps, negative or
///   non-numeric amounts
pub fn normalize(payload: &Value) -> Result<PaymentEvent, NormalizationError> {
    let root = payload.as_object().ok_or(NormalizationError::NotAnObject)?;

    let event_id = required_str(root.get("id"), EVENT_ID)?;
    let event_type = required_str(root.get("event_type"), EVENT_TYPE)?;
    let kind = PaymentEventKind::from_provider_type(event_type);

    let resource = match root.get("resource") {
        Some(Value::Object(resource)) => resource,
        Some(Value::Null) | None => return Err(NormalizationError::missing(RESOURCE)),
        Some(_) => return Err(NormalizationError::invalid(RESOURCE, "expected an object")),
    };

    let transaction_id = TransactionId::new(required_str(resource.get("id"), RESOURCE_ID)?)
        .map_err(|_| NormalizationError::missing(RESOURCE_ID))?;

    // Subscription lifecycle notifications describe the agreement itself,
    // so its id is the resource id when no explicit agreement id is sent.
    let billing_agreement_id = match optional_str(resource.get("billing_agreement_id"), AGREEMENT_ID)? {
        Some(id) => BillingAgreementId::new(id).ok(),
        None if kind.is_lifecycle() => BillingAgreementId::new(transaction_id.as_str()).ok(),
        None => None,
    };

    let custom = match optional_str(resource.get("custom"), CUSTOM)? {
        Some(value) if !value.trim().is_empty() => Some(value),
        _ => optional_str(resource.get("custom_id"), CUSTOM_ID)?,
    };
    let custom_user_id = custom.and_then(|value| match UserId::new(value) {
        Ok(user_id) => Some(user_id),
        Err(e) => {
            tracing::debug!(field = CUSTOM, error = %e, "Ignoring unusable custom user id");
            None
        }
    });

    let amount = match resource.get("amount") {
        Some(Value::Null) | None => None,
        Some(Value::Object(amount)) => Some(parse_amount(amount)?),
        Some(_) => return Err(NormalizationError::invalid("resource.amount", "expected an object")),
    };
    if kind == PaymentEventKind::SaleCompleted && amount.is_none() {
        return Err(NormalizationError::missing(AMOUNT_TOTAL));
    }

    let occurred_at = match optional_str(resource.get("create_time"), RESOURCE_CREATE_TIME)? {
        Some(raw) => Timestamp::parse_rfc3339(RESOURCE_CREATE_TIME, raw)?,
        None => match optional_str(root.get("create_time"), ENVELOPE_CREATE_TIME)? {
            Some(raw) => Timestamp::parse_rfc3339(ENVELOPE_CREATE_TIME, raw)?,
            None => return Err(NormalizationError::missing(RESOURCE_CREATE_TIME)),
        },
    };

    Ok(PaymentEvent {
        event_id: EventId::from_string(event_id),
        kind,
        billing_agreement_id,
        custom_user_id,
        amount,
        occurred_at,
        transaction_id,
        origin: EventOrigin::Provider,
    })
}

fn parse_amount(amount: &serde_json::Map<String, Value>) -> Result<Money, NormalizationError> {
    // Integers arrive exact; any fractional number has already been through f64.
    let total = match amount.get("total") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => n.to_string(),
        Some(Value::Number(_)) => {
            return Err(NormalizationError::invalid(
                AMOUNT_TOTAL,
                "fractional amounts must be sent as decimal strings",
            ))
        }
        Some(Value::Null) | None => return Err(NormalizationError::missing(AMOUNT_TOTAL)),
        Some(Value::String(_)) => return Err(NormalizationError::missing(AMOUNT_TOTAL)),
        Some(_) => {
            return Err(NormalizationError::invalid(
                AMOUNT_TOTAL,
                "expected a decimal string or number",
            ))
        }
    };

    let currency = required_str(amount.get("currency"), AMOUNT_CURRENCY)?;
    let currency = Currency::new(currency).map_err(|e| match e {
        ValidationError::EmptyField { .. } => NormalizationError::missing(AMOUNT_CURRENCY),
        ValidationError::InvalidFormat { reason, .. } => {
            NormalizationError::invalid(AMOUNT_CURRENCY, reason)
        }
    })?;

    Money::parse(AMOUNT_TOTAL, &total, currency).map_err(NormalizationError::from)
}

fn required_str<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a str, NormalizationError> {
    match optional_str(value, field)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(NormalizationError::missing(field)),
    }
}

fn optional_str<'a>(value: Option<&'a Value>, field: &str) -> Result<Option<&'a str>, NormalizationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(NormalizationError::invalid(field, "expected a string")),
    }
}
