//! Normalization error types.

use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// A provider payload that cannot become a `PaymentEvent`.
///
/// Always names the offending field by its payload path so the rejection
/// can be logged and the provider left to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// The payload is not a JSON object.
    #[error("Payload is not a JSON object")]
    NotAnObject,

    /// A required field is absent or blank.
    #[error("Missing field: {field}")]
    MissingField { field: String },

    /// A field is present but unusable.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl NormalizationError {
    pub fn missing(field: impl Into<String>) -> Self {
        NormalizationError::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        NormalizationError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Payload path of the offending field, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            NormalizationError::NotAnObject => None,
            NormalizationError::MissingField { field }
            | NormalizationError::InvalidField { field, .. } => Some(field),
        }
    }
}

impl From<ValidationError> for NormalizationError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { field } => NormalizationError::MissingField { field },
            ValidationError::InvalidFormat { field, reason } => {
                NormalizationError::InvalidField { field, reason }
            }
        }
    }
}
