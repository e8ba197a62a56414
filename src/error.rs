use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the ledger engine.
///
/// The first seven variants are business-rule violations and are returned to
/// the caller unchanged. `ConcurrencyConflict` and `StoreUnavailable` are
/// retried by the engine before they escape.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("caller {caller} may not {action}")]
    InvalidActor { caller: String, action: &'static str },

    #[error("cannot {action} {entity} in state {state}")]
    InvalidState {
        entity: &'static str,
        state: String,
        action: &'static str,
    },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("revision limit of {allowed} reached")]
    RevisionLimitExceeded { allowed: u32 },

    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    /// Stable code exposed across the caller boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidActor { .. } => "INVALID_ACTOR",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Self::RevisionLimitExceeded { .. } => "REVISION_LIMIT_EXCEEDED",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::IoError(_) | Self::JsonError(_) | Self::CsvError(_) | Self::InternalError(_) => {
                "INTERNAL"
            }
        }
    }

    /// Whether the engine may transparently retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict(_) | Self::StoreUnavailable(_)
        )
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_state(
        entity: &'static str,
        state: impl ToString,
        action: &'static str,
    ) -> Self {
        Self::InvalidState {
            entity,
            state: state.to_string(),
            action,
        }
    }

    #[cfg_attr(not(feature = "storage-rocksdb"), allow(dead_code))]
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EngineError {
    fn from(e: rocksdb::Error) -> Self {
        Self::StoreUnavailable(e.into_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(EngineError::not_found("order", "o1").code(), "NOT_FOUND");
        assert_eq!(
            EngineError::InsufficientBalance {
                needed: dec!(10),
                available: dec!(5),
            }
            .code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(EngineError::internal("boom").code(), "INTERNAL");
    }

    #[test]
    fn test_only_infrastructure_failures_retry() {
        assert!(EngineError::ConcurrencyConflict("v".into()).is_retryable());
        assert!(EngineError::StoreUnavailable("down".into()).is_retryable());
        assert!(!EngineError::RevisionLimitExceeded { allowed: 2 }.is_retryable());
        assert!(!EngineError::invalid_state("order", "completed", "approve").is_retryable());
    }

    #[test]
    fn test_messages_carry_no_store_detail() {
        let err = EngineError::invalid_state("withdrawal", "completed", "cancel");
        assert_eq!(err.to_string(), "cannot cancel withdrawal in state completed");
    }
}
