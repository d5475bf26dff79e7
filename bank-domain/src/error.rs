//! Unified error taxonomy for the event-sourcing core.
//!
//! Mirrors the teacher's `ErrorCode`/`ErrorKind` split so that any crate
//! downstream of this one can map any error to an HTTP status without
//! knowing its concrete type, while keeping a single concrete
//! [`BankError`] for everything the domain layer itself raises.
//!
//! ```rust
//! use bank_domain::error::{BankError, ErrorCode, ErrorKind};
//!
//! let err = BankError::not_found("account 123");
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert_eq!(err.http_status(), 404);
//! ```

use crate::money::CurrencyCode;
use std::error::Error as StdError;
use thiserror::Error;

/// Coarse error classification, used to map errors to HTTP status codes
/// and to decide whether a caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed caller input.
    InvalidArgument,
    /// Operation not permitted in the aggregate's current state.
    InvalidState,
    /// Referenced resource does not exist.
    NotFound,
    /// Optimistic-concurrency version mismatch; safe to retry.
    Conflict,
    /// Infrastructure failure (storage, serialization, schema drift).
    Internal,
}

impl ErrorKind {
    /// | ErrorKind       | HTTP Status |
    /// |-----------------|-------------|
    /// | InvalidArgument | 400         |
    /// | NotFound        | 404         |
    /// | Conflict        | 409         |
    /// | InvalidState    | 422         |
    /// | Internal        | 500         |
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidArgument => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InvalidState => 422,
            Self::Internal => 500,
        }
    }

    #[must_use]
    pub const fn default_code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidState => "INVALID_STATE",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Errors implementing this can be mapped to an HTTP response by any
/// adapter layer, without that layer knowing the concrete error type.
pub trait ErrorCode: StdError + Send + Sync + 'static {
    fn kind(&self) -> ErrorKind;

    fn code(&self) -> &str {
        self.kind().default_code()
    }

    fn http_status(&self) -> u16 {
        self.kind().http_status()
    }

    /// Whether the caller may retry. Most kinds are not retryable by
    /// default; concrete errors (e.g. `BankError::ConcurrencyConflict`,
    /// `BankError::Storage`) override this explicitly.
    fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict)
    }
}

/// The event-sourcing core's concrete error type. Exactly the seven
/// kinds named in the specification's error-handling design, each with
/// the recovery semantics it describes.
#[derive(Debug, Error)]
pub enum BankError {
    /// Malformed command argument (e.g. a non-positive amount).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Command not allowed given the aggregate's current status, or
    /// would violate an invariant (e.g. withdrawing past the overdraft
    /// limit, closing with a nonzero balance).
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// A `Money` operation spanned two different currencies.
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        found: CurrencyCode,
    },

    /// No stream/aggregate/row exists for the given id.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// `Append` was called with a stale expected version; the caller
    /// should reload, reapply the command, and retry.
    #[error("concurrency conflict on stream {stream_id}: expected version {expected}, actual {actual}")]
    ConcurrencyConflict {
        stream_id: String,
        expected: i64,
        actual: i64,
    },

    /// An event's type tag is outside the closed taxonomy, or its
    /// payload does not match the tag's schema. Indicates schema drift;
    /// fatal, must halt projector progress.
    #[error("codec error: {reason}")]
    Codec { reason: String },

    /// The underlying store failed (connection, I/O, transaction
    /// abort). Transient; safe to retry with backoff.
    #[error("storage error: {source}")]
    Storage {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl BankError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn currency_mismatch(expected: CurrencyCode, found: CurrencyCode) -> Self {
        Self::CurrencyMismatch { expected, found }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn concurrency_conflict(stream_id: impl Into<String>, expected: i64, actual: i64) -> Self {
        Self::ConcurrencyConflict {
            stream_id: stream_id.into(),
            expected,
            actual,
        }
    }

    pub fn codec(reason: impl Into<String>) -> Self {
        Self::Codec {
            reason: reason.into(),
        }
    }

    pub fn storage(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }
}

impl ErrorCode for BankError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::CurrencyMismatch { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::ConcurrencyConflict { .. } => ErrorKind::Conflict,
            Self::Codec { .. } => ErrorKind::Internal,
            Self::Storage { .. } => ErrorKind::Internal,
        }
    }

    fn code(&self) -> &str {
        match self {
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::Codec { .. } => "CODEC_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            other => other.kind().default_code(),
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. } | Self::Storage { .. })
    }
}

impl From<serde_json::Error> for BankError {
    fn from(err: serde_json::Error) -> Self {
        Self::codec(err.to_string())
    }
}

/// Result alias used throughout the domain layer.
pub type BankResult<T> = Result<T, BankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_http_status() {
        assert_eq!(ErrorKind::InvalidArgument.http_status(), 400);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::Conflict.http_status(), 409);
        assert_eq!(ErrorKind::InvalidState.http_status(), 422);
        assert_eq!(ErrorKind::Internal.http_status(), 500);
    }

    #[test]
    fn concurrency_conflict_is_retryable() {
        let err = BankError::concurrency_conflict("acc-1", 2, 3);
        assert!(err.is_retryable());
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn codec_error_is_not_retryable() {
        let err = BankError::codec("unknown event type FooBar");
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "CODEC_ERROR");
    }

    #[test]
    fn storage_error_is_retryable() {
        let err = BankError::storage(std::io::Error::other("connection reset"));
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), 500);
    }
}
