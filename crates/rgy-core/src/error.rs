//! # Error Types
//!
//! Errors raised while constructing the foundational value types. Each
//! variant carries the offending input so callers can report it verbatim.

use thiserror::Error;

/// Error constructing a core value type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Registrar identifier failed validation.
    #[error("invalid client id: {0:?}")]
    InvalidClientId(String),

    /// Currency code is not a three-letter ISO 4217 code.
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Arithmetic on amounts of different currencies.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Left-hand currency.
        left: String,
        /// Right-hand currency.
        right: String,
    },
}
