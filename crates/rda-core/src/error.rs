//! # Error Types — Shared Error Hierarchy
//!
//! Errors shared across the foundational types. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations. Component-level
//! errors (registry, compliance, token, factory) live next to the components
//! that raise them.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer for amount: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error validating a foundational value at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address string is not 0x-prefixed 40-char hex.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Deployment salt is empty or malformed.
    #[error("invalid salt: {0}")]
    InvalidSalt(String),

    /// Timestamp string is not RFC 3339 UTC with Z suffix.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
