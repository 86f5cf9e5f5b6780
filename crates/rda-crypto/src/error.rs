//! Error types for cryptographic operations.

use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing or construction failed.
    #[error("key error: {0}")]
    KeyError(String),
}
