//! Key and envelope error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Core error: {0}")]
    Core(#[from] tcrypt_core::Error),

    #[error("Verification token mismatch: private key does not match the encryption key")]
    VerificationMismatch,

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Decrypted data is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KeyError>;
