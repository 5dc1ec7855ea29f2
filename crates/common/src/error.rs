//! Error taxonomy shared by every cryptic crate.

use thiserror::Error;

/// Failure of a key-derivation, encryption or decryption operation.
///
/// Every variant is a distinct, reportable failure. None of them may be
/// collapsed into an empty or default result by callers of the core.
///
/// Variants map to stable machine-readable codes (see [`CryptoError::code`])
/// and process exit codes (see [`CryptoError::exit_code`]):
/// - [`CryptoError::Config`] → `config_error` / 2
/// - [`CryptoError::Derivation`] → `derivation_error` / 3
/// - [`CryptoError::Encryption`] → `encryption_error` / 4
/// - [`CryptoError::Decryption`] → `decryption_error` / 5
/// - [`CryptoError::Authentication`] → `authentication_error` / 6
/// - [`CryptoError::KeyUsage`] → `key_usage_error` / 7
/// - [`CryptoError::Encoding`] → `encoding_error` / 8
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Caller contract violation: bad salt/IV length, truncated frame,
    /// unsupported algorithm selector, zero iteration count.
    #[error("configuration error: {0}")]
    Config(String),

    /// The key-derivation provider failed.
    #[error("key derivation failed: {0}")]
    Derivation(String),

    /// The cipher provider (or its random source) failed while encrypting.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Malformed ciphertext: wrong block alignment, invalid padding, or input
    /// too short to hold an authentication tag.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Authentication tag mismatch: the passphrase is wrong or the artifact
    /// was tampered with.
    #[error("authentication failed: wrong passphrase or tampered data")]
    Authentication,

    /// A derived key was used outside the usages it was derived for.
    #[error("key usage not permitted: {0}")]
    KeyUsage(String),

    /// Transport text could not be decoded back into bytes.
    #[error("invalid transport encoding: {0}")]
    Encoding(String),
}

impl CryptoError {
    /// Short machine-readable identifier for this failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            CryptoError::Config(_) => "config_error",
            CryptoError::Derivation(_) => "derivation_error",
            CryptoError::Encryption(_) => "encryption_error",
            CryptoError::Decryption(_) => "decryption_error",
            CryptoError::Authentication => "authentication_error",
            CryptoError::KeyUsage(_) => "key_usage_error",
            CryptoError::Encoding(_) => "encoding_error",
        }
    }

    /// Process exit code the command-line front end reports for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            CryptoError::Config(_) => 2,
            CryptoError::Derivation(_) => 3,
            CryptoError::Encryption(_) => 4,
            CryptoError::Decryption(_) => 5,
            CryptoError::Authentication => 6,
            CryptoError::KeyUsage(_) => 7,
            CryptoError::Encoding(_) => 8,
        }
    }
}
