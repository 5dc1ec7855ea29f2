//! # cryptic
//!
//! Password-based file encryption with AES-256.
//!
//! A passphrase and a fresh random salt are stretched with PBKDF2-HMAC-SHA256
//! into a 256-bit key, which encrypts the file under either
//! - **AES-256-GCM** (default): authenticated; a wrong passphrase or any
//!   modification is reported as [`CryptoError::Authentication`], or
//! - **AES-256-CBC**: not authenticated; a wrong passphrase silently yields
//!   garbage.
//!
//! The result is framed as `salt ‖ iv ‖ ciphertext` and can be described as
//! base64 text ([`ArtifactInfo`]) for display or JSON transport.

pub mod config;
pub mod crypto;
pub mod orchestrator;
pub mod telemetry;

pub use common::{Algorithm, ArtifactInfo, CryptoError, ErrorResponse};
pub use orchestrator::{EncryptedFile, FileUnit, Orchestrator};
