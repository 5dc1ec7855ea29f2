//! Password-based AES-256 encryption primitives.
//!
//! This module is free of file I/O and configuration loading. It provides key
//! derivation, the two block modes, and the transport codec used by the
//! [`orchestrator`](crate::orchestrator).
//!
//! # Key lifecycle
//!
//! ```text
//! passphrase + salt(16) --PBKDF2-HMAC-SHA256--> DerivedKey(256 bits)
//! ```
//!
//! A [`DerivedKey`] lives for exactly one encrypt or decrypt call and is
//! zeroed on drop. Keys are never cached.
//!
//! # Modes
//!
//! | mode | IV | tag | tamper detection |
//! |------|----|-----|------------------|
//! | [`GcmMode`] | 12 bytes | 16 bytes, appended | yes ([`CryptoError::Authentication`](common::CryptoError::Authentication)) |
//! | [`CbcMode`] | 16 bytes | none | no, garbage plaintext |

pub mod cbc;
pub mod cipher;
pub mod codec;
pub mod gcm;
pub mod kdf;
pub mod provider;

pub use cbc::{CbcMode, PaddingPolicy};
pub use cipher::{BlockMode, PasswordCipher, Sealed};
pub use codec::{Base64Codec, TextCodec};
pub use gcm::GcmMode;
pub use kdf::{
    DerivedKey, KeyDerivation, KeyUsage, KeyUsages, KEY_LEN, MAX_ITERATIONS, SALT_LEN,
};
pub use provider::{EntropySource, FixedEntropy, OsEntropy};
