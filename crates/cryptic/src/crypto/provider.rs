//! Injected source of randomness for salts and IVs.
//!
//! The cipher strategies never reach for a global RNG; they are handed an
//! [`EntropySource`] so tests can pin salts and IVs.

use std::sync::Mutex;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use common::CryptoError;

/// Fills buffers with random bytes.
#[cfg_attr(test, mockall::automock)]
pub trait EntropySource: Send + Sync {
    /// Overwrite all of `dest` with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the underlying source fails.
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// The operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| CryptoError::Encryption(format!("random source unavailable: {e}")))
    }
}

/// Replays a fixed byte sequence, front to back.
///
/// Intended for deterministic tests and reproducing known artifacts. Never
/// use it for real encryption: every consumer receives the same bytes.
#[derive(Debug)]
pub struct FixedEntropy {
    bytes: Vec<u8>,
    cursor: Mutex<usize>,
}

impl FixedEntropy {
    /// Create a source that hands out `bytes` in order.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            cursor: Mutex::new(0),
        }
    }

    /// Convenience constructor: `salt` followed by `iv`, the order in which a
    /// single encryption consumes them.
    pub fn salt_then_iv(salt: &[u8], iv: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(salt.len() + iv.len());
        bytes.extend_from_slice(salt);
        bytes.extend_from_slice(iv);
        Self::new(bytes)
    }
}

impl EntropySource for FixedEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), CryptoError> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| CryptoError::Encryption("fixed entropy source poisoned".into()))?;
        let end = *cursor + dest.len();
        if end > self.bytes.len() {
            return Err(CryptoError::Encryption("fixed entropy source exhausted".into()));
        }
        dest.copy_from_slice(&self.bytes[*cursor..end]);
        *cursor = end;
        Ok(())
    }
}
