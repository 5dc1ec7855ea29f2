//! PBKDF2-HMAC-SHA256 derivation of AES-256 keys from passphrases.

use std::fmt;

use common::CryptoError;
use hmac::Hmac;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

/// Byte length of a derived AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the per-encryption salt (16 bytes = 128 bits).
pub const SALT_LEN: usize = 16;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 250_000;

/// Highest accepted PBKDF2 iteration count. Counts read from artifact
/// descriptions are caller-controlled and bounded by this.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// A single operation a derived key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyUsage::Encrypt => f.write_str("encrypt"),
            KeyUsage::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// The set of operations a derived key is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsages {
    encrypt: bool,
    decrypt: bool,
}

impl KeyUsages {
    pub const ENCRYPT: Self = Self {
        encrypt: true,
        decrypt: false,
    };
    pub const DECRYPT: Self = Self {
        encrypt: false,
        decrypt: true,
    };
    pub const ENCRYPT_DECRYPT: Self = Self {
        encrypt: true,
        decrypt: true,
    };

    /// Returns `true` if `usage` is part of this set.
    pub fn allows(self, usage: KeyUsage) -> bool {
        match usage {
            KeyUsage::Encrypt => self.encrypt,
            KeyUsage::Decrypt => self.decrypt,
        }
    }
}

/// A 256-bit key owned by exactly one encrypt or decrypt call.
///
/// The key bytes are zeroed when the value is dropped and never appear in
/// `Debug` output. Raw material is only reachable through
/// [`DerivedKey::export`], and only for extractable keys.
pub struct DerivedKey {
    material: Zeroizing<[u8; KEY_LEN]>,
    usages: KeyUsages,
    extractable: bool,
}

impl DerivedKey {
    #[cfg(test)]
    pub(crate) fn from_bytes(material: [u8; KEY_LEN], usages: KeyUsages, extractable: bool) -> Self {
        Self {
            material: Zeroizing::new(material),
            usages,
            extractable,
        }
    }

    /// Key length in bits. Always 256.
    pub fn bits(&self) -> usize {
        self.material.len() * 8
    }

    pub fn usages(&self) -> KeyUsages {
        self.usages
    }

    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    /// Borrow the key bytes for `usage`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyUsage`] if the key was not derived for `usage`.
    pub(crate) fn material(&self, usage: KeyUsage) -> Result<&[u8; KEY_LEN], CryptoError> {
        if !self.usages.allows(usage) {
            return Err(CryptoError::KeyUsage(format!(
                "key was not derived for {usage}"
            )));
        }
        Ok(&*self.material)
    }

    /// Copy the raw key bytes out for display or export.
    ///
    /// Exporting weakens the scheme: anyone holding the bytes can decrypt the
    /// artifact without the passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyUsage`] if the key is not extractable.
    pub fn export(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if !self.extractable {
            return Err(CryptoError::KeyUsage("key is not extractable".into()));
        }
        Ok(Zeroizing::new(self.material.to_vec()))
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("material", &"[REDACTED]")
            .field("usages", &self.usages)
            .field("extractable", &self.extractable)
            .finish()
    }
}

/// PBKDF2-HMAC-SHA256 with a fixed 256-bit output.
///
/// The iteration count is a KDF parameter and is not recoverable from the
/// framed artifact: decrypting requires the count used at encryption time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDerivation {
    iterations: u32,
}

impl KeyDerivation {
    /// # Errors
    ///
    /// Returns [`CryptoError::Config`] if `iterations` is zero or above
    /// [`MAX_ITERATIONS`].
    pub fn new(iterations: u32) -> Result<Self, CryptoError> {
        if iterations == 0 {
            return Err(CryptoError::Config("KDF iteration count must be > 0".into()));
        }
        if iterations > MAX_ITERATIONS {
            return Err(CryptoError::Config(format!(
                "KDF iteration count {iterations} exceeds the maximum of {MAX_ITERATIONS}"
            )));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Derive a key on the blocking thread pool.
    ///
    /// The passphrase is copied into a zeroizing buffer for the duration of
    /// the derivation.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Config`] if `salt` is not [`SALT_LEN`] bytes, or
    /// [`CryptoError::Derivation`] if the derivation task fails.
    pub async fn derive(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        usages: KeyUsages,
        extractable: bool,
    ) -> Result<DerivedKey, CryptoError> {
        let salt = check_salt(salt)?;
        let passphrase = Zeroizing::new(passphrase.to_vec());
        let iterations = self.iterations;

        let material = tokio::task::spawn_blocking(move || {
            pbkdf2_sha256(&passphrase, &salt, iterations)
        })
        .await
        .map_err(|e| CryptoError::Derivation(format!("derivation task failed: {e}")))??;

        debug!(iterations, "key derived");
        Ok(DerivedKey {
            material,
            usages,
            extractable,
        })
    }

    /// Synchronous variant of [`KeyDerivation::derive`] for callers outside a
    /// Tokio runtime.
    pub fn derive_blocking(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        usages: KeyUsages,
        extractable: bool,
    ) -> Result<DerivedKey, CryptoError> {
        let salt = check_salt(salt)?;
        let material = pbkdf2_sha256(passphrase, &salt, self.iterations)?;
        Ok(DerivedKey {
            material,
            usages,
            extractable,
        })
    }
}

impl Default for KeyDerivation {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

fn check_salt(salt: &[u8]) -> Result<[u8; SALT_LEN], CryptoError> {
    salt.try_into().map_err(|_| {
        CryptoError::Config(format!(
            "salt must be {SALT_LEN} bytes, got {}",
            salt.len()
        ))
    })
}

fn pbkdf2_sha256(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(passphrase, salt, iterations, &mut out[..])
        .map_err(|e| CryptoError::Derivation(e.to_string()))?;
    Ok(out)
}
