//! Password-based encryption shared by both block modes.
//!
//! [`PasswordCipher`] owns the per-call lifecycle: draw a fresh salt and IV
//! from the injected [`EntropySource`], derive a key scoped to the operation,
//! run the mode, and drop the key before returning. The modes themselves
//! ([`CbcMode`](super::cbc::CbcMode), [`GcmMode`](super::gcm::GcmMode)) only
//! implement the raw [`BlockMode`] primitive.

use std::{fmt, sync::Arc};

use common::{Algorithm, ArtifactInfo, CryptoError, NON_EXTRACTABLE_KEY};
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::codec::{Base64Codec, TextCodec};
use super::kdf::{DerivedKey, KeyDerivation, KeyUsages, SALT_LEN};
use super::provider::EntropySource;

/// One AES-256 block cipher mode.
pub trait BlockMode: Send + Sync {
    /// Selector this mode answers to.
    const ALGORITHM: Algorithm;

    /// Required IV / nonce length in bytes.
    const IV_LEN: usize;

    /// Encrypt `plaintext` under `key` and `iv`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::KeyUsage`] if `key` may not encrypt,
    /// [`CryptoError::Config`] on a wrong IV length,
    /// [`CryptoError::Encryption`] on a provider failure.
    fn seal(&self, key: &DerivedKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt `ciphertext` under `key` and `iv`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::KeyUsage`] if `key` may not decrypt,
    /// [`CryptoError::Config`] on a wrong IV length,
    /// [`CryptoError::Decryption`] on malformed input,
    /// [`CryptoError::Authentication`] on a tag mismatch (authenticated modes).
    fn open(&self, key: &DerivedKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Reject an IV whose length does not match the mode.
pub(crate) fn check_iv(iv: &[u8], expected: usize) -> Result<(), CryptoError> {
    if iv.len() != expected {
        return Err(CryptoError::Config(format!(
            "IV must be {expected} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

/// Result of one password-based encryption.
pub struct Sealed {
    pub algorithm: Algorithm,
    /// Iteration count the key was derived with.
    pub iterations: u32,
    pub salt: [u8; SALT_LEN],
    pub iv: Vec<u8>,
    /// Ciphertext; for authenticated modes the tag is appended.
    pub ciphertext: Vec<u8>,
    /// Raw key bytes, present only when an extractable key was requested.
    pub exported_key: Option<Zeroizing<Vec<u8>>>,
}

impl Sealed {
    /// Trailing authentication tag for authenticated modes.
    pub fn auth_tag(&self) -> Option<&[u8]> {
        if !self.algorithm.is_authenticated() {
            return None;
        }
        let tag_start = self.ciphertext.len().checked_sub(super::gcm::TAG_LEN)?;
        Some(&self.ciphertext[tag_start..])
    }

    /// Transport-encode every field.
    ///
    /// Binary fields go through `codec`; exported key material is always
    /// rendered as a JWK `k` value (base64url, unpadded).
    pub fn info<C: TextCodec>(&self, codec: &C) -> ArtifactInfo {
        let exported_key_base64 = match &self.exported_key {
            Some(key) => Base64Codec::UrlSafeNoPad.encode(key),
            None => NON_EXTRACTABLE_KEY.to_owned(),
        };
        ArtifactInfo {
            algorithm: self.algorithm,
            iterations: self.iterations,
            salt_base64: codec.encode(&self.salt),
            iv_base64: codec.encode(&self.iv),
            cipher_text_base64: codec.encode(&self.ciphertext),
            auth_tag_base64: self.auth_tag().map(|tag| codec.encode(tag)),
            exported_key_base64,
            file_name: None,
        }
    }
}

impl fmt::Debug for Sealed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sealed")
            .field("algorithm", &self.algorithm)
            .field("iterations", &self.iterations)
            .field("iv_len", &self.iv.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .field("exported_key", &self.exported_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Passphrase-driven encrypt/decrypt over one [`BlockMode`].
#[derive(Clone)]
pub struct PasswordCipher<M> {
    mode: M,
    kdf: KeyDerivation,
    entropy: Arc<dyn EntropySource>,
}

impl<M: BlockMode> PasswordCipher<M> {
    pub fn new(mode: M, kdf: KeyDerivation, entropy: Arc<dyn EntropySource>) -> Self {
        Self { mode, kdf, entropy }
    }

    pub fn algorithm(&self) -> Algorithm {
        M::ALGORITHM
    }

    pub fn iv_len(&self) -> usize {
        M::IV_LEN
    }

    pub fn kdf(&self) -> &KeyDerivation {
        &self.kdf
    }

    /// Encrypt `plaintext` under a key freshly derived from `passphrase`.
    ///
    /// Draws the salt first, then the IV. When `extractable_key` is set the
    /// key is derived for both directions and exported into the result.
    ///
    /// # Errors
    ///
    /// Propagates random-source, derivation and cipher failures unchanged.
    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        passphrase: &[u8],
        extractable_key: bool,
    ) -> Result<Sealed, CryptoError> {
        let mut salt = [0u8; SALT_LEN];
        self.entropy.fill(&mut salt)?;
        let mut iv = vec![0u8; M::IV_LEN];
        self.entropy.fill(&mut iv)?;

        let usages = if extractable_key {
            KeyUsages::ENCRYPT_DECRYPT
        } else {
            KeyUsages::ENCRYPT
        };
        let key = self
            .kdf
            .derive(passphrase, &salt, usages, extractable_key)
            .await?;

        let ciphertext = self.mode.seal(&key, &iv, plaintext)?;
        let exported_key = if extractable_key {
            Some(key.export()?)
        } else {
            None
        };

        info!(
            algorithm = %M::ALGORITHM,
            bytes = plaintext.len(),
            extractable_key,
            "encrypted"
        );
        Ok(Sealed {
            algorithm: M::ALGORITHM,
            iterations: self.kdf.iterations(),
            salt,
            iv,
            ciphertext,
            exported_key,
        })
    }

    /// Decrypt `ciphertext` with a decrypt-only key derived from `passphrase`
    /// and `salt`. Salt and IV are supplied out-of-band.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Config`] for a wrong salt or IV length; otherwise the
    /// mode's failure (see [`BlockMode::open`]).
    pub async fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &[u8],
        salt: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_iv(iv, M::IV_LEN)?;
        let key = self
            .kdf
            .derive(passphrase, salt, KeyUsages::DECRYPT, false)
            .await?;

        let plaintext = self.mode.open(&key, iv, ciphertext)?;
        debug!(
            algorithm = %M::ALGORITHM,
            bytes = plaintext.len(),
            "decrypted"
        );
        Ok(plaintext)
    }
}
