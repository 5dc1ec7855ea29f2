//! Runtime algorithm selection, artifact framing and named output units.
//!
//! # Frame format
//!
//! ```text
//! salt(16) ‖ iv(16 for aes256-cbc, 12 for aes256-gcm) ‖ ciphertext(‖ tag(16) for aes256-gcm)
//! ```
//!
//! [`frame`] and [`split_frame`] are the only producers and consumers of this
//! layout. The iteration count is not part of the frame; framed artifacts are
//! decrypted with the orchestrator's configured count.

use std::sync::Arc;

use bytes::Bytes;
use common::{Algorithm, ArtifactInfo, CryptoError};
use tracing::info;

use crate::config::Config;
use crate::crypto::{
    Base64Codec, CbcMode, EntropySource, GcmMode, KeyDerivation, OsEntropy, PaddingPolicy,
    PasswordCipher, Sealed, TextCodec, SALT_LEN,
};

/// Name prefix of encryption outputs.
pub const ENCRYPTED_PREFIX: &str = "encrypted-";

/// Name prefix of decryption outputs.
pub const DECRYPTED_PREFIX: &str = "decrypted-";

// ---------------------------------------------------------------------------
// Strategy dispatch
// ---------------------------------------------------------------------------

/// One of the two cipher strategies, resolved once per operation.
#[derive(Clone)]
pub enum Cipher {
    Cbc(PasswordCipher<CbcMode>),
    Gcm(PasswordCipher<GcmMode>),
}

impl Cipher {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Cipher::Cbc(c) => c.algorithm(),
            Cipher::Gcm(c) => c.algorithm(),
        }
    }

    pub fn iv_len(&self) -> usize {
        match self {
            Cipher::Cbc(c) => c.iv_len(),
            Cipher::Gcm(c) => c.iv_len(),
        }
    }

    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        passphrase: &[u8],
        extractable_key: bool,
    ) -> Result<Sealed, CryptoError> {
        match self {
            Cipher::Cbc(c) => c.encrypt(plaintext, passphrase, extractable_key).await,
            Cipher::Gcm(c) => c.encrypt(plaintext, passphrase, extractable_key).await,
        }
    }

    pub async fn decrypt(
        &self,
        ciphertext: &[u8],
        passphrase: &[u8],
        salt: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match self {
            Cipher::Cbc(c) => c.decrypt(ciphertext, passphrase, salt, iv).await,
            Cipher::Gcm(c) => c.decrypt(ciphertext, passphrase, salt, iv).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Concatenate salt, IV and ciphertext into the transportable frame.
pub fn frame(sealed: &Sealed) -> Vec<u8> {
    let mut out = Vec::with_capacity(SALT_LEN + sealed.iv.len() + sealed.ciphertext.len());
    out.extend_from_slice(&sealed.salt);
    out.extend_from_slice(&sealed.iv);
    out.extend_from_slice(&sealed.ciphertext);
    out
}

/// Borrowed view of a framed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framed<'a> {
    pub salt: &'a [u8],
    pub iv: &'a [u8],
    pub ciphertext: &'a [u8],
}

/// Split a framed artifact produced for `algorithm`.
///
/// # Errors
///
/// Returns [`CryptoError::Config`] if `buf` is too short to hold the salt and
/// IV.
pub fn split_frame(algorithm: Algorithm, buf: &[u8]) -> Result<Framed<'_>, CryptoError> {
    let iv_len = iv_len_for(algorithm);
    let header = SALT_LEN + iv_len;
    if buf.len() < header {
        return Err(CryptoError::Config(format!(
            "framed {algorithm} input of {} bytes is shorter than its {header}-byte salt+IV header",
            buf.len()
        )));
    }
    let (salt, rest) = buf.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(iv_len);
    Ok(Framed {
        salt,
        iv,
        ciphertext,
    })
}

fn iv_len_for(algorithm: Algorithm) -> usize {
    match algorithm {
        Algorithm::Aes256Cbc => crate::crypto::cbc::IV_LEN,
        Algorithm::Aes256Gcm => crate::crypto::gcm::NONCE_LEN,
    }
}

// ---------------------------------------------------------------------------
// Named output units
// ---------------------------------------------------------------------------

/// A named, typed byte buffer: a loaded input or a produced output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUnit {
    pub name: String,
    /// Media type of the original file, carried through unchanged.
    pub media_type: Option<String>,
    pub contents: Bytes,
}

impl FileUnit {
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            contents: contents.into(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    fn derive(&self, name: String, contents: Vec<u8>) -> Self {
        Self {
            name,
            media_type: self.media_type.clone(),
            contents: Bytes::from(contents),
        }
    }
}

/// Output of [`Orchestrator::encrypt_file`]: the framed file plus the
/// encryption result it was built from.
#[derive(Debug)]
pub struct EncryptedFile {
    pub file: FileUnit,
    pub sealed: Sealed,
}

impl EncryptedFile {
    /// Base64 description of the artifact, for display or JSON transport.
    ///
    /// Records the name of the file that was encrypted so an artifact-based
    /// decryption can restore it.
    pub fn info(&self) -> ArtifactInfo {
        let mut info = self.sealed.info(&Base64Codec::Standard);
        info.file_name = Some(
            self.file
                .name
                .strip_prefix(ENCRYPTED_PREFIX)
                .unwrap_or(&self.file.name)
                .to_owned(),
        );
        info
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Dispatches file buffers to the selected cipher strategy.
///
/// Holds no per-operation state: every call draws its own salt and IV and
/// derives its own key, so one orchestrator may serve concurrent calls.
#[derive(Clone)]
pub struct Orchestrator {
    kdf: KeyDerivation,
    entropy: Arc<dyn EntropySource>,
    cbc_padding: PaddingPolicy,
}

impl Orchestrator {
    pub fn new(kdf: KeyDerivation, entropy: Arc<dyn EntropySource>) -> Self {
        Self {
            kdf,
            entropy,
            cbc_padding: PaddingPolicy::default(),
        }
    }

    /// Build an orchestrator backed by the OS random source.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Config`] if the configured iteration count is
    /// zero.
    pub fn from_config(cfg: &Config) -> Result<Self, CryptoError> {
        let kdf = KeyDerivation::new(cfg.kdf_iterations)?;
        let padding = if cfg.cbc_strict_padding {
            PaddingPolicy::Strict
        } else {
            PaddingPolicy::Lenient
        };
        Ok(Self::new(kdf, Arc::new(OsEntropy)).with_cbc_padding(padding))
    }

    pub fn with_cbc_padding(mut self, padding: PaddingPolicy) -> Self {
        self.cbc_padding = padding;
        self
    }

    pub fn kdf(&self) -> &KeyDerivation {
        &self.kdf
    }

    /// Resolve the strategy for `algorithm`.
    pub fn cipher(&self, algorithm: Algorithm) -> Cipher {
        self.cipher_with(algorithm, self.kdf)
    }

    fn cipher_with(&self, algorithm: Algorithm, kdf: KeyDerivation) -> Cipher {
        match algorithm {
            Algorithm::Aes256Cbc => Cipher::Cbc(PasswordCipher::new(
                CbcMode::new(self.cbc_padding),
                kdf,
                Arc::clone(&self.entropy),
            )),
            Algorithm::Aes256Gcm => {
                Cipher::Gcm(PasswordCipher::new(GcmMode, kdf, Arc::clone(&self.entropy)))
            }
        }
    }

    /// Encrypt `input` and wrap the framed result as `encrypted-<name>`.
    ///
    /// # Errors
    ///
    /// Propagates every [`CryptoError`] from the selected strategy.
    pub async fn encrypt_file(
        &self,
        algorithm: Algorithm,
        input: &FileUnit,
        passphrase: &str,
        extractable_key: bool,
    ) -> Result<EncryptedFile, CryptoError> {
        let sealed = self
            .cipher(algorithm)
            .encrypt(&input.contents, passphrase.as_bytes(), extractable_key)
            .await?;
        let file = input.derive(format!("{ENCRYPTED_PREFIX}{}", input.name), frame(&sealed));
        info!(
            algorithm = %algorithm,
            input_bytes = input.contents.len(),
            output_bytes = file.contents.len(),
            "file encrypted"
        );
        Ok(EncryptedFile { file, sealed })
    }

    /// Split a framed `input`, decrypt it, and wrap the plaintext as
    /// `decrypted-<name>` (an `encrypted-` prefix on the input name is
    /// dropped first).
    ///
    /// # Errors
    ///
    /// [`CryptoError::Config`] on a truncated frame; otherwise the strategy's
    /// failure. For `aes256-gcm` a wrong passphrase is
    /// [`CryptoError::Authentication`]; for `aes256-cbc` it usually is not an
    /// error at all.
    pub async fn decrypt_file(
        &self,
        algorithm: Algorithm,
        input: &FileUnit,
        passphrase: &str,
    ) -> Result<FileUnit, CryptoError> {
        let framed = split_frame(algorithm, &input.contents)?;
        let plaintext = self
            .cipher(algorithm)
            .decrypt(framed.ciphertext, passphrase.as_bytes(), framed.salt, framed.iv)
            .await?;
        let stem = input
            .name
            .strip_prefix(ENCRYPTED_PREFIX)
            .unwrap_or(&input.name);
        let file = input.derive(format!("{DECRYPTED_PREFIX}{stem}"), plaintext);
        info!(
            algorithm = %algorithm,
            output_bytes = file.contents.len(),
            "file decrypted"
        );
        Ok(file)
    }

    /// Decrypt bare ciphertext with salt and IV supplied out-of-band.
    pub async fn decrypt_detached(
        &self,
        algorithm: Algorithm,
        ciphertext: &[u8],
        passphrase: &str,
        salt: &[u8],
        iv: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.cipher(algorithm)
            .decrypt(ciphertext, passphrase.as_bytes(), salt, iv)
            .await
    }

    /// Decrypt from a transport-encoded [`ArtifactInfo`].
    ///
    /// Uses the algorithm and iteration count recorded in `artifact`, so
    /// artifacts made under an older KDF cost stay decryptable.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Encoding`] if a field is not valid base64;
    /// [`CryptoError::Config`] if the recorded iteration count is zero or
    /// above [`MAX_ITERATIONS`](crate::crypto::kdf::MAX_ITERATIONS). The count
    /// is checked before any key derivation starts.
    pub async fn decrypt_artifact(
        &self,
        artifact: &ArtifactInfo,
        passphrase: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        let kdf = KeyDerivation::new(artifact.iterations)?;
        let codec = Base64Codec::Standard;
        let salt = codec.decode(&artifact.salt_base64)?;
        let iv = codec.decode(&artifact.iv_base64)?;
        let ciphertext = codec.decode(&artifact.cipher_text_base64)?;
        self.cipher_with(artifact.algorithm, kdf)
            .decrypt(&ciphertext, passphrase.as_bytes(), &salt, &iv)
            .await
    }
}
