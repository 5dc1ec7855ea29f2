//! AES-256-CBC with PKCS#7 padding.
//!
//! **CBC is not authenticated.** Decrypting with the wrong passphrase, or
//! decrypting a corrupted ciphertext, does not reliably fail: it yields
//! garbage plaintext. Padding validation catches some of these cases and is
//! therefore a policy ([`PaddingPolicy`]), not an integrity check. Prefer
//! [`GcmMode`](super::gcm::GcmMode) whenever tamper detection matters.

use cbc::cipher::{
    block_padding::{NoPadding, Padding, Pkcs7},
    consts::U16,
    generic_array::GenericArray,
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};
use common::{Algorithm, CryptoError};

use super::cipher::{check_iv, BlockMode};
use super::kdf::{DerivedKey, KeyUsage};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Byte length of a CBC IV (16 bytes = 128 bits).
pub const IV_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

/// How CBC decryption treats the trailing padding block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingPolicy {
    /// Strip well-formed PKCS#7 padding; otherwise return the decrypted
    /// blocks untouched. Wrong passphrases never surface as errors, and
    /// nothing observable (errors or log events) reveals whether the padding
    /// was valid.
    #[default]
    Lenient,
    /// Malformed PKCS#7 padding is a [`CryptoError::Decryption`].
    Strict,
}

/// The CBC block mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct CbcMode {
    padding: PaddingPolicy,
}

impl CbcMode {
    pub fn new(padding: PaddingPolicy) -> Self {
        Self { padding }
    }

    pub fn padding(&self) -> PaddingPolicy {
        self.padding
    }
}

impl BlockMode for CbcMode {
    const ALGORITHM: Algorithm = Algorithm::Aes256Cbc;
    const IV_LEN: usize = IV_LEN;

    fn seal(&self, key: &DerivedKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = key.material(KeyUsage::Encrypt)?;
        check_iv(iv, IV_LEN)?;
        let enc = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| CryptoError::Encryption(format!("cipher init failed: {e}")))?;
        Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn open(&self, key: &DerivedKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = key.material(KeyUsage::Decrypt)?;
        check_iv(iv, IV_LEN)?;
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CryptoError::Decryption(format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_LEN}",
                ciphertext.len()
            )));
        }
        let dec = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| CryptoError::Decryption(format!("cipher init failed: {e}")))?;

        match self.padding {
            PaddingPolicy::Strict => dec
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| CryptoError::Decryption("invalid PKCS#7 padding".into())),
            PaddingPolicy::Lenient => {
                let mut blocks = dec
                    .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                    .map_err(|_| CryptoError::Decryption("ciphertext is not block aligned".into()))?;
                strip_pkcs7(&mut blocks);
                Ok(blocks)
            }
        }
    }
}

/// Truncate `buf` by the PKCS#7 padding of its last block if that padding
/// is well formed. Returns whether padding was removed.
fn strip_pkcs7(buf: &mut Vec<u8>) -> bool {
    let Some(start) = buf.len().checked_sub(BLOCK_LEN) else {
        return false;
    };
    let last = GenericArray::<u8, U16>::from_slice(&buf[start..]);
    let kept = match Pkcs7::unpad(last) {
        Ok(kept) => kept.len(),
        Err(_) => return false,
    };
    buf.truncate(start + kept);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::{KeyUsages, KEY_LEN};

    // NIST SP 800-38A, F.2.5 CBC-AES256.Encrypt
    const NIST_KEY: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
    const NIST_IV: &str = "000102030405060708090a0b0c0d0e0f";
    const NIST_PT: &str = "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51";
    const NIST_CT: &str = "f58c4c04d6e5f1ba779eabfb5f7bfbd69cfc4e967edb808d679f777bc6702c7d";

    fn key(usages: KeyUsages) -> DerivedKey {
        let bytes: [u8; KEY_LEN] = hex::decode(NIST_KEY).unwrap().try_into().unwrap();
        DerivedKey::from_bytes(bytes, usages, false)
    }

    #[test]
    fn nist_known_answer() {
        let iv = hex::decode(NIST_IV).unwrap();
        let pt = hex::decode(NIST_PT).unwrap();
        let ct = CbcMode::default()
            .seal(&key(KeyUsages::ENCRYPT), &iv, &pt)
            .unwrap();
        // Two data blocks plus one full padding block.
        assert_eq!(ct.len(), 48);
        assert_eq!(hex::encode(&ct[..32]), NIST_CT);

        let back = CbcMode::default()
            .open(&key(KeyUsages::DECRYPT), &iv, &ct)
            .unwrap();
        assert_eq!(back, pt);
    }

    #[test]
    fn strict_and_lenient_agree_on_valid_input() {
        let iv = [3u8; IV_LEN];
        let ct = CbcMode::default()
            .seal(&key(KeyUsages::ENCRYPT), &iv, b"hello world")
            .unwrap();
        for policy in [PaddingPolicy::Strict, PaddingPolicy::Lenient] {
            let pt = CbcMode::new(policy)
                .open(&key(KeyUsages::DECRYPT), &iv, &ct)
                .unwrap();
            assert_eq!(pt, b"hello world");
        }
    }

    #[test]
    fn misaligned_ciphertext_is_decryption_error() {
        let iv = [0u8; IV_LEN];
        for len in [0usize, 15, 17] {
            let err = CbcMode::default()
                .open(&key(KeyUsages::DECRYPT), &iv, &vec![0u8; len])
                .unwrap_err();
            assert!(matches!(err, CryptoError::Decryption(_)), "len {len}");
        }
    }

    #[test]
    fn strict_reports_bad_padding() {
        let iv = [0u8; IV_LEN];
        let mut ct = CbcMode::default()
            .seal(&key(KeyUsages::ENCRYPT), &iv, &[0x41; 16])
            .unwrap();
        // Decrypt the data block as if it were the last block: its plaintext
        // ends in 0x41, which is not valid PKCS#7.
        ct.truncate(16);
        let err = CbcMode::new(PaddingPolicy::Strict)
            .open(&key(KeyUsages::DECRYPT), &iv, &ct)
            .unwrap_err();
        assert!(matches!(err, CryptoError::Decryption(_)));

        let lenient = CbcMode::new(PaddingPolicy::Lenient)
            .open(&key(KeyUsages::DECRYPT), &iv, &ct)
            .unwrap();
        assert_eq!(lenient, vec![0x41; 16]);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn events_during(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn lenient_padding_outcome_is_not_logged() {
        let iv = [0u8; IV_LEN];
        let ct = CbcMode::default()
            .seal(&key(KeyUsages::ENCRYPT), &iv, &[0x41; 16])
            .unwrap();
        let lenient = CbcMode::new(PaddingPolicy::Lenient);
        let dec = key(KeyUsages::DECRYPT);

        let valid = events_during(|| {
            lenient.open(&dec, &iv, &ct).unwrap();
        });
        let malformed = events_during(|| {
            lenient.open(&dec, &iv, &ct[..16]).unwrap();
        });
        assert_eq!(valid, malformed);
        assert!(!malformed.contains("padding"));
    }

    #[test]
    fn decrypt_only_key_cannot_seal() {
        let err = CbcMode::default()
            .seal(&key(KeyUsages::DECRYPT), &[0u8; IV_LEN], b"x")
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyUsage(_)));
    }

    #[test]
    fn encrypt_only_key_cannot_open() {
        let err = CbcMode::default()
            .open(&key(KeyUsages::ENCRYPT), &[0u8; IV_LEN], &[0u8; 16])
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyUsage(_)));
    }

    #[test]
    fn wrong_iv_length_is_config_error() {
        let err = CbcMode::default()
            .seal(&key(KeyUsages::ENCRYPT), &[0u8; 12], b"x")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Config(_)));
    }

    #[test]
    fn strip_pkcs7_cases() {
        let block = |tail: &[u8]| {
            let mut b = vec![0xEEu8; BLOCK_LEN - tail.len()];
            b.extend_from_slice(tail);
            b
        };

        let mut full = [vec![7u8; BLOCK_LEN], block(&[3, 3, 3])].concat();
        assert!(strip_pkcs7(&mut full));
        assert_eq!(full.len(), 2 * BLOCK_LEN - 3);

        let mut whole_block = vec![16u8; BLOCK_LEN];
        assert!(strip_pkcs7(&mut whole_block));
        assert!(whole_block.is_empty());

        let mut zero = block(&[1, 0]);
        assert!(!strip_pkcs7(&mut zero));
        assert_eq!(zero.len(), BLOCK_LEN);

        let mut inconsistent = block(&[9, 2, 1, 2]);
        assert!(!strip_pkcs7(&mut inconsistent));
        assert_eq!(inconsistent.len(), BLOCK_LEN);

        let mut oversized = vec![17u8; BLOCK_LEN];
        assert!(!strip_pkcs7(&mut oversized));

        let mut short = vec![1u8; BLOCK_LEN - 1];
        assert!(!strip_pkcs7(&mut short));

        let mut empty = Vec::new();
        assert!(!strip_pkcs7(&mut empty));
    }
}
