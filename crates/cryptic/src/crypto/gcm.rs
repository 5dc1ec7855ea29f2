//! AES-256-GCM: authenticated encryption with a 96-bit nonce and a 128-bit
//! tag appended to the ciphertext.
//!
//! **Never reuse a (key, nonce) pair.** GCM nonce reuse breaks both
//! confidentiality and authentication. [`PasswordCipher`](super::cipher::PasswordCipher)
//! derives a fresh key from a fresh salt on every encryption, so a nonce is
//! never paired with the same key twice.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use common::{Algorithm, CryptoError};

use super::cipher::{check_iv, BlockMode};
use super::kdf::{DerivedKey, KeyUsage};

/// Byte length of a GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// The GCM block mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcmMode;

impl BlockMode for GcmMode {
    const ALGORITHM: Algorithm = Algorithm::Aes256Gcm;
    const IV_LEN: usize = NONCE_LEN;

    fn seal(&self, key: &DerivedKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = build_cipher(key, KeyUsage::Encrypt)?;
        check_iv(iv, NONCE_LEN)?;
        cipher
            .encrypt(Nonce::from_slice(iv), plaintext)
            .map_err(|_| CryptoError::Encryption("aead operation failed".into()))
    }

    fn open(&self, key: &DerivedKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = build_cipher(key, KeyUsage::Decrypt)?;
        check_iv(iv, NONCE_LEN)?;
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::Decryption(format!(
                "ciphertext of {} bytes cannot hold a {TAG_LEN}-byte tag",
                ciphertext.len()
            )));
        }
        cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| CryptoError::Authentication)
    }
}

fn build_cipher(key: &DerivedKey, usage: KeyUsage) -> Result<Aes256Gcm, CryptoError> {
    let material = key.material(usage)?;
    Aes256Gcm::new_from_slice(material)
        .map_err(|_| CryptoError::Config("invalid AES-256 key length".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::{KeyUsages, KEY_LEN};

    fn key(usages: KeyUsages) -> DerivedKey {
        DerivedKey::from_bytes([0x42; KEY_LEN], usages, false)
    }

    #[test]
    fn gcm_known_answer_test_case_14() {
        let zero_key = DerivedKey::from_bytes([0u8; KEY_LEN], KeyUsages::ENCRYPT, false);
        let out = GcmMode.seal(&zero_key, &[0u8; NONCE_LEN], &[0u8; 16]).unwrap();
        assert_eq!(hex::encode(&out[..16]), "cea7403d4d606b6e074ec5d3baf39d18");
        assert_eq!(hex::encode(&out[16..]), "d0d1c8a799996bf0265b98b5d48ab919");
    }

    #[test]
    fn round_trip() {
        let nonce = [1u8; NONCE_LEN];
        let ct = GcmMode.seal(&key(KeyUsages::ENCRYPT), &nonce, b"hello world").unwrap();
        assert_eq!(ct.len(), 11 + TAG_LEN);
        let pt = GcmMode.open(&key(KeyUsages::DECRYPT), &nonce, &ct).unwrap();
        assert_eq!(pt, b"hello world");
    }

    #[test]
    fn every_bit_flip_fails_authentication() {
        let nonce = [1u8; NONCE_LEN];
        let ct = GcmMode.seal(&key(KeyUsages::ENCRYPT), &nonce, b"hello world").unwrap();
        let dec = key(KeyUsages::DECRYPT);
        for byte in 0..ct.len() {
            for bit in 0..8 {
                let mut tampered = ct.clone();
                tampered[byte] ^= 1 << bit;
                let err = GcmMode.open(&dec, &nonce, &tampered).unwrap_err();
                assert!(
                    matches!(err, CryptoError::Authentication),
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let nonce = [1u8; NONCE_LEN];
        let ct = GcmMode.seal(&key(KeyUsages::ENCRYPT), &nonce, b"secret").unwrap();
        let other = DerivedKey::from_bytes([0x43; KEY_LEN], KeyUsages::DECRYPT, false);
        assert!(matches!(
            GcmMode.open(&other, &nonce, &ct),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn truncated_ciphertext_is_decryption_error() {
        let err = GcmMode
            .open(&key(KeyUsages::DECRYPT), &[0u8; NONCE_LEN], &[0u8; TAG_LEN - 1])
            .unwrap_err();
        assert!(matches!(err, CryptoError::Decryption(_)));
    }

    #[test]
    fn wrong_nonce_length_is_config_error() {
        let err = GcmMode
            .seal(&key(KeyUsages::ENCRYPT), &[0u8; 16], b"x")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Config(_)));
    }

    #[test]
    fn decrypt_only_key_cannot_seal() {
        let err = GcmMode
            .seal(&key(KeyUsages::DECRYPT), &[0u8; NONCE_LEN], b"x")
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyUsage(_)));
    }
}
