//! Binary ⇄ text transport encoding for salts, IVs, ciphertext and exported
//! keys. Display and transport only; nothing cryptographic runs on the text.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use common::CryptoError;

/// A reversible binary-to-text encoding.
///
/// Law: `decode(&encode(b)) == b` for every byte sequence `b`.
pub trait TextCodec {
    fn encode(&self, bytes: &[u8]) -> String;

    /// # Errors
    ///
    /// Returns [`CryptoError::Encoding`] if `text` is not valid for this codec.
    fn decode(&self, text: &str) -> Result<Vec<u8>, CryptoError>;
}

/// Base64 in one of its two common alphabets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Base64Codec {
    /// RFC 4648 §4 alphabet with `=` padding. Used for every artifact field.
    #[default]
    Standard,
    /// RFC 4648 §5 alphabet without padding, as used by a JWK `k` member.
    /// Used for exported key material.
    UrlSafeNoPad,
}

impl TextCodec for Base64Codec {
    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Base64Codec::Standard => STANDARD.encode(bytes),
            Base64Codec::UrlSafeNoPad => URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>, CryptoError> {
        let decoded = match self {
            Base64Codec::Standard => STANDARD.decode(text.trim()),
            Base64Codec::UrlSafeNoPad => URL_SAFE_NO_PAD.decode(text.trim()),
        };
        decoded.map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}
