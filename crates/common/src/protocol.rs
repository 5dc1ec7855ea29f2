//! Transport types exchanged between the cryptic core and its callers.
//!
//! These types are serialised as JSON with camelCase field names so that a UI
//! or another implementation can consume the artifact description directly.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Value of `exportedKeyBase64` when the derived key was not extractable.
pub const NON_EXTRACTABLE_KEY: &str = "non-extractable key";

// ---------------------------------------------------------------------------
// Algorithm selector
// ---------------------------------------------------------------------------

/// The two recognised cipher modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// AES-256-GCM, authenticated. The default.
    #[default]
    #[serde(rename = "aes256-gcm")]
    Aes256Gcm,
    /// AES-256-CBC with PKCS#7 padding, not authenticated.
    #[serde(rename = "aes256-cbc")]
    Aes256Cbc,
}

impl Algorithm {
    /// Selector code, e.g. `"aes256-gcm"`.
    pub fn code(self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => "aes256-gcm",
            Algorithm::Aes256Cbc => "aes256-cbc",
        }
    }

    /// Human-facing label, e.g. `"AES256-GCM"`.
    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => "AES256-GCM",
            Algorithm::Aes256Cbc => "AES256-CBC",
        }
    }

    /// Whether the mode verifies ciphertext integrity on decrypt.
    pub fn is_authenticated(self) -> bool {
        matches!(self, Algorithm::Aes256Gcm)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    /// Accepts exactly the serialised selector codes, as serde does.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aes256-gcm" => Ok(Algorithm::Aes256Gcm),
            "aes256-cbc" => Ok(Algorithm::Aes256Cbc),
            other => Err(CryptoError::Config(format!(
                "unsupported algorithm selector: {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact description
// ---------------------------------------------------------------------------

/// Text-encoded description of one encryption result.
///
/// Every binary field holds transport-encoded bytes; `exported_key_base64`
/// holds either the exported key or [`NON_EXTRACTABLE_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    /// Cipher mode that produced the artifact.
    pub algorithm: Algorithm,
    /// PBKDF2 iteration count used to derive the key.
    pub iterations: u32,
    /// 16-byte salt.
    pub salt_base64: String,
    /// 16-byte IV (CBC) or 12-byte nonce (GCM).
    pub iv_base64: String,
    /// Ciphertext; for GCM the 16-byte tag is appended.
    pub cipher_text_base64: String,
    /// Trailing authentication tag, GCM only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_tag_base64: Option<String>,
    /// Exported key material or the non-extractable sentinel.
    pub exported_key_base64: String,
    /// Name of the file that was encrypted, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl ArtifactInfo {
    /// Returns `true` if the derived key was exported alongside the artifact.
    pub fn has_exported_key(&self) -> bool {
        self.exported_key_base64 != NON_EXTRACTABLE_KEY
    }
}

// ---------------------------------------------------------------------------
// Error report
// ---------------------------------------------------------------------------

/// Error document written by front ends on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"authentication_error"`).
    pub code: String,
    /// Human-readable description. Never contains key material.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&CryptoError> for ErrorResponse {
    fn from(e: &CryptoError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn algorithm_parses_known_selectors() {
        assert_eq!("aes256-gcm".parse::<Algorithm>().unwrap(), Algorithm::Aes256Gcm);
        assert_eq!("aes256-cbc".parse::<Algorithm>().unwrap(), Algorithm::Aes256Cbc);
        assert_eq!(Algorithm::default(), Algorithm::Aes256Gcm);
    }

    #[test]
    fn algorithm_parsing_matches_serde_exactly() {
        for loose in [" aes256-cbc", "AES256-CBC", "aes256-gcm\n", "Aes256-Gcm"] {
            assert!(loose.parse::<Algorithm>().is_err(), "{loose:?}");
            assert!(serde_json::from_value::<Algorithm>(json!(loose)).is_err(), "{loose:?}");
        }
    }

    #[test]
    fn algorithm_rejects_unknown_selector() {
        let err = "aes128-ctr".parse::<Algorithm>().unwrap_err();
        assert_eq!(err.code(), "config_error");
    }

    #[test]
    fn algorithm_serde_uses_selector_codes() {
        assert_eq!(serde_json::to_value(Algorithm::Aes256Cbc).unwrap(), json!("aes256-cbc"));
        let a: Algorithm = serde_json::from_value(json!("aes256-gcm")).unwrap();
        assert_eq!(a, Algorithm::Aes256Gcm);
        assert_eq!(Algorithm::Aes256Gcm.to_string(), "aes256-gcm");
        assert_eq!(Algorithm::Aes256Cbc.label(), "AES256-CBC");
    }

    #[test]
    fn artifact_info_field_names() {
        let info = ArtifactInfo {
            algorithm: Algorithm::Aes256Cbc,
            iterations: 250_000,
            salt_base64: "c2FsdA==".into(),
            iv_base64: "aXY=".into(),
            cipher_text_base64: "Y3Q=".into(),
            auth_tag_base64: None,
            exported_key_base64: NON_EXTRACTABLE_KEY.into(),
            file_name: None,
        };
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["saltBase64"], "c2FsdA==");
        assert_eq!(v["ivBase64"], "aXY=");
        assert_eq!(v["cipherTextBase64"], "Y3Q=");
        assert_eq!(v["exportedKeyBase64"], "non-extractable key");
        assert_eq!(v["algorithm"], "aes256-cbc");
        assert!(v.get("authTagBase64").is_none());
        assert!(v.get("fileName").is_none());
        assert!(!info.has_exported_key());

        let decoded: ArtifactInfo = serde_json::from_value(v).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn artifact_info_carries_file_name() {
        let v = json!({
            "algorithm": "aes256-gcm",
            "iterations": 1000,
            "saltBase64": "",
            "ivBase64": "",
            "cipherTextBase64": "",
            "exportedKeyBase64": NON_EXTRACTABLE_KEY,
            "fileName": "notes.txt",
        });
        let info: ArtifactInfo = serde_json::from_value(v).unwrap();
        assert_eq!(info.file_name.as_deref(), Some("notes.txt"));
        assert_eq!(serde_json::to_value(&info).unwrap()["fileName"], "notes.txt");
    }

    #[test]
    fn error_response_from_crypto_error() {
        let e = ErrorResponse::from(&CryptoError::Authentication);
        assert_eq!(e.code, "authentication_error");
        assert!(e.message.contains("authentication failed"));
    }
}
