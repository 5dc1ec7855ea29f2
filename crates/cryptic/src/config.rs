//! Configuration loading and validation.
//!
//! All values are read from `CRYPTIC_`-prefixed environment variables at
//! startup. Missing variables fall back to defaults; present but invalid ones
//! are rejected with a clear error message.

use anyhow::{Context, Result};
use common::Algorithm;
use serde::Deserialize;

use crate::crypto::kdf::{DEFAULT_ITERATIONS, MAX_ITERATIONS};

/// Prefix of every configuration environment variable.
pub const ENV_PREFIX: &str = "CRYPTIC";

/// Validated cryptic configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default cipher selector (`aes256-gcm` or `aes256-cbc`).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// PBKDF2 iteration count. Decrypting needs the count used to encrypt.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Export the derived key alongside each encryption.
    #[serde(default)]
    pub extractable_key: bool,

    /// Report malformed CBC padding as a decryption error.
    #[serde(default)]
    pub cbc_strict_padding: bool,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_algorithm() -> String {
    Algorithm::default().code().into()
}
fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            kdf_iterations: default_kdf_iterations(),
            extractable_key: false,
            cbc_strict_padding: false,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The configured default algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if `algorithm` is not a recognised selector.
    pub fn default_algorithm(&self) -> Result<Algorithm> {
        self.algorithm
            .parse()
            .with_context(|| format!("{ENV_PREFIX}_ALGORITHM is invalid"))
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        self.default_algorithm()?;
        if self.kdf_iterations == 0 {
            anyhow::bail!("{ENV_PREFIX}_KDF_ITERATIONS must be > 0");
        }
        if self.kdf_iterations > MAX_ITERATIONS {
            anyhow::bail!("{ENV_PREFIX}_KDF_ITERATIONS must be <= {MAX_ITERATIONS}");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("{ENV_PREFIX}_LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_algorithm(), "aes256-gcm");
        assert_eq!(default_kdf_iterations(), 250_000);
        assert_eq!(default_log_level(), "info");

        let cfg = Config::default();
        assert!(!cfg.extractable_key);
        assert!(!cfg.cbc_strict_padding);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.default_algorithm().unwrap(), Algorithm::Aes256Gcm);
    }

    #[test]
    fn validate_rejects_unknown_algorithm() {
        let cfg = Config {
            algorithm: "aes128-ecb".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let cfg = Config {
            kdf_iterations: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_iterations_above_ceiling() {
        let cfg = Config {
            kdf_iterations: MAX_ITERATIONS + 1,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_log_level() {
        let cfg = Config {
            log_level: "  ".into(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_cbc_selector() {
        let cfg = Config {
            algorithm: "aes256-cbc".into(),
            ..Config::default()
        };
        assert_eq!(cfg.default_algorithm().unwrap(), Algorithm::Aes256Cbc);
    }
}
