//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No passphrases, key material, salts, IVs or plaintext** may appear in
//!   any log field. Log sizes, algorithms and iteration counts only.
//! - Log level is configurable via `CRYPTIC_LOG_LEVEL` (default: `info`);
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init_telemetry;
