//! Error taxonomy and transport types shared across `cryptic` crates.

pub mod error;
pub mod protocol;

pub use error::CryptoError;
pub use protocol::{Algorithm, ArtifactInfo, ErrorResponse, NON_EXTRACTABLE_KEY};
