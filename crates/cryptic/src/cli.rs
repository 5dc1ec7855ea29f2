//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cryptic::Algorithm;

/// cryptic - password-based AES-256 file encryption
#[derive(Parser)]
#[command(name = "cryptic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encrypt a file and print its artifact description as JSON
    Encrypt(EncryptArgs),
    /// Decrypt a framed file (or an artifact description with --artifact)
    Decrypt(DecryptArgs),
}

/// Arguments shared by both commands
#[derive(Args)]
pub struct FileArgs {
    /// File to read
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Cipher mode: aes256-gcm or aes256-cbc (default: CRYPTIC_ALGORITHM)
    #[arg(short, long, value_parser = parse_algorithm)]
    pub algorithm: Option<Algorithm>,

    /// Where to write the result (default: prefixed name next to FILE)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Passphrase used to derive the key. Prefer setting CRYPTIC_PASSPHRASE:
    /// a value given on the command line is visible to other local users in
    /// the process list.
    #[arg(long, env = "CRYPTIC_PASSPHRASE", hide_env_values = true)]
    pub passphrase: String,
}

/// Arguments for the `encrypt` command
#[derive(Args)]
pub struct EncryptArgs {
    #[command(flatten)]
    pub file: FileArgs,

    /// Export the derived key in the artifact description
    #[arg(long)]
    pub extractable_key: bool,
}

/// Arguments for the `decrypt` command
#[derive(Args)]
pub struct DecryptArgs {
    #[command(flatten)]
    pub file: FileArgs,

    /// FILE is an artifact description (JSON) rather than a framed file
    #[arg(long)]
    pub artifact: bool,
}

fn parse_algorithm(s: &str) -> Result<Algorithm, String> {
    s.parse().map_err(|e: cryptic::CryptoError| e.to_string())
}
