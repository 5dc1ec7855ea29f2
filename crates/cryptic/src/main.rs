//! `cryptic` — command-line entry point.
//!
//! Startup sequence:
//! 1. Parse command-line arguments.
//! 2. Load and validate [`Config`] from environment variables.
//! 3. Initialise structured logging.
//! 4. Load the input file, run the [`Orchestrator`], write the named output.
//!
//! Failures are written to stderr as an [`ErrorResponse`] JSON document and
//! the process exits with the code of the failure kind.

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use zeroize::Zeroizing;

use cli::{Cli, Commands, DecryptArgs, EncryptArgs, FileArgs};
use cryptic::config::Config;
use cryptic::orchestrator::DECRYPTED_PREFIX;
use cryptic::{telemetry, ArtifactInfo, CryptoError, ErrorResponse, FileUnit, Orchestrator};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return ExitCode::from(2);
        }
    };

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init_telemetry(&cfg.log_level) {
        eprintln!("ERROR: {e:#}");
        return ExitCode::FAILURE;
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        kdf_iterations = cfg.kdf_iterations,
        "cryptic starting"
    );

    // -----------------------------------------------------------------------
    // 3. Operation
    // -----------------------------------------------------------------------
    match run(cli, &cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

async fn run(cli: Cli, cfg: &Config) -> Result<()> {
    let orchestrator = Orchestrator::from_config(cfg)?;
    match cli.command {
        Commands::Encrypt(args) => encrypt(&orchestrator, cfg, args).await,
        Commands::Decrypt(args) => decrypt(&orchestrator, cfg, args).await,
    }
}

async fn encrypt(orchestrator: &Orchestrator, cfg: &Config, mut args: EncryptArgs) -> Result<()> {
    let passphrase = Zeroizing::new(std::mem::take(&mut args.file.passphrase));
    let algorithm = match args.file.algorithm {
        Some(a) => a,
        None => cfg.default_algorithm()?,
    };
    let extractable_key = args.extractable_key || cfg.extractable_key;

    let input = load(&args.file.input).await?;
    let encrypted = orchestrator
        .encrypt_file(algorithm, &input, &passphrase, extractable_key)
        .await?;

    let out = output_path(&args.file, &encrypted.file.name);
    write(&out, &encrypted.file.contents).await?;

    let info = encrypted.info();
    println!(
        "{}",
        serde_json::to_string_pretty(&info).context("failed to serialise artifact info")?
    );
    Ok(())
}

async fn decrypt(orchestrator: &Orchestrator, cfg: &Config, mut args: DecryptArgs) -> Result<()> {
    let passphrase = Zeroizing::new(std::mem::take(&mut args.file.passphrase));

    if args.artifact {
        let raw = tokio::fs::read(&args.file.input)
            .await
            .with_context(|| format!("failed to read {}", args.file.input.display()))?;
        let artifact: ArtifactInfo =
            serde_json::from_slice(&raw).context("artifact description is not valid JSON")?;
        if let Some(a) = args.file.algorithm {
            if a != artifact.algorithm {
                return Err(CryptoError::Config(format!(
                    "--algorithm {a} does not match artifact algorithm {}",
                    artifact.algorithm
                ))
                .into());
            }
        }
        let plaintext = orchestrator.decrypt_artifact(&artifact, &passphrase).await?;
        let out = output_path(&args.file, &artifact_output_name(&artifact, &args.file.input));
        return write(&out, &plaintext).await;
    }

    let algorithm = match args.file.algorithm {
        Some(a) => a,
        None => cfg.default_algorithm()?,
    };
    let input = load(&args.file.input).await?;
    let decrypted = orchestrator
        .decrypt_file(algorithm, &input, &passphrase)
        .await?;
    let out = output_path(&args.file, &decrypted.name);
    write(&out, &decrypted.contents).await
}

async fn load(path: &Path) -> Result<FileUnit> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(FileUnit::new(name, contents))
}

async fn write(path: &Path, contents: &[u8]) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(output = %path.display(), bytes = contents.len(), "output written");
    Ok(())
}

/// `decrypted-<name>` for an artifact description read from `input`.
///
/// Uses the recorded file name (its final component only) when present,
/// otherwise the description's own name without a trailing `.json`.
fn artifact_output_name(artifact: &ArtifactInfo, input: &Path) -> String {
    let recorded = artifact
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned());
    let name = recorded.unwrap_or_else(|| {
        let own = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match own.strip_suffix(".json") {
            Some(stem) if !stem.is_empty() => stem.to_owned(),
            _ => own,
        }
    });
    format!("{DECRYPTED_PREFIX}{name}")
}

/// `--output` if given, otherwise `name` next to the input file.
fn output_path(args: &FileArgs, name: &str) -> PathBuf {
    match &args.output {
        Some(path) => path.clone(),
        None => args
            .input
            .parent()
            .map(|dir| dir.join(name))
            .unwrap_or_else(|| PathBuf::from(name)),
    }
}

fn report(e: &anyhow::Error) -> ExitCode {
    let (response, code) = match e.downcast_ref::<CryptoError>() {
        Some(crypto) => (ErrorResponse::from(crypto), crypto.exit_code()),
        None => (ErrorResponse::new("internal_error", format!("{e:#}")), 1),
    };
    error!(code = %response.code, "operation failed");
    match serde_json::to_string(&response) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("ERROR: {}", response.message),
    }
    ExitCode::from(code)
}
