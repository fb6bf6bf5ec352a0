//! Sentinel access-control reference demo CLI
//!
//! Runs the end-to-end scenarios against a seeded in-memory runtime, checks
//! a persisted JSON-lines audit log, and provisions credential material.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- happy-path
//!   cargo run -p demo -- lockout
//!   cargo run -p demo -- mismatch
//!   cargo run -p demo -- expiry
//!   cargo run -p demo -- nfc
//!   cargo run -p demo -- tamper
//!   cargo run -p demo -- verify-log --path audit.jsonl --key-path ed25519_secret.hex
//!   cargo run -p demo -- gen-qr --bytes 20
//!   cargo run -p demo -- hash-password 's3cret'

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sentinel_audit::{audit_chain, store::read_events, verify_signatures, Signer};
use sentinel_contracts::error::{SentinelError, SentinelResult};
use sentinel_core::{config::SentinelConfig, traits::QrVerifier};
use sentinel_credentials::{Argon2Passwords, QrCodec};
use sentinel_ref::scenarios::{expiry, happy_path, lockout, mismatch, nfc, tamper};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Sentinel: two-factor (password + QR) access control with a signed audit log.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Sentinel access-control reference demo",
    long_about = "Runs Sentinel scenarios showing the password + QR login protocol,\n\
                  lockout, NFC access, and tamper-evident audit logging."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Scenario A: password, then the user's own QR.
    HappyPath,
    /// Scenario B: three wrong passwords lock the account.
    Lockout,
    /// Scenario C: another user's QR against a pending session.
    Mismatch,
    /// Scenario D: QR scanned after the window closed.
    Expiry,
    /// NFC door taps, camera access logs, and role checks.
    Nfc,
    /// Altered copies of the audit log fail verification.
    Tamper,
    /// Verify the hash chain (and optionally signatures) of a JSON-lines log.
    VerifyLog {
        /// Audit log file.  Defaults to `audit.log_path` from the config.
        #[arg(long)]
        path: Option<PathBuf>,
        /// Hex seed file of the signing key; enables the signature check.
        #[arg(long)]
        key_path: Option<PathBuf>,
        /// Sentinel TOML configuration.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Generate a QR value and print it with its storage hash.
    GenQr {
        /// Random bytes in the value.  Defaults to `qr.value_bytes`.
        #[arg(long)]
        bytes: Option<usize>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the Argon2id hash of a password.
    HashPassword { password: String },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll => {
            print_banner();
            run_all()
        }
        Command::HappyPath => happy_path::run_scenario(),
        Command::Lockout => lockout::run_scenario(),
        Command::Mismatch => mismatch::run_scenario(),
        Command::Expiry => expiry::run_scenario(),
        Command::Nfc => nfc::run_scenario(),
        Command::Tamper => tamper::run_scenario(),
        Command::VerifyLog {
            path,
            key_path,
            config,
        } => verify_log(path, key_path, config),
        Command::GenQr { bytes, config } => gen_qr(bytes, config),
        Command::HashPassword { password } => hash_password(&password),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_all() -> SentinelResult<()> {
    happy_path::run_scenario()?;
    lockout::run_scenario()?;
    mismatch::run_scenario()?;
    expiry::run_scenario()?;
    nfc::run_scenario()?;
    tamper::run_scenario()?;
    println!("All scenarios completed successfully.");
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> SentinelResult<SentinelConfig> {
    let mut config = match path {
        Some(path) => SentinelConfig::from_file(&path)?,
        None => SentinelConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn verify_log(
    path: Option<PathBuf>,
    key_path: Option<PathBuf>,
    config: Option<PathBuf>,
) -> SentinelResult<()> {
    let config = load_config(config)?;
    let path = path
        .or(config.audit.log_path)
        .ok_or_else(|| SentinelError::ConfigError {
            reason: "no audit log given: pass --path or set AUDIT_LOG_PATH".to_string(),
        })?;

    let events = read_events(&path)?;
    audit_chain(None, &events)?;
    println!("{}: hash chain VERIFIED ({} event(s))", path.display(), events.len());

    if let Some(key_path) = key_path {
        let seed = std::fs::read_to_string(&key_path).map_err(|e| SentinelError::SigningFailed {
            reason: format!("failed to read key file '{}': {}", key_path.display(), e),
        })?;
        let key = Signer::from_seed_hex(&seed)?.verifying_key();
        verify_signatures(&key, &events)?;
        println!("{}: signatures VERIFIED", path.display());
    }
    Ok(())
}

fn gen_qr(bytes: Option<usize>, config: Option<PathBuf>) -> SentinelResult<()> {
    let config = load_config(config)?;
    let codec = QrCodec::new(bytes.unwrap_or(config.qr.value_bytes));
    let value = codec.generate_value();

    println!("qr_value:       {}", value);
    println!("qr_value_hash:  {}", codec.hash(&value)?);
    println!("fingerprint:    {}", codec.fingerprint(&value));
    Ok(())
}

fn hash_password(password: &str) -> SentinelResult<()> {
    println!("{}", Argon2Passwords.hash_password(password)?);
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("SENTINEL Access-Control Reference");
    println!("===================================");
    println!();
    println!("Login protocol per attempt:");
    println!("  [1] Lock check on the account key (3 failures → 10 minute lock)");
    println!("  [2] Password verified against the Argon2id hash");
    println!("  [3] Pending session opened; QR must be scanned within 60 seconds");
    println!("  [4] QR matched against the session owner, then all other users");
    println!("  [5] Every outcome appended to the Ed25519-signed, SHA-256-chained log");
    println!();
}
