//! Command-line surface (§6). One subcommand per identifier kind,
//! matching the teacher's `clap`-derive `Cli` style.

use crate::registry::ScanMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reconprobe")]
#[command(version = concat!("Ver:", env!("CARGO_PKG_VERSION")))]
#[command(about = "Concurrent OSINT identifier reconnaissance engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// quick (curated, fast) or deep (full probe set).
    #[arg(long = "mode", default_value = "quick", global = true)]
    pub mode: String,

    /// Optional path to write the report JSON; stdout if omitted.
    #[arg(long = "output", global = true)]
    pub output: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout", global = true)]
    pub timeout_secs: Option<u64>,

    /// Global in-flight request cap.
    #[arg(long = "concurrency", global = true)]
    pub concurrency: Option<usize>,

    /// Exclude a probe category; repeatable.
    #[arg(long = "exclude-category", global = true)]
    pub exclude_category: Vec<String>,

    /// Exclude NSFW-flagged probes.
    #[arg(long = "no-nsfw", global = true)]
    pub no_nsfw: bool,

    /// Optional TOML config file (layer 2 of the config stack).
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Override the per-scan UA-rotation seed (testability).
    #[arg(long = "seed", global = true)]
    pub seed: Option<u64>,

    /// Override the structured logger's output path. `OSINT_LOG_FILE`
    /// is also honoured; this flag wins over the environment variable.
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a username across social/tech/gaming/chat platforms.
    Username { value: String },
    /// Scan an email address for account-existence signals and breaches.
    Email { value: String },
    /// Scan an E.164 phone number for registration and carrier signals.
    Phone { value: String },
    /// Scan a domain for certificate-transparency, DNS, TLS, WHOIS and
    /// header posture.
    Domain { value: String },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn mode(&self) -> Result<ScanMode, String> {
        self.mode.parse()
    }
}
