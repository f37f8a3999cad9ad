use reconprobe::cli::{Cli, Command};
use reconprobe::config::ScanConfig;
use reconprobe::error::AppError;
use reconprobe::logging::ScanLogger;
use reconprobe::orchestrator::{AllowAllGate, ScanOrchestrator};
use reconprobe::registry::ProbeRegistry;
use reconprobe::report::Termination;
use reconprobe::transport::IsahcTransport;
use std::process::ExitCode;
use std::sync::Arc;

const EXIT_SUCCESS: u8 = 0;
const EXIT_VALIDATION_ERROR: u8 = 2;
const EXIT_CANCELLED: u8 = 3;
const EXIT_DEADLINE_EXCEEDED: u8 = 4;
const EXIT_INTERNAL_ERROR: u8 = 5;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    run(cli).await
}

async fn run(cli: Cli) -> ExitCode {
    let mode = match cli.mode() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_VALIDATION_ERROR);
        }
    };

    let mut config = ScanConfig::default();
    if let Some(path) = &cli.config {
        match ScanConfig::load_file(path) {
            Ok(Some(file)) => config = config.apply_file(file),
            Ok(None) => {}
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(EXIT_VALIDATION_ERROR);
            }
        }
    }
    if let Some(timeout) = cli.timeout_secs {
        config.request_timeout = std::time::Duration::from_secs(timeout);
    }
    if let Some(concurrency) = cli.concurrency {
        config.global_concurrency = concurrency;
    }
    config.exclude_categories.extend(cli.exclude_category.clone());
    config.exclude_nsfw = config.exclude_nsfw || cli.no_nsfw;
    if let Some(seed) = cli.seed {
        config.ua_seed = Some(seed);
    }

    let logger = Arc::new(ScanLogger::new(cli.log_file.clone()));

    let registry = match ProbeRegistry::build() {
        Ok(r) => Arc::new(r),
        Err(e) => {
            eprintln!("error: registry failed to build: {e}");
            return ExitCode::from(EXIT_INTERNAL_ERROR);
        }
    };

    let ua_seed = config.ua_seed.unwrap_or(0);
    let transport = match IsahcTransport::new(64, config.max_redirects, ua_seed) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            eprintln!("error: could not build http transport: {e}");
            return ExitCode::from(EXIT_INTERNAL_ERROR);
        }
    };

    let orchestrator = ScanOrchestrator::new(registry, transport, config, Arc::new(AllowAllGate), logger.clone());

    let mode_label = match mode {
        reconprobe::registry::ScanMode::Quick => "quick",
        reconprobe::registry::ScanMode::Deep => "deep",
    };
    let command_kind = kind_label_for(&cli.command);
    logger.scan_start(command_kind, mode_label, command_kind);

    let (kind_label, result) = match &cli.command {
        Command::Username { value } => ("username", orchestrator.scan_username(value, mode).await),
        Command::Email { value } => ("email", orchestrator.scan_email(value, mode).await),
        Command::Phone { value } => ("phone", orchestrator.scan_phone(value, mode).await),
        Command::Domain { value } => ("domain", orchestrator.scan_domain(value, mode).await),
    };

    match result {
        Ok(report) => {
            logger.scan_end(report.stats.attempted, report.stats.present, kind_label);
            let json = match serde_json::to_string_pretty(&report) {
                Ok(j) => j,
                Err(e) => {
                    eprintln!("error: could not serialise report: {e}");
                    return ExitCode::from(EXIT_INTERNAL_ERROR);
                }
            };
            match &cli.output {
                Some(path) => {
                    if let Err(e) = std::fs::write(path, json) {
                        eprintln!("error: could not write output file: {e}");
                        return ExitCode::from(EXIT_INTERNAL_ERROR);
                    }
                }
                None => println!("{json}"),
            }
            // Cancellation and deadline expiry are not errors (§7): the
            // report is always emitted above; only the exit code differs.
            match report.termination {
                Termination::Completed => ExitCode::from(EXIT_SUCCESS),
                Termination::Cancelled => {
                    eprintln!("warning: scan was cancelled before every probe finished");
                    ExitCode::from(EXIT_CANCELLED)
                }
                Termination::DeadlineExceeded => {
                    eprintln!("warning: scan deadline exceeded before every probe finished");
                    ExitCode::from(EXIT_DEADLINE_EXCEEDED)
                }
            }
        }
        Err(AppError::Validation(e)) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_VALIDATION_ERROR)
        }
        Err(AppError::Registry(e)) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_INTERNAL_ERROR)
        }
        Err(AppError::Internal(msg)) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_INTERNAL_ERROR)
        }
    }
}

fn kind_label_for(command: &Command) -> &'static str {
    match command {
        Command::Username { .. } => "username",
        Command::Email { .. } => "email",
        Command::Phone { .. } => "phone",
        Command::Domain { .. } => "domain",
    }
}
