//! veremail - a CLI front-end for the veremail-core validation engine.
//! This is the binary executable of veremail.

#![warn(clippy::all, clippy::pedantic)]

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use clap::Parser;
use veremail_core::{Engine, EngineConfig, RequestOptions};

/// Validate one or more email addresses.
#[derive(Debug, Parser)]
#[command(name = "veremail", version, about)]
struct Cli {
    /// Addresses to validate. With none given and stdin is not a TTY,
    /// addresses are read one per line from stdin instead.
    addresses: Vec<String>,

    /// Emit machine-readable JSON instead of a human-readable summary.
    #[arg(long)]
    json: bool,

    /// Force bulk-scheduler semantics (dedup, chunking, summary stats)
    /// even for a single address.
    #[arg(long)]
    bulk: bool,

    /// Disallow quoted local parts and '+' addressing; raise score
    /// thresholds.
    #[arg(long)]
    strict: bool,

    /// Skip the SMTP envelope probe (no outbound connections).
    #[arg(long)]
    no_smtp: bool,

    /// Disallow internationalized (non-ASCII) domains.
    #[arg(long)]
    no_international: bool,

    /// SMTP dialogue timeout, in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    smtp_timeout_ms: u64,

    /// Line-delimited disposable-domain blocklist to load at startup.
    #[arg(long)]
    blocklist: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::default();
    if let Some(path) = cli.blocklist.clone() {
        tracing::debug!(target: veremail_core::LOG_TARGET, path = %path.display(), "loading disposable blocklist");
        config = config.with_disposable_blocklist_path(path);
    }
    let engine = Engine::new(config);

    let options = RequestOptions {
        check_smtp: !cli.no_smtp,
        allow_international: !cli.no_international,
        strict_mode: cli.strict,
        smtp_timeout_ms: cli.smtp_timeout_ms,
        ..RequestOptions::default()
    };

    let addresses = if cli.addresses.is_empty() {
        read_stdin_addresses()
    } else {
        cli.addresses.clone()
    };

    if addresses.is_empty() {
        eprintln!("Usage: veremail [OPTIONS] <ADDRESS>...");
        std::process::exit(2);
    }

    tracing::info!(
        target: veremail_core::LOG_TARGET,
        count = addresses.len(),
        bulk = cli.bulk,
        strict = cli.strict,
        "starting validation"
    );

    if cli.bulk || addresses.len() > 1 {
        let result = engine.validate_batch(&addresses, &options).await;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result).unwrap());
        } else {
            for item in &result.results {
                print_human(item);
            }
            println!(
                "\n{} total, {} valid, {} risky, {} invalid ({} duplicates removed)",
                result.summary.total,
                result.summary.valid,
                result.summary.risky,
                result.summary.invalid,
                result.duplicates_removed,
            );
            for recommendation in &result.summary.recommendations {
                println!("note: {recommendation}");
            }
        }
    } else {
        let result = engine.validate(&addresses[0], &options).await;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&result).unwrap());
        } else {
            print_human(&result);
        }
    }
}

fn print_human(result: &veremail_core::ValidationResult) {
    println!(
        "{}: {:?} (score {}) - {}",
        result.original, result.status, result.score, result.reason
    );
}

fn read_stdin_addresses() -> Vec<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Vec::new();
    }
    stdin
        .lock()
        .lines()
        .map_while(Result::ok)
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
