// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! hubqueued - The hubqueue service.
//!
//! Keeps GitHub writes made while offline in a durable queue and replays
//! them once connectivity returns.
//!
//! Usage:
//!   hubqueued run
//!   hubqueued status [--json]
//!   hubqueued drain
//!   hubqueued enqueue --method POST --url <url> [-H 'Name: value']... [--body <json>]
//!   hubqueued probe

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hq_core::{HttpMethod, QueuedRequest};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hubqueue::config::Config;
use hubqueue::error::{Error, Result};
use hubqueue::{env, DrainOutcome, HttpProber, HttpTransport, Prober, ReqwestTransport};
use hubqueue::{SyncContext, WriteQueue};

/// Lock filename for single instance guarantee.
const LOCK_NAME: &str = "hubqueued.lock";

/// hubqueued: offline write queue for the GitHub issue board
#[derive(Parser, Debug)]
#[command(name = "hubqueued", version)]
#[command(about = "Queues GitHub writes while offline and replays them when connectivity returns")]
struct Cli {
    /// Config file (default: <config dir>/hubqueue/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State directory for the lock file and SQLite queue
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the service until interrupted
    Run,

    /// List queued requests
    Status {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Replay queued requests now
    Drain,

    /// Queue a request by hand
    Enqueue {
        /// HTTP method (POST, PATCH, PUT or DELETE)
        #[arg(long)]
        method: HttpMethod,

        /// Absolute URL
        #[arg(long)]
        url: String,

        /// Header in the form 'Name: value' (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(long)]
        body: Option<String>,
    },

    /// Probe the connectivity target once
    Probe,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_file.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(env::config_path);
    let config = Config::load(&config_path)?;
    let state_dir = cli.state_dir.unwrap_or_else(env::state_dir);

    match cli.command {
        Command::Run => serve(&config, &state_dir).await,
        Command::Status { json } => status(&config, &state_dir, json).await,
        Command::Drain => drain(&config, &state_dir).await,
        Command::Enqueue {
            method,
            url,
            headers,
            body,
        } => enqueue(&config, &state_dir, method, url, &headers, body).await,
        Command::Probe => probe(&config).await,
    }
}

fn setup_logging(verbose: bool, log_file: Option<&Path>) {
    let directive = log_directive(verbose, std::env::var(env::vars::RUST_LOG).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    // Try to open the log file, fall back to stderr
    let file = log_file.and_then(|path| {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    if let Some(file) = file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// `--verbose` wins over `RUST_LOG`, which wins over the `info` default.
fn log_directive(verbose: bool, from_env: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    from_env
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

fn acquire_lock(state_dir: &Path) -> Result<fs::File> {
    use fs2::FileExt;

    fs::create_dir_all(state_dir)?;
    let lock_path = state_dir.join(LOCK_NAME);
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&lock_path)?;
    file.try_lock_exclusive()
        .map_err(|_| Error::AlreadyRunning(lock_path))?;
    Ok(file)
}

/// Opens the configured queue outside of a running service.
async fn open_queue(config: &Config, state_dir: &Path) -> Result<WriteQueue> {
    fs::create_dir_all(state_dir)?;
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
        config.replay.timeout(),
        &config.github.user_agent,
    )?);
    Ok(WriteQueue::open(config.store.build(state_dir), transport).await?)
}

async fn serve(config: &Config, state_dir: &Path) -> Result<()> {
    let _lock = acquire_lock(state_dir)?;
    info!(
        state_dir = %state_dir.display(),
        backend = ?config.store.backend,
        probe = %config.probe.url,
        "hubqueued starting"
    );

    let context = SyncContext::start(config, state_dir).await?;
    tokio::signal::ctrl_c().await?;
    info!("interrupted, shutting down");
    context.shutdown().await?;
    info!("hubqueued stopped");
    Ok(())
}

#[derive(Serialize)]
struct StatusEntry {
    key: String,
    method: Option<String>,
    url: Option<String>,
    captured_at: Option<String>,
}

async fn status(config: &Config, state_dir: &Path, json: bool) -> Result<()> {
    let queue = open_queue(config, state_dir).await?;
    let entries = queue.entries().await;
    queue.close().await?;

    let entries: Vec<StatusEntry> = entries?
        .into_iter()
        .map(|entry| StatusEntry {
            key: entry.key.to_string(),
            method: entry.request.as_ref().map(|r| r.method.to_string()),
            url: entry.request.as_ref().map(|r| r.url.clone()),
            captured_at: entry.request.as_ref().map(|r| r.captured_at.to_rfc3339()),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("queue is empty");
        return Ok(());
    }
    for entry in &entries {
        match (&entry.method, &entry.url) {
            (Some(method), Some(url)) => println!("{:>6}  {} {}", entry.key, method, url),
            _ => println!("{:>6}  <unreadable record>", entry.key),
        }
    }
    println!("{} pending", entries.len());
    Ok(())
}

async fn drain(config: &Config, state_dir: &Path) -> Result<()> {
    let _lock = acquire_lock(state_dir)?;
    let queue = open_queue(config, state_dir).await?;
    let outcome = queue.handle_synchronization().await;
    queue.close().await?;

    match outcome? {
        DrainOutcome::Completed(report) => println!(
            "replayed {} of {}, {} kept ({} unreachable)",
            report.replayed, report.attempted, report.retained, report.network_failures
        ),
        DrainOutcome::Coalesced => println!("a drain is already running"),
    }
    Ok(())
}

async fn enqueue(
    config: &Config,
    state_dir: &Path,
    method: HttpMethod,
    url: String,
    headers: &[String],
    body: Option<String>,
) -> Result<()> {
    let request = build_request(method, url, headers, body)?;

    let _lock = acquire_lock(state_dir)?;
    let queue = open_queue(config, state_dir).await?;
    let key = queue.push_request(&request).await;
    queue.close().await?;
    println!("queued as {}", key?);
    Ok(())
}

async fn probe(config: &Config) -> Result<()> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
        config.probe.timeout(),
        &config.github.user_agent,
    )?);
    let prober = HttpProber::new(transport, config.probe.url.as_str());
    let result = prober.probe().await;
    println!(
        "{}",
        serde_json::json!({ "status": result.status, "message": result.message })
    );
    Ok(())
}

/// Describes a manually queued call. Reads are refused.
fn build_request(
    method: HttpMethod,
    url: String,
    headers: &[String],
    body: Option<String>,
) -> Result<QueuedRequest> {
    if !method.is_mutating() {
        return Err(Error::NotMutating(method));
    }
    let mut request = QueuedRequest::new(method, url);
    for header in headers {
        let (name, value) = parse_header(header)?;
        request = request.with_header(name, value);
    }
    if let Some(body) = body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Splits `Name: value`.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(Error::InvalidHeader(raw.to_string())),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
