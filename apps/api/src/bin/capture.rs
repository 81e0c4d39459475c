//! Command-line capture surface: submits URLs to the shelfmark gateway.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shelfmark_api::capture::{capture, CaptureClient, CaptureContext, SubmitOutcome};
use shelfmark_api::fingerprint;
use shelfmark_api::models::capture::CaptureRequest;

#[derive(Parser)]
#[command(name = "shelfmark", about = "Submit captures to the shelfmark gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture a URL and submit it for materialization
    Capture {
        url: String,
        /// Page title; the gateway falls back to the URL when omitted
        #[arg(long, default_value = "")]
        title: String,
        /// Read page HTML from a file instead of leaving it to the server
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Submit a capture saved as JSON (the extension's wire format)
    SubmitFile { path: PathBuf },
    /// Print the stable fingerprint for a URL
    Hash { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Capture {
            url,
            title,
            html_file,
        } => {
            let html = match html_file {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?,
                ),
                None => None,
            };
            let payload = capture(CaptureContext {
                url,
                title,
                html,
                ..Default::default()
            })?;
            submit(payload).await
        }
        Command::SubmitFile { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let request: CaptureRequest =
                serde_json::from_str(&raw).context("parsing capture JSON")?;
            let payload = capture(CaptureContext {
                url: request.url,
                title: request.title,
                html: request.html_content,
                screenshot: request.screenshot,
                tweet: request.tweet,
            })?;
            submit(payload).await
        }
        Command::Hash { url } => {
            let identity = fingerprint::fingerprint(&url)?;
            println!("{}", identity.hash);
            Ok(())
        }
    }
}

async fn submit(payload: shelfmark_api::models::capture::CapturePayload) -> Result<()> {
    let client = CaptureClient::new();
    let (cancel_tx, cancel_rx) = watch::channel(false);

    // Ctrl-C aborts the submission cleanly; the gateway's write step only
    // runs after everything else resolved, so nothing half-written is left.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    match client.submit(&payload, &cancel_rx).await? {
        SubmitOutcome::Accepted(receipt) => {
            println!("{}: {}", receipt.status, receipt.note_path);
            Ok(())
        }
        SubmitOutcome::Busy => {
            println!("a submission is already in flight");
            Ok(())
        }
    }
}
