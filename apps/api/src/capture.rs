//! CaptureClient — gathers a capture payload and submits it to the
//! gateway.
//!
//! One outbound call per submission. The busy guard makes a second
//! submit while one is in flight a no-op instead of a second insertion;
//! the whole submission is bounded by a timeout window so a capture that
//! cannot complete fails with `CaptureTimeout` instead of hanging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::Engine as _;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::errors::CaptureError;
use crate::fingerprint::{self, SourceKind};
use crate::models::capture::{CapturePayload, CaptureRequest, Receipt, TweetFields};

/// Bound on one submission attempt, screenshot upload included.
const SUBMIT_WINDOW: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 3;

/// Raw material gathered from the user's active context before submission.
#[derive(Debug, Clone, Default)]
pub struct CaptureContext {
    pub url: String,
    pub title: String,
    pub html: Option<String>,
    /// Base64-encoded PNG, with or without a `data:image/png;base64,`
    /// prefix.
    pub screenshot: Option<String>,
    pub tweet: Option<TweetFields>,
}

/// Builds an immutable payload from the capture context. Fails fast on a
/// malformed URL so nothing is submitted for an identity that can never
/// materialize.
pub fn capture(context: CaptureContext) -> Result<CapturePayload, CaptureError> {
    let identity = fingerprint::fingerprint(&context.url)?;

    // Structured tweet fields win over URL shape; share links often hide
    // the status id.
    let kind = if context.tweet.is_some() {
        SourceKind::Tweet
    } else {
        identity.kind
    };

    let screenshot = match context.screenshot.as_deref() {
        Some(encoded) => Some(decode_screenshot(encoded)?),
        None => None,
    };

    Ok(CapturePayload {
        url: context.url,
        title: context.title,
        html: context.html,
        screenshot,
        kind,
        tweet: context.tweet,
    })
}

/// Decodes a base64 screenshot, tolerating a data-URL prefix.
pub fn decode_screenshot(encoded: &str) -> Result<Vec<u8>, CaptureError> {
    let encoded = encoded
        .strip_prefix("data:image/png;base64,")
        .unwrap_or(encoded);
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| CaptureError::InvalidIdentity(format!("bad screenshot encoding: {e}")))
}

/// What became of a submit call.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(Receipt),
    /// A submission was already in flight; nothing was sent.
    Busy,
}

pub struct CaptureClient {
    http: reqwest::Client,
    in_flight: AtomicBool,
}

impl Default for CaptureClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Submits a payload to the gateway.
    ///
    /// Gateway address and bearer token are re-read from the environment
    /// on every call so configuration changes apply to the next capture.
    /// Network failures and 5xx responses retry with bounded exponential
    /// backoff; a timeout retries once; auth failures never retry.
    /// Flipping `cancel` to true aborts at the next suspension point.
    pub async fn submit(
        &self,
        payload: &CapturePayload,
        cancel: &watch::Receiver<bool>,
    ) -> Result<SubmitOutcome, CaptureError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            info!("submission already in flight, ignoring");
            return Ok(SubmitOutcome::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let config = ClientConfig::from_env()
            .map_err(|e| CaptureError::AuthFailure(format!("missing credentials: {e}")))?;

        let request = wire_request(payload);
        let endpoint = format!(
            "{}/api/capture",
            config.gateway_url.trim_end_matches('/')
        );

        let mut last_error: Option<CaptureError> = None;
        let mut timeout_retried = false;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "submit attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            if *cancel.borrow() {
                return Err(CaptureError::Cancelled);
            }

            let send = self
                .http
                .post(&endpoint)
                .bearer_auth(&config.token)
                .json(&request)
                .send();

            let mut cancelled = cancel.clone();
            let mut cancel_open = true;
            let send = tokio::time::timeout(SUBMIT_WINDOW, send);
            tokio::pin!(send);
            let sent = loop {
                tokio::select! {
                    biased;
                    changed = cancelled.wait_for(|&c| c), if cancel_open => {
                        if changed.is_ok() {
                            return Err(CaptureError::Cancelled);
                        }
                        // Sender gone: cancellation can no longer arrive,
                        // so only the request matters from here.
                        cancel_open = false;
                    }
                    sent = &mut send => break sent,
                }
            };

            let response = match sent {
                Ok(Ok(r)) => r,
                Ok(Err(e)) => {
                    last_error = Some(CaptureError::Network(e.to_string()));
                    continue;
                }
                Err(_elapsed) => {
                    // A bounded wait exceeded is retried once, then surfaced.
                    if timeout_retried {
                        return Err(CaptureError::CaptureTimeout(SUBMIT_WINDOW.as_secs()));
                    }
                    timeout_retried = true;
                    last_error = Some(CaptureError::CaptureTimeout(SUBMIT_WINDOW.as_secs()));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                let body = response.text().await.unwrap_or_default();
                return Err(CaptureError::AuthFailure(auth_message(&body)));
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("gateway returned {}: {}", status, body);
                last_error = Some(CaptureError::Network(format!("gateway error {status}")));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CaptureError::Network(format!(
                    "gateway rejected submission ({status}): {body}"
                )));
            }

            let receipt: Receipt = response
                .json()
                .await
                .map_err(|e| CaptureError::Network(format!("bad receipt: {e}")))?;
            info!("capture accepted: {} ({})", receipt.note_path, receipt.status);
            return Ok(SubmitOutcome::Accepted(receipt));
        }

        Err(last_error
            .unwrap_or_else(|| CaptureError::Network("submission retries exhausted".to_string())))
    }
}

/// Resets the busy flag when a submission resolves by any path, so the
/// capturing surface is re-enabled for retry.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn wire_request(payload: &CapturePayload) -> CaptureRequest {
    CaptureRequest {
        url: payload.url.clone(),
        title: payload.title.clone(),
        html_content: payload.html.clone(),
        screenshot: payload
            .screenshot
            .as_ref()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
        tweet: payload.tweet.clone(),
    }
}

fn auth_message(body: &str) -> String {
    // Surface the gateway's message when it sent one; otherwise tell the
    // user what to actually do.
    if body.trim().is_empty() {
        "Invalid or missing API token. Set SHELFMARK_API_TOKEN and retry.".to_string()
    } else {
        body.trim().to_string()
    }
}
