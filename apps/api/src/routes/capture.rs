//! The submission boundary: POST /api/capture.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::capture::decode_screenshot;
use crate::errors::CaptureError;
use crate::fingerprint::{self, SourceKind};
use crate::models::capture::{CapturePayload, CaptureRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub id: Uuid,
    pub status: String,
    pub note_path: String,
    pub markdown: String,
}

/// POST /api/capture
///
/// Authenticated with the configured bearer token. Returns the rendered
/// markdown plus where it landed; a repeat submission of a known identity
/// answers `already_exists` without touching the vault.
pub async fn handle_capture(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, CaptureError> {
    check_bearer(&headers, &state.config.api_token)?;

    info!(
        "capture request: url={} html_len={} screenshot_len={}",
        request.url,
        request.html_content.as_deref().map_or(0, str::len),
        request.screenshot.as_deref().map_or(0, str::len),
    );

    let payload = into_payload(request)?;
    let outcome = state.materializer.materialize(&payload).await?;

    Ok(Json(CaptureResponse {
        id: Uuid::new_v4(),
        status: outcome.status().to_string(),
        note_path: outcome.entry().note_path.display().to_string(),
        markdown: outcome.markdown().to_string(),
    }))
}

fn into_payload(request: CaptureRequest) -> Result<CapturePayload, CaptureError> {
    let identity = fingerprint::fingerprint(&request.url)?;
    // Tweet submissions can arrive under share URLs that hide the status
    // id; the structured fields decide the kind.
    let kind = if request.tweet.is_some() {
        SourceKind::Tweet
    } else {
        identity.kind
    };
    let screenshot = match request.screenshot.as_deref() {
        Some(encoded) => Some(decode_screenshot(encoded)?),
        None => None,
    };
    Ok(CapturePayload {
        url: request.url,
        title: request.title,
        html: request.html_content,
        screenshot,
        kind,
        tweet: request.tweet,
    })
}

fn check_bearer(headers: &HeaderMap, expected: &str) -> Result<(), CaptureError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CaptureError::AuthFailure("No API token provided".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| CaptureError::AuthFailure("Invalid authentication scheme".to_string()))?;

    if token != expected {
        return Err(CaptureError::AuthFailure("Invalid API token".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::capture::{TweetAuthor, TweetFields};
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_header_rejected() {
        let result = check_bearer(&HeaderMap::new(), "secret");
        assert!(matches!(result, Err(CaptureError::AuthFailure(_))));
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let result = check_bearer(&headers_with("Basic secret"), "secret");
        assert!(matches!(result, Err(CaptureError::AuthFailure(_))));
    }

    #[test]
    fn test_wrong_token_rejected() {
        let result = check_bearer(&headers_with("Bearer nope"), "secret");
        assert!(matches!(result, Err(CaptureError::AuthFailure(_))));
    }

    #[test]
    fn test_valid_token_accepted() {
        assert!(check_bearer(&headers_with("Bearer secret"), "secret").is_ok());
    }

    #[test]
    fn test_tweet_fields_decide_kind_for_share_urls() {
        let request = CaptureRequest {
            url: "https://t.co/AbC123".to_string(),
            title: String::new(),
            html_content: Some("<blockquote>hello</blockquote>".to_string()),
            screenshot: None,
            tweet: Some(TweetFields {
                id: "123".to_string(),
                author: TweetAuthor {
                    name: "A".to_string(),
                    username: "a".to_string(),
                },
                text: "hello".to_string(),
                date: None,
                media: vec![],
                video_url: None,
            }),
        };
        let payload = into_payload(request).unwrap();
        assert_eq!(payload.kind, SourceKind::Tweet);
    }
}
