use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::SourceKind;

/// Everything gathered from the user's active context for one capture.
/// Immutable once submitted; discarded after materialization completes
/// or fails terminally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturePayload {
    pub url: String,
    pub title: String,
    pub html: Option<String>,
    /// Decoded PNG bytes. Arrives base64-encoded on the wire.
    pub screenshot: Option<Vec<u8>>,
    pub kind: SourceKind,
    pub tweet: Option<TweetFields>,
}

/// Structured fields extracted from a tweet by the capturing surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetFields {
    pub id: String,
    pub author: TweetAuthor,
    pub text: String,
    /// ISO date of the tweet, when the capturing surface could read it.
    pub date: Option<String>,
    /// Filenames of downloaded media, relative to the entry directory.
    #[serde(default)]
    pub media: Vec<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetAuthor {
    pub name: String,
    pub username: String,
}

/// Wire format of a submission: what the capture surface POSTs to
/// `/api/capture`. The screenshot crosses the boundary base64-encoded,
/// optionally with a `data:image/png;base64,` prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub html_content: Option<String>,
    pub screenshot: Option<String>,
    pub tweet: Option<TweetFields>,
}

/// Acknowledgement returned to the capturing surface after a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    /// `created`, `created_degraded`, or `already_exists`.
    pub status: String,
    pub note_path: String,
}
