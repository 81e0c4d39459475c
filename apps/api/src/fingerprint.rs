//! ContentFingerprinter — stable identity for captured items.
//!
//! The identity is the storage key for the content-addressed vault layout,
//! so it must be a pure function of the canonical URL: no randomness, no
//! time dependency, identical across runs and processes. Cosmetically
//! different URLs for the same resource (tracking parameters, trailing
//! slash) collapse to the same identity on purpose — that is the duplicate
//! prevention mechanism.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::errors::CaptureError;

/// Query parameters that never change what resource a URL points at.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "msclkid", "igshid", "mc_cid", "mc_eid", "ref", "ref_src", "s", "t",
];

/// What kind of source a capture came from. Drives template selection and
/// the on-disk layout of the materialized entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Page,
    Tweet,
    Paper,
}

/// Deterministic identity of a captured item.
///
/// Pages hash their canonical URL; tweets and arXiv papers use their
/// natural ids so repeat captures land on the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIdentity {
    pub hash: String,
    pub kind: SourceKind,
}

/// Canonicalizes a URL: drops the fragment, strips tracking query
/// parameters, and removes a trailing slash from the path.
pub fn canonicalize(raw: &str) -> Result<Url, CaptureError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CaptureError::InvalidIdentity("empty URL".to_string()));
    }

    let mut url = Url::parse(raw)
        .map_err(|e| CaptureError::InvalidIdentity(format!("malformed URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CaptureError::InvalidIdentity(format!(
                "unsupported scheme '{other}'"
            )))
        }
    }

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept).finish();
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

/// Derives the stable identity for a captured URL.
pub fn fingerprint(raw: &str) -> Result<ContentIdentity, CaptureError> {
    let url = canonicalize(raw)?;

    if let Some(id) = extract_tweet_id(&url) {
        return Ok(ContentIdentity {
            hash: id,
            kind: SourceKind::Tweet,
        });
    }
    if let Some(id) = extract_arxiv_id(&url) {
        return Ok(ContentIdentity {
            hash: id,
            kind: SourceKind::Paper,
        });
    }

    Ok(ContentIdentity {
        hash: url_hash(url.as_str()),
        kind: SourceKind::Page,
    })
}

/// SHA-256 hex digest of the canonical URL string.
pub fn url_hash(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extracts the numeric tweet id from twitter.com / x.com status URLs.
pub fn extract_tweet_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches("www.");
    if host != "twitter.com" && host != "x.com" {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    match segments.as_slice() {
        [_user, kind, id, ..] if *kind == "status" || *kind == "statuses" => {
            if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
                Some((*id).to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Extracts the arXiv id from arxiv.org abs/pdf URLs (e.g. `2410.18975`).
pub fn extract_arxiv_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches("www.");
    if host != "arxiv.org" {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    let (section, id) = match segments.as_slice() {
        [section, id, ..] => (*section, *id),
        _ => return None,
    };
    if section != "abs" && section != "pdf" {
        return None;
    }

    let id = id.strip_suffix(".pdf").unwrap_or(id);
    let valid = id.contains('.')
        && id
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == 'v');
    if valid {
        Some(id.to_string())
    } else {
        None
    }
}
