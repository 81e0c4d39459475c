//! EnrichmentGateway — validates the classify() collaborator's loose
//! response into a canonical [`Metadata`] record.
//!
//! A missing summary or missing tags is `EnrichmentIncomplete`, never
//! silently defaulted: an incomplete note is worse than a visibly failed
//! one, and the materializer handles the failure by writing a degraded
//! note instead. No partial Metadata is ever produced.

pub mod classifier;
pub mod prompts;

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::capture::CapturePayload;
use crate::models::metadata::{ClassifyResponse, DocumentType, Metadata};

pub use classifier::{Classifier, ClassifyError, LlmClassifier};

/// Upper bound on content handed to the classifier. The original pipeline
/// truncated to a 10k-token budget; four bytes per token is close enough
/// for a boundary that exists only to keep requests bounded.
const MAX_CONTENT_BYTES: usize = 40_000;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Enrichment incomplete: missing {0}")]
    Incomplete(&'static str),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

pub struct EnrichmentGateway {
    classifier: Arc<dyn Classifier>,
    folders: Vec<String>,
}

impl EnrichmentGateway {
    pub fn new(classifier: Arc<dyn Classifier>, folders: Vec<String>) -> Self {
        Self {
            classifier,
            folders,
        }
    }

    /// Classifies a capture's content and validates the result.
    ///
    /// The folder choice is advisory: a `folder.path` outside the known
    /// catalog is dropped here so the materializer only ever sees valid
    /// placements or `None`.
    pub async fn enrich(&self, payload: &CapturePayload) -> Result<Metadata, EnrichError> {
        let content = payload
            .html
            .as_deref()
            .filter(|html| !html.is_empty())
            .or(payload.tweet.as_ref().map(|t| t.text.as_str()))
            .ok_or(EnrichError::Incomplete("content"))?;
        let content = truncate_content(content, MAX_CONTENT_BYTES);

        let response = self.classifier.classify(content, &self.folders).await?;
        self.validate(payload, response)
    }

    fn validate(
        &self,
        payload: &CapturePayload,
        response: ClassifyResponse,
    ) -> Result<Metadata, EnrichError> {
        let summary = response
            .summary
            .filter(|s| !s.trim().is_empty())
            .ok_or(EnrichError::Incomplete("summary"))?;

        let tags: Vec<String> = response
            .tags
            .unwrap_or_default()
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            return Err(EnrichError::Incomplete("tags"));
        }

        let info = response.metadata.unwrap_or_default();

        let folder_path = response
            .folder
            .and_then(|f| f.path)
            .filter(|path| {
                let known = self.folders.iter().any(|f| f == path);
                if !known {
                    debug!("classifier proposed unknown folder '{path}', ignoring");
                }
                known
            });

        let published_date = info
            .publication_info
            .as_ref()
            .and_then(|p| p.published_date.as_deref())
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        let metadata = Metadata {
            title: info
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| payload.title.clone()),
            summary,
            key_points: response.key_points.unwrap_or_default(),
            tags,
            folder_path,
            published_date,
            document_type: parse_document_type(info.document_type.as_deref()),
        };

        info!(
            "enriched '{}': {} tags, {} key points, folder={:?}",
            metadata.title,
            metadata.tags.len(),
            metadata.key_points.len(),
            metadata.folder_path
        );
        Ok(metadata)
    }
}

fn parse_document_type(raw: Option<&str>) -> DocumentType {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("paper") => DocumentType::Paper,
        Some("tweet") => DocumentType::Tweet,
        _ => DocumentType::Article,
    }
}

/// Normalizes a tag: lowercase, trimmed, spaces replaced with hyphens.
pub fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase().trim().replace(' ', "-")
}

/// Truncates content to a byte budget on a char boundary.
fn truncate_content(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::SourceKind;
    use crate::models::metadata::{DocInfo, FolderChoice};
    use async_trait::async_trait;

    struct FixedClassifier(ClassifyResponse);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(
            &self,
            _content: &str,
            _folders: &[String],
        ) -> Result<ClassifyResponse, ClassifyError> {
            Ok(self.0.clone())
        }
    }

    fn payload() -> CapturePayload {
        CapturePayload {
            url: "https://example.com/post".to_string(),
            title: "Fallback Title".to_string(),
            html: Some("<p>content</p>".to_string()),
            screenshot: None,
            kind: SourceKind::Page,
            tweet: None,
        }
    }

    fn full_response() -> ClassifyResponse {
        ClassifyResponse {
            folder: Some(FolderChoice {
                path: Some("research-notes".to_string()),
                reasoning: Some("it is research".to_string()),
            }),
            metadata: Some(DocInfo {
                title: Some("A Title".to_string()),
                document_type: Some("article".to_string()),
                publication_info: None,
            }),
            summary: Some("A summary.".to_string()),
            key_points: Some(vec!["point".to_string()]),
            tags: Some(vec!["Rust Lang".to_string(), "LLM".to_string()]),
        }
    }

    fn gateway(response: ClassifyResponse, folders: &[&str]) -> EnrichmentGateway {
        EnrichmentGateway::new(
            Arc::new(FixedClassifier(response)),
            folders.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_valid_response_becomes_metadata() {
        let g = gateway(full_response(), &["research-notes"]);
        let metadata = g.enrich(&payload()).await.unwrap();
        assert_eq!(metadata.title, "A Title");
        assert_eq!(metadata.tags, vec!["rust-lang", "llm"]);
        assert_eq!(metadata.folder_path.as_deref(), Some("research-notes"));
        assert_eq!(metadata.document_type, DocumentType::Article);
    }

    #[tokio::test]
    async fn test_missing_summary_is_incomplete() {
        let mut response = full_response();
        response.summary = None;
        let g = gateway(response, &[]);
        assert!(matches!(
            g.enrich(&payload()).await,
            Err(EnrichError::Incomplete("summary"))
        ));
    }

    #[tokio::test]
    async fn test_missing_tags_is_incomplete_not_defaulted() {
        let mut response = full_response();
        response.tags = None;
        let g = gateway(response, &[]);
        assert!(matches!(
            g.enrich(&payload()).await,
            Err(EnrichError::Incomplete("tags"))
        ));
    }

    #[tokio::test]
    async fn test_unknown_folder_dropped() {
        let g = gateway(full_response(), &["clippings"]);
        let metadata = g.enrich(&payload()).await.unwrap();
        assert_eq!(metadata.folder_path, None);
    }

    #[tokio::test]
    async fn test_missing_title_falls_back_to_payload() {
        let mut response = full_response();
        response.metadata = None;
        let g = gateway(response, &[]);
        let metadata = g.enrich(&payload()).await.unwrap();
        assert_eq!(metadata.title, "Fallback Title");
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("Machine Learning"), "machine-learning");
        assert_eq!(normalize_tag("  Rust  "), "rust");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        let s = "aé".repeat(10);
        let truncated = truncate_content(&s, 5);
        assert!(truncated.len() <= 5);
        assert!(s.starts_with(truncated));
    }
}
