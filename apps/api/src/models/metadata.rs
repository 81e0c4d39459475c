use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Document type reported by the classifier; drives template selection
/// together with the source kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Article,
    Paper,
    Tweet,
}

/// Canonical, validated metadata for one pipeline run.
///
/// Never constructed partially: a failed enrichment yields no Metadata at
/// all, and the materializer falls back to a degraded note instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub tags: Vec<String>,
    /// Advisory folder placement. `None`, or a path outside the known
    /// catalog, falls back to the vault root downstream.
    pub folder_path: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub document_type: DocumentType,
}

/// Loose wire shape of the classify() collaborator's response. Validated
/// into [`Metadata`] by the enrichment gateway; no field is trusted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassifyResponse {
    pub folder: Option<FolderChoice>,
    pub metadata: Option<DocInfo>,
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FolderChoice {
    pub path: Option<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DocInfo {
    pub title: Option<String>,
    pub document_type: Option<String>,
    pub publication_info: Option<PublicationInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PublicationInfo {
    /// `YYYY-MM-DD` when the classifier could determine it.
    pub published_date: Option<String>,
    pub publisher: Option<String>,
}
