//! End-to-end pipeline invariants: fingerprint stability, idempotent
//! materialization, degraded enrichment, and the user-ownership rule.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use shelfmark_api::enrichment::{Classifier, ClassifyError, EnrichmentGateway};
use shelfmark_api::fingerprint::{self, SourceKind};
use shelfmark_api::materialize::{MaterializeOutcome, NoteMaterializer};
use shelfmark_api::models::capture::{CapturePayload, TweetAuthor, TweetFields};
use shelfmark_api::models::metadata::{ClassifyResponse, DocInfo, FolderChoice};
use shelfmark_api::template::TemplateCatalog;

/// Stub collaborator returning a canned classification.
struct StubClassifier(ClassifyResponse);

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(
        &self,
        _content: &str,
        _folders: &[String],
    ) -> Result<ClassifyResponse, ClassifyError> {
        Ok(self.0.clone())
    }
}

/// Stub collaborator that always fails, standing in for an unreachable
/// classify() endpoint.
struct FailingClassifier;

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(
        &self,
        _content: &str,
        _folders: &[String],
    ) -> Result<ClassifyResponse, ClassifyError> {
        Err(ClassifyError::EmptyContent)
    }
}

fn full_response() -> ClassifyResponse {
    ClassifyResponse {
        folder: None,
        metadata: Some(DocInfo {
            title: Some("An Article".to_string()),
            document_type: Some("article".to_string()),
            publication_info: None,
        }),
        summary: Some("A thorough summary.".to_string()),
        key_points: Some(vec!["first point".to_string(), "second point".to_string()]),
        tags: Some(vec!["rust".to_string(), "testing".to_string()]),
    }
}

fn materializer(vault: &TempDir, classifier: Arc<dyn Classifier>, folders: &[&str]) -> NoteMaterializer {
    let gateway = EnrichmentGateway::new(
        classifier,
        folders.iter().map(|s| s.to_string()).collect(),
    );
    NoteMaterializer::new(
        vault.path().to_path_buf(),
        gateway,
        TemplateCatalog::builtin().unwrap(),
    )
}

fn page_payload(url: &str) -> CapturePayload {
    CapturePayload {
        url: url.to_string(),
        title: "An Article".to_string(),
        html: Some("<p>article body</p>".to_string()),
        screenshot: Some(vec![0x89, 0x50, 0x4e, 0x47]),
        kind: SourceKind::Page,
        tweet: None,
    }
}

#[tokio::test]
async fn materializing_twice_writes_once() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);
    let payload = page_payload("https://example.com/post");

    let first = m.materialize(&payload).await.unwrap();
    assert_eq!(first.status(), "created");
    let note_path = first.entry().note_path.clone();
    let bytes = fs::read(&note_path).unwrap();

    let second = m.materialize(&payload).await.unwrap();
    assert_eq!(second.status(), "already_exists");
    assert_eq!(second.entry().note_path, note_path);
    assert_eq!(fs::read(&note_path).unwrap(), bytes, "no rewrite on repeat");

    // Exactly one entry directory, no staging leftovers.
    let dirs: Vec<_> = fs::read_dir(vault.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(dirs.len(), 1, "one directory per identity: {dirs:?}");
}

#[tokio::test]
async fn url_variants_collapse_to_one_entry() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);

    let first = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    assert_eq!(first.status(), "created");

    let variant = m
        .materialize(&page_payload(
            "https://example.com/post/?utm_source=newsletter&utm_medium=email",
        ))
        .await
        .unwrap();
    assert_eq!(variant.status(), "already_exists");
}

#[tokio::test]
async fn page_entry_is_written_as_a_unit() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);

    let outcome = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    let entry = outcome.entry();

    assert!(entry.note_path.ends_with("article.md"));
    assert!(entry.dir.join("raw.html").exists());
    assert!(entry.dir.join("screenshot.png").exists());

    let identity = fingerprint::fingerprint("https://example.com/post").unwrap();
    assert_eq!(entry.dir.file_name().unwrap().to_str().unwrap(), identity.hash);

    let note = fs::read_to_string(&entry.note_path).unwrap();
    assert!(note.contains("# An Article"));
    assert!(note.contains("## Summary"));
    assert!(note.contains("A thorough summary."));
    assert!(note.contains("* first point"));
    assert!(note.contains("* second point"));
    assert!(note.contains("  - rust"));
    assert!(note.contains(&format!("url_hash: {}", identity.hash)));
}

#[tokio::test]
async fn tweet_capture_renders_tweet_note() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);

    let payload = CapturePayload {
        url: "https://x.com/a/status/123".to_string(),
        title: String::new(),
        html: Some("<blockquote>hello</blockquote>".to_string()),
        screenshot: None,
        kind: SourceKind::Tweet,
        tweet: Some(TweetFields {
            id: "123".to_string(),
            author: TweetAuthor {
                name: "A".to_string(),
                username: "a".to_string(),
            },
            text: "hello".to_string(),
            date: Some("2026-08-29".to_string()),
            media: vec![],
            video_url: None,
        }),
    };

    let outcome = m.materialize(&payload).await.unwrap();
    assert!(outcome.entry().note_path.ends_with("123/123.md"));

    let note = fs::read_to_string(&outcome.entry().note_path).unwrap();
    assert!(note.contains("# Tweet by @a"));
    assert!(note.contains("\nhello\n"));
    // No media, no video: those blocks are omitted entirely.
    assert!(!note.contains("## Media"));
    assert!(!note.contains("## Video"));

    // The embed HTML feeds enrichment only; tweets get no raw.html.
    assert!(!outcome.entry().dir.join("raw.html").exists());
}

#[tokio::test]
async fn failed_enrichment_still_materializes_minimal_note() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(FailingClassifier), &[]);

    let outcome = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    assert_eq!(outcome.status(), "created_degraded");

    let note = fs::read_to_string(&outcome.entry().note_path).unwrap();
    assert!(note.contains("# An Article"), "title survives");
    assert!(note.contains("https://example.com/post"), "url survives");
    assert!(note.contains("## Summary"), "summary section present, empty");
}

#[tokio::test]
async fn incomplete_classification_degrades_instead_of_failing() {
    let vault = TempDir::new().unwrap();
    let mut response = full_response();
    response.tags = None; // validation rejects this as incomplete
    let m = materializer(&vault, Arc::new(StubClassifier(response)), &[]);

    let outcome = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    assert_eq!(outcome.status(), "created_degraded");
    assert!(outcome.entry().note_path.exists());
}

#[tokio::test]
async fn user_owned_note_is_never_overwritten() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);
    let payload = page_payload("https://example.com/post");

    let first = m.materialize(&payload).await.unwrap();
    let note_path = first.entry().note_path.clone();

    // The user fills in the notes field; the entry is now theirs.
    let edited = fs::read_to_string(&note_path)
        .unwrap()
        .replace("notes:", "notes: revisit the benchmarks section");
    fs::write(&note_path, &edited).unwrap();
    let bytes = fs::read(&note_path).unwrap();

    let second = m.materialize(&payload).await.unwrap();
    assert_eq!(second.status(), "already_exists");
    assert_eq!(fs::read(&note_path).unwrap(), bytes, "file byte-unchanged");
}

#[tokio::test]
async fn known_folder_places_entry_under_folder() {
    let vault = TempDir::new().unwrap();
    let mut response = full_response();
    response.folder = Some(FolderChoice {
        path: Some("clippings".to_string()),
        reasoning: None,
    });
    let m = materializer(&vault, Arc::new(StubClassifier(response)), &["clippings"]);

    let outcome = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    assert!(outcome.entry().dir.starts_with(vault.path().join("clippings")));

    // The folder-aware existence check still dedups.
    let again = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    assert_eq!(again.status(), "already_exists");
}

#[tokio::test]
async fn dedup_survives_folder_catalog_changes() {
    let vault = TempDir::new().unwrap();
    let mut response = full_response();
    response.folder = Some(FolderChoice {
        path: Some("clippings".to_string()),
        reasoning: None,
    });
    let m = materializer(&vault, Arc::new(StubClassifier(response)), &["clippings"]);

    let first = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    assert_eq!(first.status(), "created");
    assert!(first.entry().dir.starts_with(vault.path().join("clippings")));

    // Same identity, but the folder is no longer in the catalog.
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);
    let again = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    assert_eq!(again.status(), "already_exists");
    assert_eq!(again.entry().note_path, first.entry().note_path);

    // No second entry directory appeared at the root.
    let identity = fingerprint::fingerprint("https://example.com/post").unwrap();
    assert!(!vault.path().join(&identity.hash).exists());
}

#[tokio::test]
async fn front_matter_round_trips_from_disk() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);

    let outcome = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    let fm = outcome.entry().load_front_matter().unwrap();

    let identity = fingerprint::fingerprint("https://example.com/post").unwrap();
    assert_eq!(fm.url_hash.as_deref(), Some(identity.hash.as_str()));
    assert_eq!(fm.url.as_deref(), Some("https://example.com/post"));
    assert_eq!(
        fm.tags,
        Some(vec!["rust".to_string(), "testing".to_string()])
    );
    assert!(fm.added_date.is_some());
    assert!(!fm.is_user_owned());
}

#[tokio::test]
async fn invalid_url_fails_fast_without_touching_vault() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);

    let result = m.materialize(&page_payload("not a url")).await;
    assert!(result.is_err());
    assert_eq!(fs::read_dir(vault.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn arxiv_capture_uses_paper_layout() {
    let vault = TempDir::new().unwrap();
    let mut response = full_response();
    response.metadata = Some(DocInfo {
        title: Some("A Paper".to_string()),
        document_type: Some("paper".to_string()),
        publication_info: None,
    });
    let m = materializer(&vault, Arc::new(StubClassifier(response)), &[]);

    let mut payload = page_payload("https://arxiv.org/abs/2410.18975");
    payload.kind = SourceKind::Paper;

    let outcome = m.materialize(&payload).await.unwrap();
    assert!(outcome
        .entry()
        .note_path
        .ends_with("2410.18975/2410.18975.md"));

    let note = fs::read_to_string(&outcome.entry().note_path).unwrap();
    assert!(note.contains("arxiv-id: 2410.18975"));
    assert!(note.contains("[arXiv:2410.18975](https://arxiv.org/abs/2410.18975)"));
}

#[tokio::test]
async fn outcome_is_matchable() {
    let vault = TempDir::new().unwrap();
    let m = materializer(&vault, Arc::new(StubClassifier(full_response())), &[]);
    let outcome = m
        .materialize(&page_payload("https://example.com/post"))
        .await
        .unwrap();
    match outcome {
        MaterializeOutcome::Created { degraded, .. } => assert!(!degraded),
        MaterializeOutcome::AlreadyExists { .. } => panic!("fresh vault"),
    }
}
