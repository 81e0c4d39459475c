//! NoteMaterializer — turns a capture payload into a vault entry.
//!
//! Flow: fingerprint → existing-entry check → enrich (best-effort) →
//! template select/render → staged single-unit write.
//!
//! The write is the sole mutation point and the last action: enrichment
//! and rendering complete in memory first, every file for the entry is
//! staged into a scratch directory inside the vault, and one rename
//! publishes them all. A concurrent reader never sees a half-written
//! entry, and a failure before the rename leaves the vault untouched.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::enrichment::EnrichmentGateway;
use crate::errors::CaptureError;
use crate::fingerprint::{self, ContentIdentity, SourceKind};
use crate::models::capture::CapturePayload;
use crate::models::metadata::{DocumentType, Metadata};
use crate::template::TemplateCatalog;
use crate::vault::VaultEntry;

/// Result of a materialization. `AlreadyExists` is informational, not an
/// error: the pipeline is idempotent and a repeat capture is a no-op.
#[derive(Debug)]
pub enum MaterializeOutcome {
    Created {
        entry: VaultEntry,
        markdown: String,
        /// True when enrichment failed and a minimal note was written
        /// instead — the capture is kept either way.
        degraded: bool,
    },
    AlreadyExists {
        entry: VaultEntry,
        markdown: String,
    },
}

impl MaterializeOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            MaterializeOutcome::Created { degraded: false, .. } => "created",
            MaterializeOutcome::Created { degraded: true, .. } => "created_degraded",
            MaterializeOutcome::AlreadyExists { .. } => "already_exists",
        }
    }

    pub fn entry(&self) -> &VaultEntry {
        match self {
            MaterializeOutcome::Created { entry, .. }
            | MaterializeOutcome::AlreadyExists { entry, .. } => entry,
        }
    }

    pub fn markdown(&self) -> &str {
        match self {
            MaterializeOutcome::Created { markdown, .. }
            | MaterializeOutcome::AlreadyExists { markdown, .. } => markdown,
        }
    }
}

pub struct NoteMaterializer {
    vault_root: PathBuf,
    gateway: EnrichmentGateway,
    catalog: TemplateCatalog,
}

impl NoteMaterializer {
    pub fn new(
        vault_root: PathBuf,
        gateway: EnrichmentGateway,
        catalog: TemplateCatalog,
    ) -> Self {
        Self {
            vault_root,
            gateway,
            catalog,
        }
    }

    /// Runs the full pipeline for one payload.
    pub async fn materialize(
        &self,
        payload: &CapturePayload,
    ) -> Result<MaterializeOutcome, CaptureError> {
        // Step 1: identity. Fails fast on a malformed URL.
        let identity = self.identity(payload)?;

        // Step 2: idempotence check before any network call. An existing
        // entry is returned untouched whether or not the user owns it;
        // user-owned notes are additionally logged since skipping them is
        // a hard invariant, not just dedup.
        if let Some(existing) = self.find_existing(&identity) {
            let user_owned = existing
                .load_front_matter()
                .map(|fm| fm.is_user_owned())
                .unwrap_or(false);
            info!(
                "entry {} already exists (user_owned={user_owned}), skipping",
                identity.hash
            );
            let markdown = fs::read_to_string(&existing.note_path)?;
            return Ok(MaterializeOutcome::AlreadyExists {
                entry: existing,
                markdown,
            });
        }

        // Step 3: enrichment, best-effort. A capture is never lost to a
        // failed classification — it degrades to a minimal note.
        let (metadata, degraded) = match self.gateway.enrich(payload).await {
            Ok(metadata) => (metadata, false),
            Err(e) => {
                warn!("enrichment failed for {}: {e}; writing minimal note", payload.url);
                (degraded_metadata(payload), true)
            }
        };

        // Step 4: render. Everything held in memory; no mutation yet.
        let base = self.base_dir(metadata.folder_path.as_deref());
        let mut entry = VaultEntry::target(&base, &identity);
        let template = self.catalog.select(
            identity.kind,
            metadata.document_type,
            payload.html.is_some(),
        );
        let markdown = template.render(&bindings(payload, &identity, &metadata));

        // Step 5: single-unit write, the last action of the pipeline.
        if !self.write_entry(&mut entry, payload, &markdown)? {
            // Lost a race to another writer for the same identity.
            let markdown = fs::read_to_string(&entry.note_path)?;
            return Ok(MaterializeOutcome::AlreadyExists { entry, markdown });
        }

        info!("materialized {} -> {}", payload.url, entry.note_path.display());
        Ok(MaterializeOutcome::Created {
            entry,
            markdown,
            degraded,
        })
    }

    fn identity(&self, payload: &CapturePayload) -> Result<ContentIdentity, CaptureError> {
        // Structured tweet fields carry the id even when the URL is a
        // share variant that hides it.
        if let Some(tweet) = &payload.tweet {
            fingerprint::canonicalize(&payload.url)?;
            return Ok(ContentIdentity {
                hash: tweet.id.clone(),
                kind: SourceKind::Tweet,
            });
        }
        fingerprint::fingerprint(&payload.url)
    }

    /// Looks for an existing entry for this identity anywhere in the
    /// vault. Folder placement is advisory and the folder catalog can
    /// change between runs, so the search walks the tree instead of
    /// assuming a base.
    fn find_existing(&self, identity: &ContentIdentity) -> Option<VaultEntry> {
        find_entry_under(&self.vault_root, identity)
    }

    fn base_dir(&self, folder: Option<&str>) -> PathBuf {
        match folder {
            Some(folder) => self.vault_root.join(folder),
            None => self.vault_root.clone(),
        }
    }

    /// Stages the note plus binary side files into a scratch directory
    /// inside the vault, then publishes the whole entry with one rename.
    /// Returns `false` when the target directory appeared concurrently.
    fn write_entry(
        &self,
        entry: &mut VaultEntry,
        payload: &CapturePayload,
        markdown: &str,
    ) -> Result<bool, CaptureError> {
        fs::create_dir_all(&self.vault_root)?;
        let staged = tempfile::Builder::new()
            .prefix(".capture-")
            .tempdir_in(&self.vault_root)?;

        let note_name = entry
            .note_path
            .file_name()
            .expect("note path has a file name");
        fs::write(staged.path().join(note_name), markdown)?;

        if let Some(html) = &payload.html {
            if payload.kind == SourceKind::Page {
                fs::write(staged.path().join("raw.html"), html)?;
                entry.raw_html_path = Some(entry.dir.join("raw.html"));
            }
        }
        if let Some(screenshot) = &payload.screenshot {
            fs::write(staged.path().join("screenshot.png"), screenshot)?;
            entry.screenshot_path = Some(entry.dir.join("screenshot.png"));
        }

        if let Some(parent) = entry.dir.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::rename(staged.path(), &entry.dir) {
            Ok(()) => {
                // The directory moved; disarm the scratch cleanup.
                let _ = staged.into_path();
                Ok(true)
            }
            Err(e) if entry.dir.exists() => {
                warn!("entry {} appeared during write: {e}", entry.dir.display());
                Ok(false)
            }
            Err(e) => Err(CaptureError::WriteFailure(e)),
        }
    }
}

/// Depth-first search for the identity's entry directory. Hidden
/// directories (in-progress staging dirs included) are skipped.
fn find_entry_under(base: &Path, identity: &ContentIdentity) -> Option<VaultEntry> {
    let candidate = VaultEntry::target(base, identity);
    if candidate.exists() {
        return Some(candidate);
    }
    for child in fs::read_dir(base).ok()?.flatten() {
        let path = child.path();
        if !path.is_dir() || child.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if let Some(found) = find_entry_under(&path, identity) {
            return Some(found);
        }
    }
    None
}

/// Metadata for the degraded path: title and URL survive, the summary
/// section renders empty. Deliberately NOT a partial classification.
fn degraded_metadata(payload: &CapturePayload) -> Metadata {
    Metadata {
        title: if payload.title.is_empty() {
            payload.url.clone()
        } else {
            payload.title.clone()
        },
        summary: String::new(),
        key_points: Vec::new(),
        tags: Vec::new(),
        folder_path: None,
        published_date: None,
        document_type: match payload.kind {
            SourceKind::Tweet => DocumentType::Tweet,
            SourceKind::Paper => DocumentType::Paper,
            SourceKind::Page => DocumentType::Article,
        },
    }
}

/// Assembles the binding map handed to the template: metadata, payload
/// fields, and computed paths.
fn bindings(
    payload: &CapturePayload,
    identity: &ContentIdentity,
    metadata: &Metadata,
) -> Map<String, Value> {
    let added_date = Utc::now().format("%Y-%m-%dT%H:%M").to_string();

    let mut map = Map::new();
    map.insert("added_date".to_string(), json!(added_date));
    map.insert("url".to_string(), json!(payload.url));
    map.insert("url_hash".to_string(), json!(identity.hash));
    map.insert("title".to_string(), json!(metadata.title));
    map.insert("summary".to_string(), json!(metadata.summary));
    map.insert("key_points".to_string(), json!(metadata.key_points));
    map.insert("tags".to_string(), json!(metadata.tags));
    map.insert(
        "filename".to_string(),
        json!(display_filename(&metadata.title, &identity.hash)),
    );
    if let Some(date) = metadata.published_date {
        map.insert("published_date".to_string(), json!(date.to_string()));
    }
    if identity.kind == SourceKind::Paper {
        map.insert("arxiv_id".to_string(), json!(identity.hash));
    }
    if let Some(tweet) = &payload.tweet {
        map.insert(
            "author".to_string(),
            json!({"name": tweet.author.name, "username": tweet.author.username}),
        );
        map.insert("text".to_string(), json!(tweet.text));
        map.insert(
            "tweet_date".to_string(),
            json!(tweet.date.clone().unwrap_or_else(|| added_date.clone())),
        );
        map.insert("media".to_string(), json!(tweet.media));
        if let Some(video_url) = &tweet.video_url {
            map.insert("video_url".to_string(), json!(video_url));
        }
    }
    map
}

/// Converts a title to a clean filename: lowercase, punctuation dropped,
/// spaces collapsed to single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true; // suppress leading hyphens
    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if (c.is_whitespace() || c == '-' || c == '_') && !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Human-readable display filename recorded in the note's front matter:
/// slug of the title (capped at 50 chars) plus the identity's last four
/// characters for uniqueness.
pub fn display_filename(title: &str, hash: &str) -> String {
    let capped: String = title.chars().take(50).collect();
    let slug = slugify(&capped);
    let suffix: String = hash
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if slug.is_empty() {
        format!("note-{suffix}.md")
    } else {
        format!("{slug}-{suffix}.md")
    }
}
