//! Vault entry inspection and the persisted front-matter contract.
//!
//! The front-matter fields (`added-date`, `url_hash`, `read`, `notes`,
//! `tags`, `markdown`, `html`) are persisted state: once written they must
//! round-trip through re-parsing, because the ownership check on
//! re-capture (`read`/`notes` non-empty ⇒ user-owned) reads them back
//! from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fingerprint::{ContentIdentity, SourceKind};

/// Parsed front matter of a materialized note.
///
/// Unknown fields are tolerated (notes accumulate fields from other
/// tools); absent fields parse as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(rename = "added-date", default)]
    pub added_date: Option<String>,
    #[serde(default)]
    pub url_hash: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub read: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

impl FrontMatter {
    /// A note becomes user-owned the moment `read` or `notes` is filled
    /// in; user-owned notes are never overwritten.
    pub fn is_user_owned(&self) -> bool {
        let filled = |field: &Option<String>| {
            field.as_deref().is_some_and(|s| !s.trim().is_empty())
        };
        filled(&self.read) || filled(&self.notes)
    }
}

/// Splits a note into its front matter block and markdown body.
/// Returns `None` when the note carries no `---` fenced front matter.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;
    let end = rest.find("\n---\n")?;
    Some((&rest[..end], &rest[end + 5..]))
}

/// Parses the front matter of a note's text, if present.
pub fn parse_front_matter(content: &str) -> Option<FrontMatter> {
    let (raw, _body) = split_front_matter(content)?;
    serde_yaml::from_str(raw).ok()
}

/// The on-disk shape of one materialized capture: a directory named after
/// the content identity, holding the note and any binary side files.
#[derive(Debug, Clone)]
pub struct VaultEntry {
    pub dir: PathBuf,
    pub note_path: PathBuf,
    pub raw_html_path: Option<PathBuf>,
    pub screenshot_path: Option<PathBuf>,
}

impl VaultEntry {
    /// Computes the target layout for an identity under a base directory.
    /// Pure: the same identity always maps to the same paths.
    ///
    /// Pages: `{hash}/article.md` (+ raw.html / screenshot.png).
    /// Tweets and papers: `{id}/{id}.md`.
    pub fn target(base: &Path, identity: &ContentIdentity) -> VaultEntry {
        let dir = base.join(&identity.hash);
        let note_path = match identity.kind {
            SourceKind::Page => dir.join("article.md"),
            SourceKind::Tweet | SourceKind::Paper => dir.join(format!("{}.md", identity.hash)),
        };
        VaultEntry {
            dir,
            note_path,
            raw_html_path: None,
            screenshot_path: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.note_path.exists()
    }

    /// Re-parses the persisted note's front matter from disk.
    pub fn load_front_matter(&self) -> Option<FrontMatter> {
        let content = fs::read_to_string(&self.note_path).ok()?;
        parse_front_matter(&content)
    }
}
