//! Built-in note templates, keyed by (source kind, document type).
//!
//! The section headers (`## Summary`, `### Key Points`, `## Notes`,
//! `## Related Documents`) and the front-matter field names are part of
//! the vault contract — downstream tooling parses them, so they must be
//! preserved verbatim.

use crate::fingerprint::SourceKind;
use crate::models::metadata::DocumentType;
use crate::template::{Template, TemplateError};

const TWEET: &str = "\
---
added-date: {{ added_date }}
url_hash: {{ url_hash }}
url: {{ url }}
read:
notes:
tags:
{% for tag in tags %}  - {{ tag }}
{% endfor %}---

# Tweet by @{{ author.username }}

**{{ author.name }}** — {{ tweet_date }}

{{ text }}

{% if media %}## Media

{% for item in media %}![media]({{ item }})
{% endfor %}
{% endif %}{% if video_url %}## Video

[video]({{ video_url }})

{% endif %}{% if summary %}## Summary

{{ summary }}

{% endif %}## Notes
";

const ARTICLE_WITH_URL_HASH: &str = "\
---
added-date: {{ added_date }}
url_hash: {{ url_hash }}
url: {{ url }}
filename: {{ filename }}
read:
notes:
tags:
{% for tag in tags %}  - {{ tag }}
{% endfor %}html: \"[[{{ url_hash }}/raw.html|raw]]\"
markdown: \"[[{{ url_hash }}/article|article]]\"
---

# {{ title }}

[source]({{ url }})

## Summary

{{ summary }}

### Key Points

{% for point in key_points %}* {{ point }}
{% endfor %}
## Notes

## Related Documents
";

const ARTICLE_SIMPLE: &str = "\
---
added-date: {{ added_date }}
url_hash: {{ url_hash }}
url: {{ url }}
filename: {{ filename }}
read:
notes:
tags:
{% for tag in tags %}  - {{ tag }}
{% endfor %}---

# {{ title }}

[source]({{ url }})

## Summary

{{ summary }}

### Key Points

{% for point in key_points %}* {{ point }}
{% endfor %}
## Notes

## Related Documents
";

const PAPER_WITH_ARXIV_ID: &str = "\
---
added-date: {{ added_date }}
url_hash: {{ url_hash }}
arxiv-id: {{ arxiv_id }}
arxiv-url: {{ url }}
pdf: \"[[{{ arxiv_id }}.pdf|pdf]]\"
read:
notes:
tags:
{% for tag in tags %}  - {{ tag }}
{% endfor %}---

# {{ title }}

[arXiv:{{ arxiv_id }}]({{ url }})

## Summary

{{ summary }}

### Key Points

{% for point in key_points %}* {{ point }}
{% endfor %}
## Notes

## Related Documents
";

const PAPER_SIMPLE: &str = "\
---
added-date: {{ added_date }}
url_hash: {{ url_hash }}
url: {{ url }}
read:
notes:
tags:
{% for tag in tags %}  - {{ tag }}
{% endfor %}---

# {{ title }}

[source]({{ url }})

## Summary

{{ summary }}

### Key Points

{% for point in key_points %}* {{ point }}
{% endfor %}
## Notes

## Related Documents
";

/// All note templates, parsed once at startup and selected per capture.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    tweet: Template,
    article_with_url_hash: Template,
    article_simple: Template,
    paper_with_arxiv_id: Template,
    paper_simple: Template,
}

impl TemplateCatalog {
    pub fn builtin() -> Result<Self, TemplateError> {
        Ok(TemplateCatalog {
            tweet: Template::parse(TWEET)?,
            article_with_url_hash: Template::parse(ARTICLE_WITH_URL_HASH)?,
            article_simple: Template::parse(ARTICLE_SIMPLE)?,
            paper_with_arxiv_id: Template::parse(PAPER_WITH_ARXIV_ID)?,
            paper_simple: Template::parse(PAPER_SIMPLE)?,
        })
    }

    /// Picks the template for a capture. `has_raw_html` decides whether the
    /// article note carries `raw.html` backlinks in its front matter.
    pub fn select(
        &self,
        kind: SourceKind,
        document_type: DocumentType,
        has_raw_html: bool,
    ) -> &Template {
        match (kind, document_type) {
            (SourceKind::Tweet, _) => &self.tweet,
            (SourceKind::Paper, _) => &self.paper_with_arxiv_id,
            (SourceKind::Page, DocumentType::Paper) => &self.paper_simple,
            (SourceKind::Page, _) if has_raw_html => &self.article_with_url_hash,
            (SourceKind::Page, _) => &self.article_simple,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_builtin_templates_parse() {
        TemplateCatalog::builtin().unwrap();
    }

    #[test]
    fn test_selection_by_kind_and_type() {
        let catalog = TemplateCatalog::builtin().unwrap();

        let bindings = json!({"author": {"username": "a"}})
            .as_object()
            .unwrap()
            .clone();
        let tweet = catalog.select(SourceKind::Tweet, DocumentType::Tweet, false);
        assert!(tweet.render(&bindings).contains("# Tweet by @a"));

        let paper = catalog.select(SourceKind::Paper, DocumentType::Paper, false);
        let rendered = paper.render(
            json!({"arxiv_id": "2410.18975"}).as_object().unwrap(),
        );
        assert!(rendered.contains("arxiv-id: 2410.18975"));

        let with_hash = catalog.select(SourceKind::Page, DocumentType::Article, true);
        assert!(with_hash
            .render(&serde_json::Map::new())
            .contains("raw.html|raw"));

        let simple = catalog.select(SourceKind::Page, DocumentType::Article, false);
        assert!(!simple.render(&serde_json::Map::new()).contains("raw.html"));
    }

    #[test]
    fn test_article_preserves_section_headers() {
        let catalog = TemplateCatalog::builtin().unwrap();
        let rendered = catalog
            .select(SourceKind::Page, DocumentType::Article, true)
            .render(&serde_json::Map::new());
        for header in ["## Summary", "### Key Points", "## Notes", "## Related Documents"] {
            assert!(rendered.contains(header), "missing header {header}");
        }
    }
}
