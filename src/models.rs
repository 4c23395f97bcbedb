//! Data models for scraped stubs, fetched articles and their summarized form.
//!
//! - [`ArticleStub`]: a card found on a listing page
//! - [`Article`]: a stub plus the deep-extracted body text
//! - [`SummarizedArticle`]: an article with its generated headline and summary
//! - [`CachedSummary`]: what the summary cache keeps per source URL
//! - [`RunLogEntry`]: one line of the per-run listing log
//!
//! JSON field names are camelCase so the snapshots and remote documents keep the
//! shape downstream readers already consume (`publishedAt`, `sourceName`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category used when a stub arrives without one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Category name to its articles, in dedup order.
pub type Grouped<T> = BTreeMap<String, Vec<T>>;

/// A lightweight article reference scraped from a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStub {
    pub title: String,
    /// Absolute article URL. Unique key across the pipeline.
    pub source: String,
    #[serde(default)]
    pub image: String,
    pub category: String,
    pub language: String,
    pub published_at: DateTime<Utc>,
}

/// A stub with its body text attached.
///
/// `content` is empty when deep extraction failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(flatten)]
    pub stub: ArticleStub,
    #[serde(default)]
    pub content: String,
}

impl Article {
    pub fn new(stub: ArticleStub, content: String) -> Self {
        Self { stub, content }
    }

    pub fn source(&self) -> &str {
        &self.stub.source
    }

    pub fn title(&self) -> &str {
        &self.stub.title
    }
}

/// The document written to the remote store.
///
/// `title` is the rewritten five-word headline, not the scraped one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedArticle {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub source_name: String,
    #[serde(default)]
    pub image: String,
    pub category: String,
    pub language: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
}

impl SummarizedArticle {
    pub fn from_article(
        article: &Article,
        summary: CachedSummary,
        source_name: String,
        language: &str,
    ) -> Self {
        Self {
            title: summary.title,
            summary: summary.summary,
            source: article.stub.source.clone(),
            source_name,
            image: article.stub.image.clone(),
            category: article.stub.category.clone(),
            language: language.to_string(),
            published_at: article.stub.published_at,
            content: article.content.clone(),
        }
    }
}

/// Headline and summary remembered for a source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSummary {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

/// Outcome of one listing-page visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub site: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub status: LogStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunLogEntry {
    pub fn success(site: &str, category: &str, count: usize) -> Self {
        Self {
            site: site.to_string(),
            category: category.to_string(),
            count: Some(count),
            status: LogStatus::Success,
            message: None,
        }
    }

    pub fn error(site: &str, category: &str, message: impl Into<String>) -> Self {
        Self {
            site: site.to_string(),
            category: category.to_string(),
            count: None,
            status: LogStatus::Error,
            message: Some(message.into()),
        }
    }
}

/// Group articles by category, keeping input order inside each group.
pub fn group_by_category(articles: Vec<Article>) -> Grouped<Article> {
    let mut grouped: Grouped<Article> = BTreeMap::new();
    for article in articles {
        let category = if article.stub.category.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            article.stub.category.clone()
        };
        grouped.entry(category).or_default().push(article);
    }
    grouped
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_article_serializes_flat_camel_case() {
        let article = article("தலைப்பு", "https://www.dinamalar.com/news/1", "உள்ளடக்கம்");
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["source"], "https://www.dinamalar.com/news/1");
        assert_eq!(json["content"], "உள்ளடக்கம்");
        assert!(json.get("publishedAt").is_some());
        assert!(json.get("stub").is_none());
    }

    #[test]
    fn test_article_deserializes_without_content() {
        let json = r#"{
            "title": "t",
            "source": "https://example.com/a",
            "category": "sports",
            "language": "tamil",
            "publishedAt": "2025-10-06T09:00:00Z"
        }"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.content, "");
        assert_eq!(article.stub.image, "");
    }

    #[test]
    fn test_summarized_article_keeps_stub_fields() {
        let article = article("old title", "https://cinema.vikatan.com/x", "body");
        let summarized = SummarizedArticle::from_article(
            &article,
            CachedSummary {
                title: "new".into(),
                summary: "sum.".into(),
            },
            "Cinema Vikatan".into(),
            "Tamil",
        );
        assert_eq!(summarized.title, "new");
        assert_eq!(summarized.source, "https://cinema.vikatan.com/x");
        assert_eq!(summarized.language, "Tamil");
        let json = serde_json::to_value(&summarized).unwrap();
        assert_eq!(json["sourceName"], "Cinema Vikatan");
    }

    #[test]
    fn test_run_log_entry_shapes() {
        let ok = serde_json::to_value(RunLogEntry::success("vikatan", "cinema", 12)).unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["count"], 12);
        assert!(ok.get("message").is_none());

        let err = serde_json::to_value(RunLogEntry::error("dinamalar", "sports", "timeout")).unwrap();
        assert_eq!(err["status"], "error");
        assert_eq!(err["message"], "timeout");
        assert!(err.get("count").is_none());
    }

    #[test]
    fn test_group_by_category_preserves_order() {
        let mut a = article("a", "https://x/1", "");
        a.stub.category = "sports".into();
        let mut b = article("b", "https://x/2", "");
        b.stub.category = "".into();
        let mut c = article("c", "https://x/3", "");
        c.stub.category = "sports".into();

        let grouped = group_by_category(vec![a, b, c]);
        let sports: Vec<_> = grouped["sports"].iter().map(|a| a.title()).collect();
        assert_eq!(sports, vec!["a", "c"]);
        assert_eq!(grouped[UNCATEGORIZED].len(), 1);
    }
}
