//! Incremental upload of summarized articles with a per-category cap.
//!
//! For each category the sync:
//!
//! 1. lists the ids already stored
//! 2. ranks stored documents and articles with new ids together by
//!    `publishedAt`, newest first, and marks the top `max_docs` as the
//!    collection to keep
//! 3. uploads only new articles inside that set, stamped with `lastSyncedAt`
//! 4. deletes stored documents that fall outside it
//!
//! A new article that would be trimmed right away is never written, so running
//! the sync twice over the same input writes nothing the second time, even
//! when the category is over its cap.
//! Individual upload or delete failures are logged and counted; they never
//! stop the rest of the category. A category whose listing fails is skipped.

use crate::error::Result;
use crate::models::{Grouped, SummarizedArticle};
use crate::store::{DocumentStore, StoredDoc, doc_id};
use crate::utils::truncate_for_log;
use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, error, info, instrument, warn};

pub const MAX_DOCS_PER_CATEGORY: usize = 50;

/// Counters for one sync, per category or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub skipped: usize,
    /// New articles older than everything kept, so never uploaded.
    pub beyond_cap: usize,
    pub failed_uploads: usize,
    pub deleted: usize,
    pub failed_deletes: usize,
    pub failed_categories: usize,
}

impl SyncReport {
    fn absorb(&mut self, other: SyncReport) {
        self.uploaded += other.uploaded;
        self.skipped += other.skipped;
        self.beyond_cap += other.beyond_cap;
        self.failed_uploads += other.failed_uploads;
        self.deleted += other.deleted;
        self.failed_deletes += other.failed_deletes;
        self.failed_categories += other.failed_categories;
    }
}

/// Newest first; documents without a publish time sort last, ties by id.
fn newest_first(a: &StoredDoc, b: &StoredDoc) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

fn document(article: &SummarizedArticle, synced_at: DateTime<Utc>) -> Result<Value> {
    let mut doc = serde_json::to_value(article)?;
    if let Value::Object(fields) = &mut doc {
        fields.insert(
            "lastSyncedAt".to_string(),
            Value::String(synced_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    Ok(doc)
}

/// Sync one category collection.
///
/// # Arguments
///
/// * `store` - Remote document store
/// * `namespace` - Language namespace, e.g. `tamil`
/// * `category` - Collection within the namespace
/// * `articles` - This run's summarized articles for the category
/// * `max_docs` - How many documents the collection may hold afterwards
/// * `synced_at` - Value written to `lastSyncedAt` on every upload
///
/// # Returns
///
/// * `Ok(SyncReport)` - Counters for this category. Failed uploads and
///   deletes are counted, not returned.
/// * `Err(PipelineError)` - The existing documents could not be listed
#[instrument(level = "info", skip(store, articles, synced_at), fields(incoming = articles.len()))]
pub async fn sync_category<S: DocumentStore>(
    store: &S,
    namespace: &str,
    category: &str,
    articles: &[SummarizedArticle],
    max_docs: usize,
    synced_at: DateTime<Utc>,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let existing = store.list(namespace, category).await?;
    let mut known: HashSet<String> = existing.iter().map(|d| d.id.clone()).collect();

    let mut candidates: Vec<(String, &SummarizedArticle)> = Vec::new();
    for article in articles {
        let id = doc_id(&article.source);
        if known.insert(id.clone()) {
            candidates.push((id, article));
        } else {
            report.skipped += 1;
        }
    }

    let keep: HashSet<String> = existing
        .iter()
        .cloned()
        .chain(candidates.iter().map(|(id, article)| StoredDoc {
            id: id.clone(),
            published_at: Some(article.published_at),
        }))
        .sorted_by(newest_first)
        .take(max_docs)
        .map(|doc| doc.id)
        .collect();

    let mut retained = existing;
    for (id, article) in candidates {
        if !keep.contains(&id) {
            debug!(title = %truncate_for_log(&article.title, 40), %id, "Older than the kept set; not uploading");
            report.beyond_cap += 1;
            continue;
        }
        let result = match document(article, synced_at) {
            Ok(doc) => store.set(namespace, category, &id, &doc).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!(title = %truncate_for_log(&article.title, 50), %id, "Uploaded");
                report.uploaded += 1;
                retained.push(StoredDoc {
                    id,
                    published_at: Some(article.published_at),
                });
            }
            Err(e) => {
                error!(title = %truncate_for_log(&article.title, 40), error = %e, "Upload failed");
                report.failed_uploads += 1;
            }
        }
    }

    // Uploads all rank inside the kept set, so only stored documents overflow.
    let overflow: Vec<StoredDoc> = retained
        .into_iter()
        .sorted_by(newest_first)
        .skip(max_docs)
        .collect();
    if !overflow.is_empty() {
        info!(count = overflow.len(), max_docs, "Trimming old documents");
    }
    for doc in overflow {
        match store.delete(namespace, category, &doc.id).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!(id = %doc.id, error = %e, "Delete failed");
                report.failed_deletes += 1;
            }
        }
    }

    info!(
        uploaded = report.uploaded,
        skipped = report.skipped,
        beyond_cap = report.beyond_cap,
        deleted = report.deleted,
        "Category synced"
    );
    Ok(report)
}

/// Sync every category of a run.
///
/// `categories` lists the configured categories so that ones without fresh
/// articles still get trimmed; categories only present in `grouped` are
/// synced too.
#[instrument(level = "info", skip_all, fields(%namespace))]
pub async fn sync_all<S: DocumentStore>(
    store: &S,
    namespace: &str,
    categories: &[String],
    grouped: &Grouped<SummarizedArticle>,
    max_docs: usize,
) -> SyncReport {
    let synced_at = Utc::now();
    let mut total = SyncReport::default();

    for category in categories.iter().chain(grouped.keys()).unique() {
        let articles = grouped.get(category).map(Vec::as_slice).unwrap_or_default();
        match sync_category(store, namespace, category, articles, max_docs, synced_at).await {
            Ok(report) => total.absorb(report),
            Err(e) => {
                error!(%category, error = %e, "Category sync failed; skipping");
                total.failed_categories += 1;
            }
        }
    }

    info!(
        uploaded = total.uploaded,
        skipped = total.skipped,
        beyond_cap = total.beyond_cap,
        deleted = total.deleted,
        failed_uploads = total.failed_uploads,
        failed_categories = total.failed_categories,
        "Store sync complete"
    );
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Counts writes and fails uploads for chosen sources.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
        deletes: AtomicUsize,
        reject: HashSet<String>,
        fail_list: bool,
    }

    impl DocumentStore for CountingStore {
        async fn list(&self, namespace: &str, category: &str) -> Result<Vec<StoredDoc>> {
            if self.fail_list {
                return Err(PipelineError::Store("listing unavailable".into()));
            }
            self.inner.list(namespace, category).await
        }

        async fn set(&self, namespace: &str, category: &str, id: &str, doc: &Value) -> Result<()> {
            if self.reject.contains(id) {
                return Err(PipelineError::Store("permission denied".into()));
            }
            self.writes.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.set(namespace, category, id, doc).await
        }

        async fn delete(&self, namespace: &str, category: &str, id: &str) -> Result<()> {
            self.deletes.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.delete(namespace, category, id).await
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 6, 0, 0, 0).unwrap()
    }

    fn summarized(n: usize, minutes: i64) -> SummarizedArticle {
        SummarizedArticle {
            title: format!("தலைப்பு {n}"),
            summary: "சுருக்கம்.".into(),
            source: format!("https://www.dinamalar.com/news/{n}"),
            source_name: "Dinamalar".into(),
            image: String::new(),
            category: "cinema".into(),
            language: "Tamil".into(),
            published_at: base_time() + Duration::minutes(minutes),
            content: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upload_stamps_last_synced_at() {
        let store = MemoryStore::new();
        let article = summarized(1, 0);
        let report = sync_category(&store, "tamil", "cinema", &[article.clone()], 50, base_time())
            .await
            .unwrap();
        assert_eq!(report.uploaded, 1);

        let docs = store.documents("tamil", "cinema").await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, doc_id(&article.source));
        assert_eq!(docs[0].1["sourceName"], "Dinamalar");
        assert_eq!(docs[0].1["lastSyncedAt"], "2025-10-06T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let store = CountingStore::default();
        let articles: Vec<_> = (0..5).map(|i| summarized(i, i as i64)).collect();

        let first = sync_category(&store, "tamil", "cinema", &articles, 50, base_time()).await.unwrap();
        assert_eq!(first.uploaded, 5);
        let second = sync_category(&store, "tamil", "cinema", &articles, 50, base_time()).await.unwrap();
        assert_eq!(second.uploaded, 0);
        assert_eq!(second.skipped, 5);
        assert_eq!(store.writes.load(AtomicOrdering::SeqCst), 5);
        assert_eq!(store.deletes.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cap_keeps_newest() {
        let store = MemoryStore::new();
        // 50 older documents already stored, 60 newer ones arrive.
        let old: Vec<_> = (0..50).map(|i| summarized(i, i as i64)).collect();
        sync_category(&store, "tamil", "cinema", &old, 50, base_time()).await.unwrap();

        let fresh: Vec<_> = (100..160).map(|i| summarized(i, 1000 + i as i64)).collect();
        let report = sync_category(&store, "tamil", "cinema", &fresh, 50, base_time()).await.unwrap();
        assert_eq!(report.uploaded, 50);
        assert_eq!(report.beyond_cap, 10);
        assert_eq!(report.deleted, 50);

        let kept: HashSet<String> = store
            .documents("tamil", "cinema")
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let expected: HashSet<String> = (110..160)
            .map(|i| doc_id(&format!("https://www.dinamalar.com/news/{i}")))
            .collect();
        assert_eq!(kept, expected);
    }

    #[tokio::test]
    async fn test_over_cap_rerun_with_interleaved_times_is_stable() {
        let store = CountingStore::default();
        // Stored documents at even minutes, incoming ones at odd minutes.
        let stored: Vec<_> = (0..50).map(|i| summarized(i, 2 * i as i64)).collect();
        sync_category(&store, "tamil", "cinema", &stored, 50, base_time()).await.unwrap();
        let incoming: Vec<_> = (0..60).map(|i| summarized(100 + i, 2 * i as i64 + 1)).collect();

        let first = sync_category(&store, "tamil", "cinema", &incoming, 50, base_time()).await.unwrap();
        assert_eq!(first.uploaded, 30);
        assert_eq!(first.beyond_cap, 30);
        assert_eq!(first.deleted, 30);

        let writes = store.writes.load(AtomicOrdering::SeqCst);
        let deletes = store.deletes.load(AtomicOrdering::SeqCst);
        let second = sync_category(&store, "tamil", "cinema", &incoming, 50, base_time()).await.unwrap();
        assert_eq!(second.uploaded, 0);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.skipped, 30);
        assert_eq!(second.beyond_cap, 30);
        assert_eq!(store.writes.load(AtomicOrdering::SeqCst), writes);
        assert_eq!(store.deletes.load(AtomicOrdering::SeqCst), deletes);

        let expected: HashSet<String> = stored
            .iter()
            .chain(&incoming)
            .sorted_by_key(|a| std::cmp::Reverse(a.published_at))
            .take(50)
            .map(|a| doc_id(&a.source))
            .collect();
        let kept: HashSet<String> = store
            .inner
            .documents("tamil", "cinema")
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(kept, expected);
    }

    #[tokio::test]
    async fn test_trims_without_new_articles_and_undated_go_first() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let doc = serde_json::json!({ "publishedAt": format!("2025-10-0{}T00:00:00Z", i + 1) });
            store.set("tamil", "sports", &format!("dated{i}"), &doc).await.unwrap();
        }
        store.set("tamil", "sports", "undated", &serde_json::json!({})).await.unwrap();

        let report = sync_category(&store, "tamil", "sports", &[], 2, base_time()).await.unwrap();
        assert_eq!(report.deleted, 2);
        let ids: Vec<_> = store
            .documents("tamil", "sports")
            .await
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["dated1", "dated2"]);
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_abort() {
        let bad = summarized(2, 2);
        let store = CountingStore {
            reject: HashSet::from([doc_id(&bad.source)]),
            ..Default::default()
        };
        let articles = vec![summarized(1, 1), bad, summarized(3, 3)];
        let report = sync_category(&store, "tamil", "cinema", &articles, 50, base_time()).await.unwrap();
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failed_uploads, 1);
        assert_eq!(store.inner.documents("tamil", "cinema").await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_sources_upload_once() {
        let store = MemoryStore::new();
        let articles = vec![summarized(1, 1), summarized(1, 1)];
        let report = sync_category(&store, "tamil", "cinema", &articles, 50, base_time()).await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_sync_all_covers_configured_categories() {
        let store = CountingStore {
            fail_list: true,
            ..Default::default()
        };
        let mut grouped = Grouped::new();
        grouped.insert("cinema".to_string(), vec![summarized(1, 1)]);
        let categories = vec!["cinema".to_string(), "sports".to_string()];

        let report = sync_all(&store, "tamil", &categories, &grouped, 50).await;
        assert_eq!(report.failed_categories, 2);
        assert_eq!(report.uploaded, 0);

        let store = MemoryStore::new();
        let report = sync_all(&store, "tamil", &categories, &grouped, 50).await;
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.failed_categories, 0);
    }
}
