//! Ingestion: listings → fresh stubs → deep content → deduplicated articles.
//!
//! Categories are processed one after another and their listing pages in
//! configured order. A listing page that fails is recorded in the run log and
//! skipped; the run continues. Stubs whose URL was deep-fetched in an earlier
//! run are dropped before any article page is requested, and a category stops
//! collecting once it holds [`MAX_ARTICLES_PER_CATEGORY`] articles.
//!
//! Article pages are fetched [`DEEP_FETCH_CONCURRENCY`] at a time. When any
//! configured site needs client-side rendering, one headless browser session
//! is opened for the whole stage and closed before returning, whether or not
//! the stage succeeded.

use crate::cache::UrlCache;
use crate::config::LanguageConfig;
use crate::dedup::{DEFAULT_THRESHOLD, dedup};
use crate::error::Result;
use crate::fetch::PageSource;
use crate::models::{Article, ArticleStub, RunLogEntry};
use crate::render::RenderSession;
use crate::scrapers::{Adapters, collect_listing, extract_content, site_label};
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

pub const DEEP_FETCH_CONCURRENCY: usize = 3;
pub const MAX_ARTICLES_PER_CATEGORY: usize = 50;

#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Deduplicated articles in first-seen order.
    pub articles: Vec<Article>,
    pub logs: Vec<RunLogEntry>,
}

/// Stubs not cached and not yet seen this run, at most `capacity` of them.
pub fn select_fresh(
    stubs: Vec<ArticleStub>,
    cache: &UrlCache,
    seen: &mut HashSet<String>,
    capacity: usize,
) -> Vec<ArticleStub> {
    stubs
        .into_iter()
        .filter(|s| !cache.contains(&s.source))
        .filter(|s| seen.insert(s.source.clone()))
        .take(capacity)
        .collect()
}

struct Collected {
    articles: Vec<Article>,
    logs: Vec<RunLogEntry>,
    fetched: Vec<String>,
}

#[instrument(level = "info", skip_all)]
async fn collect_all<P: PageSource>(
    config: &LanguageConfig,
    pages: &P,
    adapters: &Adapters,
    session: Option<&RenderSession>,
    cache: &UrlCache,
) -> Collected {
    let mut out = Collected {
        articles: Vec::new(),
        logs: Vec::new(),
        fetched: Vec::new(),
    };
    let mut seen = HashSet::new();

    for category in &config.categories {
        info!(category = %category.name, "Collecting category");
        let mut category_articles: Vec<Article> = Vec::new();

        for url in &category.sources {
            if category_articles.len() >= MAX_ARTICLES_PER_CATEGORY {
                break;
            }
            let site = site_label(adapters, url);
            let stubs = match collect_listing(
                pages,
                adapters,
                url,
                &category.name,
                &config.namespace,
                &config.placeholder_images,
            )
            .await
            {
                Ok(stubs) => stubs,
                Err(e) => {
                    warn!(%url, error = %e, "Listing unavailable; skipping");
                    out.logs.push(RunLogEntry::error(&site, &category.name, e.to_string()));
                    continue;
                }
            };

            let found = stubs.len();
            let capacity = MAX_ARTICLES_PER_CATEGORY - category_articles.len();
            let fresh = select_fresh(stubs, cache, &mut seen, capacity);
            info!(%site, found, fresh = fresh.len(), "Filtered cached stubs");

            let fetched: Vec<Article> = stream::iter(fresh)
                .map(|stub| async move {
                    let content = extract_content(pages, adapters, session, &stub.source).await;
                    if content.is_empty() {
                        warn!(title = %truncate_for_log(&stub.title, 40), "Content missing");
                    } else {
                        debug!(title = %truncate_for_log(&stub.title, 40), "Content extracted");
                    }
                    Article::new(stub, content)
                })
                .buffered(DEEP_FETCH_CONCURRENCY)
                .collect()
                .await;

            out.logs
                .push(RunLogEntry::success(&site, &category.name, fetched.len()));
            out.fetched
                .extend(fetched.iter().map(|a| a.source().to_string()));
            category_articles.extend(fetched);
        }

        category_articles.truncate(MAX_ARTICLES_PER_CATEGORY);
        info!(category = %category.name, count = category_articles.len(), "Category collected");
        out.articles.extend(category_articles);
    }
    out
}

/// Run the whole ingestion stage and record fetched URLs in `cache`.
///
/// # Arguments
///
/// * `config` - Categories and their listing URLs, in processing order
/// * `pages` - Where listing and static article pages are fetched from
/// * `adapters` - Site adapters; a headless session is opened if any of them
///   renders articles for a configured listing
/// * `cache` - URLs deep-fetched by earlier runs; extended and saved here
///
/// # Returns
///
/// * `Ok(IngestOutcome)` - Deduplicated articles in first-seen order plus one
///   log entry per listing visited. Failed listings and articles are contained.
/// * `Err(PipelineError)` - Only when the URL cache cannot be saved
#[instrument(level = "info", skip_all, fields(namespace = %config.namespace))]
pub async fn ingest<P: PageSource>(
    config: &LanguageConfig,
    pages: &P,
    adapters: &Adapters,
    cache: &mut UrlCache,
) -> Result<IngestOutcome> {
    info!(cached_urls = cache.len(), "Starting ingestion");

    let sources = config.categories.iter().flat_map(|c| c.sources.iter());
    let session = if adapters.any_renders(sources) {
        match RenderSession::launch().await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "Headless browser unavailable; rendered sites fall back to static fetch");
                None
            }
        }
    } else {
        None
    };

    let collected = collect_all(config, pages, adapters, session.as_ref(), cache).await;
    if let Some(session) = session {
        session.close().await;
    }

    let total = collected.articles.len();
    let articles = dedup(collected.articles, DEFAULT_THRESHOLD);
    info!(total, unique = articles.len(), "Ingestion complete");

    cache.extend(collected.fetched);
    cache.save().await?;

    Ok(IngestOutcome {
        articles,
        logs: collected.logs,
    })
}
