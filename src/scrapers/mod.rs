//! Listing collection and deep content extraction.
//!
//! Each source site gets an adapter implementing [`SiteAdapter`]. Adapters only
//! know their site's markup: they turn a listing page into [`RawCard`]s and an
//! article page into body text. Everything that is policy lives here:
//!
//! - cards without a title or link are dropped
//! - cards whose image matches a placeholder pattern are dropped
//! - relative links and images are resolved against the listing's URL
//! - at most [`MAX_STUBS_PER_LISTING`] stubs are kept per listing page
//! - extracted text is cleaned of ads, "read this?" prompts and weekday names
//!
//! # Supported Sources
//!
//! | Source | Module | Article pages |
//! |--------|--------|---------------|
//! | Dinamalar | [`dinamalar`] | client-side rendered |
//! | Cinema Vikatan | [`vikatan`] | static HTML |

pub mod dinamalar;
pub mod vikatan;

use crate::error::{PipelineError, Result};
use crate::fetch::PageSource;
use crate::models::ArticleStub;
use crate::render::RenderSession;
use crate::text::clean_extracted_text;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const MAX_STUBS_PER_LISTING: usize = 50;

/// A card as found on a listing page, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCard {
    pub title: String,
    pub href: Option<String>,
    pub image: Option<String>,
}

/// Site-specific markup knowledge.
pub trait SiteAdapter: Send + Sync {
    /// Short site label used in run logs.
    fn site(&self) -> &'static str;

    fn matches(&self, url: &Url) -> bool;

    /// Article pages need a headless browser to produce their body.
    fn renders_articles(&self) -> bool {
        false
    }

    /// CSS selector that marks a rendered article page as ready to read.
    fn ready_selector(&self) -> Option<&'static str> {
        None
    }

    fn parse_listing(&self, html: &str) -> Vec<RawCard>;

    /// Raw body text of an article page; cleaning happens afterwards.
    fn parse_article(&self, html: &str) -> String;
}

/// The set of known adapters.
pub struct Adapters {
    adapters: Vec<Box<dyn SiteAdapter>>,
}

impl Default for Adapters {
    fn default() -> Self {
        Self {
            adapters: vec![
                Box::new(vikatan::Vikatan),
                Box::new(dinamalar::Dinamalar),
            ],
        }
    }
}

impl Adapters {
    pub fn for_url(&self, url: &str) -> Option<&dyn SiteAdapter> {
        let parsed = Url::parse(url).ok()?;
        self.adapters
            .iter()
            .find(|a| a.matches(&parsed))
            .map(|a| a.as_ref())
    }

    /// Whether any of these listing URLs belongs to a site with rendered articles.
    pub fn any_renders<'a, I>(&self, urls: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        urls.into_iter()
            .filter_map(|u| self.for_url(u))
            .any(|a| a.renders_articles())
    }
}

/// Whether `url` is on `domain` itself or one of its subdomains.
pub fn host_within(url: &Url, domain: &str) -> bool {
    url.host_str().is_some_and(|h| {
        h == domain || h.strip_suffix(domain).is_some_and(|rest| rest.ends_with('.'))
    })
}

/// Site label for run logs, even when no adapter claims the URL.
pub fn site_label(adapters: &Adapters, url: &str) -> String {
    match adapters.for_url(url) {
        Some(adapter) => adapter.site().to_string(),
        None => Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string()),
    }
}

/// Validate raw cards and turn them into stubs.
pub fn build_stubs(
    cards: Vec<RawCard>,
    base: &Url,
    category: &str,
    language: &str,
    placeholder_images: &[String],
    published_at: DateTime<Utc>,
) -> Vec<ArticleStub> {
    cards
        .into_iter()
        .filter_map(|card| {
            let title = card.title.trim().to_string();
            let href = card.href.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
            if title.is_empty() {
                return None;
            }
            let image = card.image.unwrap_or_default().trim().to_string();
            if !image.is_empty() && placeholder_images.iter().any(|p| image.contains(p.as_str())) {
                debug!(%title, %image, "Skipping placeholder card");
                return None;
            }
            let source = base.join(href).ok()?.to_string();
            let image = if image.is_empty() {
                image
            } else {
                base.join(&image).map(|u| u.to_string()).unwrap_or(image)
            };
            Some(ArticleStub {
                title,
                source,
                image,
                category: category.to_string(),
                language: language.to_string(),
                published_at,
            })
        })
        .take(MAX_STUBS_PER_LISTING)
        .collect()
}

/// Fetch a listing page and return its article stubs.
#[instrument(level = "info", skip(pages, adapters, placeholder_images))]
pub async fn collect_listing<P: PageSource>(
    pages: &P,
    adapters: &Adapters,
    url: &str,
    category: &str,
    language: &str,
    placeholder_images: &[String],
) -> Result<Vec<ArticleStub>> {
    let adapter = adapters
        .for_url(url)
        .ok_or_else(|| PipelineError::Scraping(format!("no site adapter for {url}")))?;
    let base = Url::parse(url)?;
    let html = pages.get_html(url).await?;
    let cards = adapter.parse_listing(&html);
    if cards.is_empty() {
        return Err(PipelineError::Scraping(format!(
            "{} listing had no recognizable cards",
            adapter.site()
        )));
    }
    let stubs = build_stubs(cards, &base, category, language, placeholder_images, Utc::now());
    info!(site = adapter.site(), count = stubs.len(), "Collected listing stubs");
    Ok(stubs)
}

/// Fetch an article page and return its cleaned body text.
///
/// Never fails: any fetch or parse problem yields an empty string.
#[instrument(level = "debug", skip(pages, adapters, session))]
pub async fn extract_content<P: PageSource>(
    pages: &P,
    adapters: &Adapters,
    session: Option<&RenderSession>,
    url: &str,
) -> String {
    let Some(adapter) = adapters.for_url(url) else {
        warn!(%url, "No site adapter for article");
        return String::new();
    };

    let html = match (adapter.renders_articles(), session) {
        (true, Some(session)) => session.render(url, adapter.ready_selector()).await,
        _ => pages.get_html(url).await,
    };

    match html {
        Ok(html) => clean_extracted_text(&adapter.parse_article(&html)),
        Err(e) => {
            warn!(%url, error = %e, "Deep extraction failed");
            String::new()
        }
    }
}
