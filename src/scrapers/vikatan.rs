//! Cinema Vikatan scraper.
//!
//! The listing mixes several card layouts whose class names carry build hashes,
//! so all known variants are matched at once. A card's headline is either an
//! `h3` inside it or its `aria-label` ("Read full story: …"). Images are lazy
//! loaded and may sit in `data-src-base`, `data-src` or `src`.
//!
//! Article pages are static HTML.

use super::{RawCard, SiteAdapter, host_within};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

static CARD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "a.styles-m__first-big-card__SeFeF, \
         a.styles-m__first-big-card__1Sbya, \
         a.styles-m__line-separater__1JUZK, \
         a.card-with-image-zoom",
    )
    .unwrap()
});
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.article-content p, div.qt-content p, article p").unwrap()
});

static READ_FULL_STORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Read full story:\s*").unwrap());

const MIN_TITLE_CHARS: usize = 5;
const MIN_PARAGRAPH_CHARS: usize = 40;

#[derive(Debug, Clone, Copy)]
pub struct Vikatan;

fn card_title(card: ElementRef<'_>) -> String {
    let heading = card
        .select(&HEADING)
        .next()
        .map(|h| h.text().collect::<String>().trim().to_string())
        .unwrap_or_default();
    if !heading.is_empty() {
        return heading;
    }
    card.value()
        .attr("aria-label")
        .map(|label| READ_FULL_STORY.replace(label.trim(), "").trim().to_string())
        .unwrap_or_default()
}

fn card_image(card: ElementRef<'_>) -> Option<String> {
    let img = card.select(&IMAGE).next()?;
    ["data-src-base", "data-src", "src"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

impl SiteAdapter for Vikatan {
    fn site(&self) -> &'static str {
        "vikatan"
    }

    fn matches(&self, url: &Url) -> bool {
        host_within(url, "vikatan.com")
    }

    fn parse_listing(&self, html: &str) -> Vec<RawCard> {
        let document = Html::parse_document(html);
        document
            .select(&CARD)
            .filter_map(|card| {
                let href = card.value().attr("href")?.trim().to_string();
                let title = card_title(card);
                if title.chars().count() < MIN_TITLE_CHARS {
                    return None;
                }
                Some(RawCard {
                    title,
                    href: Some(href),
                    image: card_image(card),
                })
            })
            .collect()
    }

    fn parse_article(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        document
            .select(&PARAGRAPH)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|t| t.chars().count() > MIN_PARAGRAPH_CHARS && seen.insert(t.clone()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <a class="card-with-image-zoom" href="/tamil-cinema/new-film-announced">
            <img data-src-base="https://images.assettype.com/vikatan/a.jpg" src="/placeholder.svg">
            <h3>புதிய திரைப்படம் அறிவிப்பு</h3>
          </a>
          <a class="styles-m__line-separater__1JUZK" href="https://cinema.vikatan.com/ott/series"
             aria-label="Read full story: ஓடிடி தொடர் வெளியீடு"></a>
          <a class="styles-m__first-big-card__SeFeF" href="/short"><h3>சிறு</h3></a>
          <a class="unrelated" href="/ignored"><h3>கணக்கில் இல்லை</h3></a>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_layouts() {
        let cards = Vikatan.parse_listing(LISTING);
        assert_eq!(cards.len(), 2);

        assert_eq!(cards[0].title, "புதிய திரைப்படம் அறிவிப்பு");
        assert_eq!(cards[0].href.as_deref(), Some("/tamil-cinema/new-film-announced"));
        assert_eq!(
            cards[0].image.as_deref(),
            Some("https://images.assettype.com/vikatan/a.jpg")
        );

        assert_eq!(cards[1].title, "ஓடிடி தொடர் வெளியீடு");
        assert!(cards[1].image.is_none());
    }

    #[test]
    fn test_parse_article_keeps_long_paragraphs_once() {
        let long = "நடிகர் நடித்த புதிய திரைப்படம் அடுத்த மாதம் திரையரங்குகளில் வெளியாகும் என்று படக்குழு அறிவித்துள்ளது";
        let html = format!(
            r#"<article><div class="article-content"><p>{long}</p><p>சிறியது</p></div></article>"#
        );
        let text = Vikatan.parse_article(&html);
        assert_eq!(text, long);
    }

    #[test]
    fn test_matches_host() {
        assert!(Vikatan.matches(&Url::parse("https://cinema.vikatan.com/latest").unwrap()));
        assert!(Vikatan.matches(&Url::parse("https://vikatan.com/").unwrap()));
        assert!(!Vikatan.matches(&Url::parse("https://notvikatan.com/latest").unwrap()));
        assert!(Vikatan.ready_selector().is_none());
    }
}
