//! Dinamalar scraper.
//!
//! Listings are Material UI cards (`div.MuiCard-root`) with the headline in a
//! body typography paragraph. Article pages are assembled client-side, so their
//! body paragraphs (`p.css-1oiyee6`) only exist after rendering.
//!
//! Rendered paragraphs carry stray emotion CSS fragments and repeated
//! teasers; both are stripped here.

use super::{RawCard, SiteAdapter, host_within};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("div.MuiCard-root").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE_PRIMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.MuiTypography-body1").unwrap());
static TITLE_SECONDARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.MuiTypography-body2").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
const BODY_PARAGRAPH: &str = "p.css-1oiyee6";
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse(BODY_PARAGRAPH).unwrap());

static CSS_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.css-[a-z0-9\-{}@:;().]+").unwrap());

const MIN_PARAGRAPH_CHARS: usize = 40;

#[derive(Debug, Clone, Copy)]
pub struct Dinamalar;

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl SiteAdapter for Dinamalar {
    fn site(&self) -> &'static str {
        "dinamalar"
    }

    fn matches(&self, url: &Url) -> bool {
        host_within(url, "dinamalar.com")
    }

    fn renders_articles(&self) -> bool {
        true
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some(BODY_PARAGRAPH)
    }

    fn parse_listing(&self, html: &str) -> Vec<RawCard> {
        let document = Html::parse_document(html);
        document
            .select(&CARD)
            .map(|card| {
                let href = card
                    .select(&LINK)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string);
                let title = card
                    .select(&TITLE_PRIMARY)
                    .map(text_of)
                    .find(|t| !t.is_empty())
                    .or_else(|| card.select(&TITLE_SECONDARY).map(text_of).find(|t| !t.is_empty()))
                    .unwrap_or_default();
                let image = card
                    .select(&IMAGE)
                    .next()
                    .and_then(|img| img.value().attr("src"))
                    .map(str::to_string);
                RawCard { title, href, image }
            })
            .collect()
    }

    fn parse_article(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        document
            .select(&PARAGRAPH)
            .map(text_of)
            .filter_map(|p| {
                let collapsed = crate::text::collapse_whitespace(&p);
                if collapsed.chars().count() < MIN_PARAGRAPH_CHARS || !seen.insert(collapsed) {
                    return None;
                }
                Some(CSS_FRAGMENT.replace_all(&p, "").trim().to_string())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="MuiCard-root">
            <a href="/news/tamil-nadu/rain-alert/4057001"><img src="https://img.dinamalar.com/a.jpg"></a>
            <p class="MuiTypography-body1">சென்னையில் கனமழை எச்சரிக்கை</p>
          </div>
          <div class="MuiCard-root">
            <a href="/news/sports/4057002"><img src="/static/dummy-noimg.png"></a>
            <p class="MuiTypography-body2">விளையாட்டு செய்தி</p>
          </div>
          <div class="MuiCard-root">
            <p class="MuiTypography-body1">இணைப்பு இல்லை</p>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_cards() {
        let cards = Dinamalar.parse_listing(LISTING);
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].title, "சென்னையில் கனமழை எச்சரிக்கை");
        assert_eq!(cards[0].href.as_deref(), Some("/news/tamil-nadu/rain-alert/4057001"));
        assert_eq!(cards[1].title, "விளையாட்டு செய்தி");
        assert_eq!(cards[1].image.as_deref(), Some("/static/dummy-noimg.png"));
        assert!(cards[2].href.is_none());
    }

    #[test]
    fn test_parse_article_filters_short_and_repeated_paragraphs() {
        let long = "சென்னை வானிலை ஆய்வு மையம் இன்று வெளியிட்ட அறிக்கையில் கனமழை பெய்யும் என தெரிவித்துள்ளது";
        let html = format!(
            r#"<article>
                <p class="css-1oiyee6">{long}</p>
                <p class="css-1oiyee6">சிறியது</p>
                <p class="css-1oiyee6">{long}</p>
                <p class="css-1oiyee6">{long} .css-1x2y3z{{color:red;}}</p>
                <p class="other">{long} மற்றவை</p>
            </article>"#
        );
        let text = Dinamalar.parse_article(&html);
        assert_eq!(text.matches("சென்னை வானிலை").count(), 2);
        assert!(!text.contains("சிறியது"));
        assert!(!text.contains(".css-"));
        assert!(!text.contains("மற்றவை"));
    }

    #[test]
    fn test_matches_host() {
        assert!(Dinamalar.matches(&Url::parse("https://www.dinamalar.com/x").unwrap()));
        assert!(Dinamalar.matches(&Url::parse("https://dinamalar.com/x").unwrap()));
        assert!(!Dinamalar.matches(&Url::parse("https://cinema.vikatan.com/x").unwrap()));
        assert!(!Dinamalar.matches(&Url::parse("https://notdinamalar.com/x").unwrap()));
        assert!(!Dinamalar.matches(&Url::parse("https://dinamalar.com.evil.net/x").unwrap()));
    }

    #[test]
    fn test_waits_for_body_paragraphs() {
        let selector = Dinamalar.ready_selector().unwrap();
        let html = format!(
            r#"<p class="css-1oiyee6">{}</p>"#,
            "மாநில அரசு புதிய திட்டங்களை இன்று சட்டசபையில் அறிவித்தது என அதிகாரிகள் தெரிவித்தனர்"
        );
        let document = Html::parse_document(&html);
        let found = document.select(&Selector::parse(selector).unwrap()).count();
        assert_eq!(found, 1);
        assert!(!Dinamalar.parse_article(&html).is_empty());
    }
}
