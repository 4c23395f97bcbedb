//! Fuzzy near-duplicate removal by title similarity.
//!
//! Every incoming title is compared against every title kept so far, so a batch
//! of `n` kept articles costs O(n²) comparisons. That is fine for the capped
//! batches this pipeline handles (50 per category) but does not scale to open
//! ended crawls.
//!
//! Input order decides which of two near-duplicates survives: the first one
//! seen is kept.

use crate::models::Article;
use crate::text::normalize_title;
use std::collections::HashMap;
use tracing::info;

pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Anything that carries a title worth comparing.
pub trait Titled {
    fn title(&self) -> &str;
}

impl Titled for Article {
    fn title(&self) -> &str {
        &self.stub.title
    }
}

/// Sørensen–Dice coefficient over character bigrams, whitespace ignored.
///
/// Identical strings score 1.0. Distinct strings never do, even when their
/// bigram multisets coincide.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return 1.0;
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for w in a.windows(2) {
        *bigrams.entry((w[0], w[1])).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for w in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(w[0], w[1])) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    let score = (2 * shared) as f64 / (a.len() + b.len() - 2) as f64;
    score.min(1.0 - f64::EPSILON)
}

/// Drop articles whose normalized title scores `>= threshold` against any
/// title already kept.
pub fn dedup<T: Titled>(items: Vec<T>, threshold: f64) -> Vec<T> {
    let total = items.len();
    let mut kept_titles: Vec<String> = Vec::new();
    let mut kept = Vec::new();

    for item in items {
        let normalized = normalize_title(item.title());
        let duplicate = kept_titles
            .iter()
            .any(|prev| similarity(&normalized, prev) >= threshold);
        if !duplicate {
            kept_titles.push(normalized);
            kept.push(item);
        }
    }

    info!(kept = kept.len(), total, threshold, "Fuzzy deduplication complete");
    kept
}
