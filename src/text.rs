//! Text normalization shared by extraction, dedup and summarization.
//!
//! All lengths here are counted in Unicode scalar values, never bytes, since
//! headlines and summaries are in Indic scripts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{M}\p{N}\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static HEADLINE_FROM_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+.*$").unwrap());
static QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["“”]"#).unwrap());
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:!;,.]+$").unwrap());
static RELATIVE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(மணி.*முன்|hour.*ago)").unwrap());

static CONTENT_HOURS_AGO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)hour\(s\)\s*ago.*$").unwrap());
static CONTENT_DATELINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(Updated.*|Published.*|Posted.*|புதுப்பிக்கப்பட்டது.*)").unwrap()
});
static CONTENT_HOURS_TA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+ ?மணி(யா)?களுக்கு முன்").unwrap());

static ADVERTISEMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"ADVERTISEMENT").unwrap());
static READ_MORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"இதைப் படித்தீர்களா\?.*").unwrap());
static DAY_NAMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"திங்கள்|செவ்வாய்|புதன்|வியாழன்|வெள்ளி|சனி|ஞாயிறு").unwrap()
});

static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]").unwrap());

/// Marks accepted as the end of a summary sentence.
const TERMINALS: [char; 5] = ['.', '!', '?', '。', '…'];
/// Marks a clipped summary may be cut back to.
const CUT_POINTS: [char; 4] = ['.', '!', '?', '。'];

/// Writing system whose words count toward the headline length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    #[default]
    Tamil,
    Devanagari,
    Bengali,
    Telugu,
    Kannada,
    Malayalam,
    Latin,
}

impl Script {
    pub fn contains(self, c: char) -> bool {
        match self {
            Script::Tamil => ('\u{0B80}'..='\u{0BFF}').contains(&c),
            Script::Devanagari => ('\u{0900}'..='\u{097F}').contains(&c),
            Script::Bengali => ('\u{0980}'..='\u{09FF}').contains(&c),
            Script::Telugu => ('\u{0C00}'..='\u{0C7F}').contains(&c),
            Script::Kannada => ('\u{0C80}'..='\u{0CFF}').contains(&c),
            Script::Malayalam => ('\u{0D00}'..='\u{0D7F}').contains(&c),
            Script::Latin => {
                c.is_ascii_alphabetic() || ('\u{00C0}'..='\u{024F}').contains(&c)
            }
        }
    }

    /// Maximal runs of characters in this script, in order.
    pub fn words(self, text: &str) -> Vec<&str> {
        let mut words = Vec::new();
        let mut start: Option<usize> = None;
        for (i, c) in text.char_indices() {
            match (self.contains(c), start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    words.push(&text[s..i]);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            words.push(&text[s..]);
        }
        words
    }

    pub fn count_words(self, text: &str) -> usize {
        self.words(text).len()
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Title key used for near-duplicate comparison: punctuation stripped,
/// whitespace collapsed, case folded.
pub fn normalize_title(title: &str) -> String {
    let stripped = NON_WORD.replace_all(title, "");
    collapse_whitespace(&stripped).to_lowercase()
}

/// Strip the noise model headlines tend to carry: numbers and anything after
/// them, quotes, trailing punctuation and relative-time phrases.
pub fn clean_headline(title: &str) -> String {
    let t = HEADLINE_FROM_DIGIT.replace(title, "");
    let t = QUOTES.replace_all(&t, "");
    let t = RELATIVE_TIME.replace_all(&t, "");
    let t = collapse_whitespace(&t);
    let t = TRAILING_PUNCT.replace(&t, "");
    t.trim().to_string()
}

/// Drop datelines and relative timestamps before content goes into a prompt.
pub fn clean_content(text: &str) -> String {
    let t = CONTENT_HOURS_AGO.replace_all(text, "");
    let t = CONTENT_DATELINE.replace_all(&t, "");
    let t = CONTENT_HOURS_TA.replace_all(&t, "");
    collapse_whitespace(&t)
}

/// Remove advertisement markers, "read this?" prompts and weekday names that
/// the article templates mix into body text.
pub fn clean_extracted_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let t = ADVERTISEMENT.replace_all(text, "");
    let t = READ_MORE.replace_all(&t, "");
    let t = DAY_NAMES.replace_all(&t, "");
    collapse_whitespace(&t)
}

/// Sentences longer than `min_chars`, trimmed, in document order.
pub fn long_sentences(text: &str, min_chars: usize) -> Vec<String> {
    SENTENCE_SPLIT
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}

pub fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Bound a summary to `max_chars` and make it end like a sentence.
///
/// A clipped summary is cut back to its last sentence mark when that mark lies
/// in the final third of the budget.
///
/// # Arguments
///
/// * `summary` - Model or locally built summary; quotes are dropped and
///   whitespace collapsed first
/// * `max_chars` - Budget in Unicode scalar values
///
/// # Returns
///
/// At most `max_chars` characters ending in a sentence terminal, or an empty
/// string when nothing is left after cleaning.
pub fn clip_summary(summary: &str, max_chars: usize) -> String {
    let cleaned = collapse_whitespace(&QUOTES.replace_all(summary, ""));
    if cleaned.is_empty() || max_chars == 0 {
        return String::new();
    }

    let mut chars: Vec<char> = cleaned.chars().collect();
    if chars.len() > max_chars {
        chars.truncate(max_chars);
        let floor = max_chars * 2 / 3;
        if let Some(cut) = chars.iter().rposition(|c| CUT_POINTS.contains(c)) {
            if cut > floor {
                chars.truncate(cut + 1);
            }
        }
        while chars.last().is_some_and(|c| c.is_whitespace()) {
            chars.pop();
        }
    }

    if !chars.last().is_some_and(|c| TERMINALS.contains(c)) {
        if chars.len() >= max_chars {
            chars.truncate(max_chars - 1);
        }
        while chars.last().is_some_and(|c| c.is_whitespace()) {
            chars.pop();
        }
        chars.push('.');
    }
    chars.into_iter().collect()
}
