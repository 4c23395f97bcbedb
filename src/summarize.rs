//! Headline and summary generation.
//!
//! Per article the engine walks this state machine:
//!
//! ```text
//! CACHE_HIT ─────────────────────────────────────────────▶ DONE
//! MISS ─▶ CALL_MODEL ─▶ VALID ───────────────────────────▶ DONE
//!                    ├─▶ INVALID_TITLE ─▶ REGENERATE_TITLE ▶ DONE
//!                    └─▶ CALL_FAILED ─▶ LOCAL_FALLBACK ───▶ DONE
//! ```
//!
//! Whatever path is taken, the headline ends up with exactly
//! `headline_words` words in the configured script and the summary fits
//! `summary_max_chars` and ends with a sentence mark. Only a quota-exhausted
//! error escapes; every other failure degrades to the local summarizer.
//!
//! Misses across all categories share one pool of `max_concurrency` model
//! calls. Each finished summary is written to the cache before the next one is
//! awaited, so a crash loses only the calls still in flight.

use crate::api::{GenerationRequest, TextGenerator};
use crate::cache::SummaryCache;
use crate::config::LanguageConfig;
use crate::error::{ModelError, PipelineError, Result};
use crate::models::{Article, CachedSummary, Grouped, SummarizedArticle};
use crate::text::{clean_content, clean_headline, clip_summary, long_sentences, take_chars};
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument, warn};

const MIN_FALLBACK_SENTENCE_CHARS: usize = 20;

/// Headline and summary fields pulled out of a model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    pub headline: Option<String>,
    pub summary: Option<String>,
}

/// Parser for the two-label reply format:
///
/// ```text
/// <headline label>: <headline, single line>
/// <summary label>: <summary, may span lines>
/// ```
///
/// Either colon form (`:` or `：`) is accepted and markdown emphasis around
/// values is dropped. A reply without the summary label parses with
/// `summary: None`; nothing about the model's formatting is assumed.
#[derive(Debug, Clone)]
pub struct LabeledOutput {
    headline: Regex,
    summary: Regex,
}

impl LabeledOutput {
    pub fn new(headline_label: &str, summary_label: &str) -> Result<Self> {
        let hl = regex::escape(headline_label);
        let sl = regex::escape(summary_label);
        let headline = Regex::new(&format!(r"(?m){hl}\**\s*[:：]\s*(.+?)\s*(?:{sl}|$)"))
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let summary = Regex::new(&format!(r"(?s){sl}\**\s*[:：]\s*(.+)$"))
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        Ok(Self { headline, summary })
    }

    pub fn parse(&self, text: &str) -> ParsedOutput {
        let field = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().trim_matches('*').trim().to_string())
                .filter(|v| !v.is_empty())
        };
        ParsedOutput {
            headline: field(&self.headline),
            summary: field(&self.summary),
        }
    }
}

/// How a summary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Model,
    Fallback,
}

pub struct Summarizer<'a, G> {
    generator: G,
    config: &'a LanguageConfig,
    parser: LabeledOutput,
}

impl<'a, G> Summarizer<'a, G>
where
    G: TextGenerator,
{
    pub fn new(generator: G, config: &'a LanguageConfig) -> Result<Self> {
        let parser = LabeledOutput::new(
            &config.summarizer.headline_label,
            &config.summarizer.summary_label,
        )?;
        Ok(Self {
            generator,
            config,
            parser,
        })
    }

    #[cfg(test)]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    fn prompt(&self, content: &str) -> String {
        let s = &self.config.summarizer;
        let language = &self.config.language;
        format!(
            "You are a professional {language} newspaper editor.\n\n\
             Generate a {language} headline and summary for the news below.\n\n\
             Rules:\n\
             - Headline: exactly {words} meaningful {language} words forming a natural, complete news headline.\n\
             - Use only {language} words: no other languages, no numbers, no time information (e.g. \"hours ago\").\n\
             - Summary: within {chars} {language} characters, must end as a full sentence.\n\
             - Tone must sound like professional newspaper writing.\n\
             - Avoid emojis and unnecessary punctuation.\n\n\
             Format exactly like this:\n\
             {hl}: ...\n\
             {sl}: ...\n\n\
             News article:\n{content}\n",
            words = s.headline_words,
            chars = s.summary_max_chars,
            hl = s.headline_label,
            sl = s.summary_label,
            content = take_chars(content, s.content_prefix_chars),
        )
    }

    fn regenerate_prompt(&self, title: &str, content: &str) -> String {
        let s = &self.config.summarizer;
        let language = &self.config.language;
        format!(
            "Rewrite only the {language} headline below into exactly {words} meaningful {language} words.\n\
             It must read like a professional {language} newspaper headline.\n\
             No numbers, other languages, or time information. Reply with the headline only.\n\n\
             Original headline: \"{title}\"\n\
             Article: {content}\n",
            words = s.headline_words,
            content = take_chars(content, s.regenerate_prefix_chars),
        )
    }

    fn word_count(&self, text: &str) -> usize {
        self.config.script.count_words(text)
    }

    /// Force a headline to exactly `headline_words` script words.
    ///
    /// The first candidate with enough words is cut to length. Otherwise the
    /// richest candidate is topped up with words from `filler`, and when even
    /// that falls short the configured fallback headline is used.
    pub fn enforce_headline(&self, candidates: &[&str], filler: &str) -> String {
        let n = self.config.summarizer.headline_words;
        let script = self.config.script;

        for candidate in candidates {
            let words = script.words(candidate);
            if words.len() == n && candidate.split_whitespace().count() == n {
                return candidate.trim().to_string();
            }
            if words.len() >= n {
                return words[..n].join(" ");
            }
        }

        let mut words: Vec<&str> = candidates
            .iter()
            .map(|c| script.words(c))
            .max_by_key(|w| w.len())
            .unwrap_or_default();
        for word in script.words(filler) {
            if words.len() == n {
                break;
            }
            words.push(word);
        }
        if words.len() == n {
            words.join(" ")
        } else {
            self.config.summarizer.fallback_headline.clone()
        }
    }

    /// Extractive summary from the article's own text.
    pub fn local_summary(&self, article: &Article) -> CachedSummary {
        let s = &self.config.summarizer;
        let text = clean_content(&article.content);
        let sentences = long_sentences(&text, MIN_FALLBACK_SENTENCE_CHARS);

        let mut summary = sentences
            .iter()
            .take(s.fallback_sentences)
            .cloned()
            .collect::<Vec<_>>()
            .join(". ");
        if summary.is_empty() {
            summary = text.clone();
        }
        if summary.is_empty() {
            summary = article.title().to_string();
        }
        let mut summary = clip_summary(&summary, s.summary_max_chars);
        if summary.is_empty() {
            summary = clip_summary(&s.fallback_headline, s.summary_max_chars);
        }

        let lead = sentences
            .first()
            .map(|first| first.split_whitespace().take(s.headline_words).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let lead = clean_headline(&lead);
        let stub_title = clean_headline(article.title());
        let title = self.enforce_headline(&[&lead, &stub_title], &text);

        CachedSummary { title, summary }
    }

    /// Summarize one article, bypassing the cache.
    ///
    /// Returns `Err` only for a quota-exhausted model error.
    #[instrument(level = "info", skip_all, fields(source = %article.source()))]
    pub async fn summarize_article(
        &self,
        article: &Article,
    ) -> std::result::Result<(CachedSummary, Outcome), ModelError> {
        let s = &self.config.summarizer;
        let content = clean_content(&article.content);

        let request = GenerationRequest {
            prompt: self.prompt(&content),
            temperature: s.temperature,
            max_tokens: s.max_tokens,
        };
        let reply = match self.generator.generate(&request).await {
            Ok(reply) => reply,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Model call failed; using local summary");
                return Ok((self.local_summary(article), Outcome::Fallback));
            }
        };

        let parsed = self.parser.parse(&reply);
        let Some(raw_summary) = parsed.summary else {
            warn!(
                response_preview = %truncate_for_log(&reply, 200),
                "Model reply has no summary field; using local summary"
            );
            return Ok((self.local_summary(article), Outcome::Fallback));
        };
        let summary = clip_summary(&raw_summary, s.summary_max_chars);

        let mut title = clean_headline(parsed.headline.as_deref().unwrap_or(article.title()));
        let count = self.word_count(&title);
        if count != s.headline_words {
            warn!(words = count, %title, "Headline has wrong word count; regenerating");
            let request = GenerationRequest {
                prompt: self.regenerate_prompt(&title, &content),
                temperature: s.regenerate_temperature,
                max_tokens: s.regenerate_max_tokens,
            };
            let regenerated = match self.generator.generate(&request).await {
                Ok(reply) => {
                    // Tolerate a labeled reply even though only the headline was asked for.
                    let line = self.parser.parse(&reply).headline.unwrap_or(reply);
                    clean_headline(&line)
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Headline regeneration failed");
                    String::new()
                }
            };
            title = self.enforce_headline(&[&regenerated, &title], &content);
        }

        debug!(%title, summary_chars = summary.chars().count(), "Summarized article");
        Ok((CachedSummary { title, summary }, Outcome::Model))
    }

    /// Summarize every article of every category.
    ///
    /// Cache hits are served without touching the model. Misses go to the
    /// model `max_concurrency` at a time and are written to the cache as each
    /// one completes.
    ///
    /// # Arguments
    ///
    /// * `grouped` - Deduplicated articles keyed by category
    /// * `cache` - Source URL → summary cache, loaded from disk
    ///
    /// # Returns
    ///
    /// * `Ok(Grouped<SummarizedArticle>)` - One document per input article, in
    ///   input order within each category
    /// * `Err(PipelineError::Model)` - The model account ran out of quota;
    ///   summaries finished before that are already in the cache
    #[instrument(level = "info", skip_all)]
    pub async fn summarize_grouped(
        &self,
        grouped: Grouped<Article>,
        cache: &mut SummaryCache,
    ) -> Result<Grouped<SummarizedArticle>> {
        let items: Vec<(String, Article)> = grouped
            .into_iter()
            .flat_map(|(category, articles)| articles.into_iter().map(move |a| (category.clone(), a)))
            .collect();
        let mut results: Vec<Option<CachedSummary>> = vec![None; items.len()];

        let mut misses = Vec::new();
        for (i, (_, article)) in items.iter().enumerate() {
            match cache.get(article.source()) {
                Some(hit) => {
                    debug!(title = %truncate_for_log(article.title(), 60), "Summary cache hit");
                    results[i] = Some(hit.clone());
                }
                None => misses.push(i),
            }
        }
        let hits = items.len() - misses.len();
        info!(
            total = items.len(),
            hits,
            misses = misses.len(),
            concurrency = self.config.summarizer.max_concurrency,
            "Starting summarization"
        );

        let mut model_count = 0usize;
        let mut fallback_count = 0usize;
        {
            let items = &items;
            let mut pending = stream::iter(misses)
                .map(|i| async move { (i, self.summarize_article(&items[i].1).await) })
                .buffer_unordered(self.config.summarizer.max_concurrency);

            while let Some((i, outcome)) = pending.next().await {
                let (summary, how) = match outcome {
                    Ok(done) => done,
                    Err(e) => {
                        error!(error = %e, "Model quota exhausted; aborting summarization");
                        return Err(e.into());
                    }
                };
                match how {
                    Outcome::Model => model_count += 1,
                    Outcome::Fallback => fallback_count += 1,
                }
                let article = &items[i].1;
                if let Err(e) = cache.insert(article.source().to_string(), summary.clone()).await {
                    error!(error = %e, source = %article.source(), "Failed to persist summary cache");
                }
                info!(title = %summary.title, "Summarized");
                results[i] = Some(summary);
            }
        }

        let mut summarized: Grouped<SummarizedArticle> = BTreeMap::new();
        for ((category, article), summary) in items.into_iter().zip(results) {
            let Some(summary) = summary else { continue };
            let source_name = self.config.publisher_for(article.source());
            summarized
                .entry(category)
                .or_default()
                .push(SummarizedArticle::from_article(
                    &article,
                    summary,
                    source_name,
                    &self.config.language,
                ));
        }

        info!(
            hits,
            model = model_count,
            fallback = fallback_count,
            cache_entries = cache.len(),
            "Summarization complete"
        );
        Ok(summarized)
    }
}
