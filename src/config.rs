//! Per-language pipeline configuration.
//!
//! One YAML document describes a language run: which categories to scrape and
//! from which listing pages, how headlines are counted, and how the model is
//! prompted. Everything except `language`, `namespace` and `categories` has a
//! default matching the Tamil deployment.
//!
//! ```yaml
//! language: Tamil
//! namespace: tamil
//! script: tamil
//! categories:
//!   - name: cinema
//!     sources:
//!       - https://cinema.vikatan.com/latest-news
//! ```

use crate::error::{PipelineError, Result};
use crate::text::Script;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Display name used in prompts and stored documents.
    pub language: String,
    /// Store namespace and file prefix.
    pub namespace: String,
    #[serde(default)]
    pub script: Script,
    pub categories: Vec<CategoryConfig>,
    #[serde(default = "default_placeholder_images")]
    pub placeholder_images: Vec<String>,
    #[serde(default = "default_publishers")]
    pub publishers: Vec<Publisher>,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub sources: Vec<String>,
}

/// Maps a URL fragment to a human-readable publisher label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publisher {
    pub domain_fragment: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub regenerate_temperature: f32,
    pub regenerate_max_tokens: u32,
    pub content_prefix_chars: usize,
    pub regenerate_prefix_chars: usize,
    pub summary_max_chars: usize,
    pub headline_words: usize,
    pub headline_label: String,
    pub summary_label: String,
    /// Used when neither the model nor the article yields enough words.
    pub fallback_headline: String,
    pub fallback_sentences: usize,
    pub max_concurrency: usize,
    pub max_retries: usize,
    pub retry_base_delay_secs: u64,
    pub retry_max_delay_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.4,
            max_tokens: 700,
            regenerate_temperature: 0.3,
            regenerate_max_tokens: 100,
            content_prefix_chars: 3500,
            regenerate_prefix_chars: 1000,
            summary_max_chars: 300,
            headline_words: 5,
            headline_label: "தலைப்பு".to_string(),
            summary_label: "சுருக்கம்".to_string(),
            fallback_headline: "இன்றைய முக்கிய செய்திகள் சுருக்கமாக இங்கே".to_string(),
            fallback_sentences: 3,
            max_concurrency: 3,
            max_retries: 4,
            retry_base_delay_secs: 20,
            retry_max_delay_secs: 120,
        }
    }
}

fn default_placeholder_images() -> Vec<String> {
    vec!["dummy-noimg".to_string()]
}

fn default_publishers() -> Vec<Publisher> {
    [
        ("dinamalar", "Dinamalar"),
        ("vikatan", "Cinema Vikatan"),
        ("dailythanthi", "Daily Thanthi"),
        ("thehindu", "The Hindu Tamil"),
        ("oneindia", "OneIndia Tamil"),
        ("maalaimalar", "Maalaimalar"),
    ]
    .into_iter()
    .map(|(domain_fragment, name)| Publisher {
        domain_fragment: domain_fragment.to_string(),
        name: name.to_string(),
    })
    .collect()
}

impl LanguageConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LanguageConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml(&raw)?;
        info!(
            language = %config.language,
            categories = config.categories.len(),
            "Loaded language configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(PipelineError::Config("namespace must not be empty".into()));
        }
        if self.categories.is_empty() {
            return Err(PipelineError::Config("at least one category is required".into()));
        }
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(PipelineError::Config("category name must not be empty".into()));
            }
            for source in &category.sources {
                Url::parse(source).map_err(|e| {
                    PipelineError::Config(format!("bad source URL {source:?} in {}: {e}", category.name))
                })?;
            }
        }

        let s = &self.summarizer;
        if s.headline_words == 0 || s.summary_max_chars == 0 || s.max_concurrency == 0 {
            return Err(PipelineError::Config(
                "headline_words, summary_max_chars and max_concurrency must be positive".into(),
            ));
        }
        let fallback_words = self.script.count_words(&s.fallback_headline);
        if fallback_words != s.headline_words {
            return Err(PipelineError::Config(format!(
                "fallback_headline has {fallback_words} words, expected {}",
                s.headline_words
            )));
        }
        Ok(())
    }

    /// Publisher label for a source URL, `Unknown` when nothing matches.
    pub fn publisher_for(&self, url: &str) -> String {
        let lowered = url.to_lowercase();
        self.publishers
            .iter()
            .find(|p| lowered.contains(&p.domain_fragment))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
language: Tamil
namespace: tamil
categories:
  - name: cinema
    sources:
      - https://cinema.vikatan.com/latest-news
  - name: sports
    sources:
      - https://www.dinamalar.com/news/sports
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = LanguageConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.script, Script::Tamil);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].name, "cinema");
        assert_eq!(config.placeholder_images, vec!["dummy-noimg"]);
        assert_eq!(config.summarizer.headline_words, 5);
        assert_eq!(config.summarizer.summary_max_chars, 300);
        assert_eq!(config.summarizer.max_concurrency, 3);
    }

    #[test]
    fn test_rejects_bad_source_url() {
        let yaml = MINIMAL.replace("https://www.dinamalar.com/news/sports", "not a url");
        let err = LanguageConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_rejects_fallback_headline_of_wrong_length() {
        let yaml = format!("{MINIMAL}summarizer:\n  fallback_headline: \"செய்தி புதுப்பிப்பு\"\n");
        let err = LanguageConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("fallback_headline"));
    }

    #[test]
    fn test_rejects_empty_categories() {
        let yaml = "language: Tamil\nnamespace: tamil\ncategories: []\n";
        assert!(LanguageConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_publisher_for() {
        let config = LanguageConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(
            config.publisher_for("https://www.Dinamalar.com/news/1"),
            "Dinamalar"
        );
        assert_eq!(
            config.publisher_for("https://cinema.vikatan.com/x"),
            "Cinema Vikatan"
        );
        assert_eq!(config.publisher_for("https://example.com/x"), "Unknown");
    }

    #[test]
    fn test_shipped_tamil_config_is_valid() {
        let config = LanguageConfig::from_yaml(include_str!("../config/tamil.yaml")).unwrap();
        assert_eq!(config.namespace, "tamil");
        assert_eq!(config.script, Script::Tamil);
        assert!(config.categories.iter().any(|c| c.name == "cinema"));
        assert_eq!(config.summarizer.headline_words, 5);
    }
}
