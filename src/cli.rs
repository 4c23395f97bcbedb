//! Command-line interface definitions.
//!
//! All options can be given as flags; secrets and endpoints also fall back to
//! environment variables.

use clap::{Parser, ValueEnum};

/// Where summarized documents are synced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// One JSON file per category under `--store-dir`
    File,
    /// Google Cloud Firestore (REST)
    Firestore,
    /// Kept in memory and discarded at exit
    Memory,
}

/// Scrape, deduplicate, summarize and sync regional-language news.
///
/// # Examples
///
/// ```sh
/// # Local run, documents mirrored to ./store
/// short_news --config config/tamil.yaml
///
/// # Production sync
/// short_news --config config/tamil.yaml --store firestore --firestore-project my-app
///
/// # Summaries only
/// short_news --config config/tamil.yaml --skip-sync
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the language YAML configuration
    #[arg(short, long, default_value = "config/tamil.yaml")]
    pub config: String,

    /// Directory for raw, grouped and summarized snapshots
    #[arg(short, long, default_value = "output")]
    pub output_dir: String,

    /// Directory holding the URL and summary caches
    #[arg(long, default_value = "cache")]
    pub cache_dir: String,

    /// Directory for the per-run listing log
    #[arg(long, default_value = "logs")]
    pub log_dir: String,

    /// API key for the chat-completions service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = crate::api::DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Document store backend
    #[arg(long, value_enum, default_value_t = StoreKind::File)]
    pub store: StoreKind,

    /// Root directory for the file store
    #[arg(long, default_value = "store")]
    pub store_dir: String,

    /// Firestore project id
    #[arg(long, env = "FIRESTORE_PROJECT")]
    pub firestore_project: Option<String>,

    /// OAuth bearer token for Firestore
    #[arg(long, env = "FIRESTORE_TOKEN", hide_env_values = true)]
    pub firestore_token: Option<String>,

    /// Firestore endpoint override, e.g. an emulator
    #[arg(long, env = "FIRESTORE_BASE_URL")]
    pub firestore_base_url: Option<String>,

    /// Stop after summarization
    #[arg(long)]
    pub skip_sync: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["short_news"]);

        assert_eq!(cli.config, "config/tamil.yaml");
        assert_eq!(cli.output_dir, "output");
        assert_eq!(cli.cache_dir, "cache");
        assert_eq!(cli.log_dir, "logs");
        assert_eq!(cli.store, StoreKind::File);
        assert!(!cli.skip_sync);
    }

    #[test]
    fn test_cli_store_selection() {
        let cli = Cli::parse_from([
            "short_news",
            "-c",
            "/etc/news/hindi.yaml",
            "--store",
            "firestore",
            "--firestore-project",
            "news-app",
            "--skip-sync",
        ]);

        assert_eq!(cli.config, "/etc/news/hindi.yaml");
        assert_eq!(cli.store, StoreKind::Firestore);
        assert_eq!(cli.firestore_project.as_deref(), Some("news-app"));
        assert!(cli.skip_sync);
    }

    #[test]
    fn test_cli_rejects_unknown_store() {
        assert!(Cli::try_parse_from(["short_news", "--store", "redis"]).is_err());
    }
}
