//! Pretty-printed JSON snapshots of each stage's output.

use crate::error::Result;
use crate::models::{Article, Grouped, RunLogEntry, SummarizedArticle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Writes the per-run snapshot files for one namespace.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    output_dir: PathBuf,
    log_dir: PathBuf,
    namespace: String,
}

impl SnapshotWriter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            log_dir: log_dir.into(),
            namespace: namespace.into(),
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}-raw.json", self.namespace))
    }

    pub fn grouped_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}-grouped.json", self.namespace))
    }

    pub fn summarized_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}-summarized.json", self.namespace))
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.log_dir.join(format!("{}-log.json", self.namespace))
    }

    pub async fn write_raw(&self, articles: &[Article]) -> Result<()> {
        write_json(articles, &self.raw_path()).await
    }

    pub async fn write_grouped(&self, grouped: &Grouped<Article>) -> Result<()> {
        write_json(grouped, &self.grouped_path()).await
    }

    pub async fn write_summarized(&self, summarized: &Grouped<SummarizedArticle>) -> Result<()> {
        write_json(summarized, &self.summarized_path()).await
    }

    pub async fn write_run_log(&self, entries: &[RunLogEntry]) -> Result<()> {
        write_json(entries, &self.run_log_path()).await
    }
}

/// Serialize `value` to `path`, creating the parent directory if needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json<T>(value: &T, path: &Path) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!("Wrote snapshot");
    Ok(())
}
