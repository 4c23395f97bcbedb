//! Headless browser session for sources that render articles client-side.
//!
//! One session is launched per run and shared by every deep extraction that
//! needs it. Callers own the handle and must call [`RenderSession::close`] when
//! the batch is over, on the error path too; the browser process outlives the
//! handle otherwise.
//!
//! # Feature Flag
//!
//! The real implementation drives Chromium through `chromiumoxide` and is
//! compiled with the default `render` feature. Built with
//! `--no-default-features`, [`RenderSession::launch`] always fails and callers
//! fall back to fetching those pages as static HTML.

use crate::error::{PipelineError, Result};
use std::time::Duration;

/// Navigation budget for one rendered page.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(45);

/// How long to wait for an adapter's ready selector after navigation.
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(any(feature = "render", test))]
const READY_POLL: Duration = Duration::from_millis(250);

/// Re-run `check` every `interval` until it holds or `budget` runs out.
/// Returns whether it held.
#[cfg(any(feature = "render", test))]
async fn poll_until<F, Fut>(budget: Duration, interval: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + budget;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() + interval > deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(feature = "render")]
pub struct RenderSession {
    browser: chromiumoxide::Browser,
    handler: tokio::task::JoinHandle<()>,
}

#[cfg(feature = "render")]
impl RenderSession {
    pub async fn launch() -> Result<Self> {
        use chromiumoxide::browser::{Browser, BrowserConfig};
        use futures::StreamExt;
        use tracing::info;

        let config = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(RENDER_TIMEOUT)
            .build()
            .map_err(PipelineError::Render)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PipelineError::Render(e.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        info!("Headless browser session started");
        Ok(Self { browser, handler })
    }

    /// Load `url` in a fresh tab and return the rendered document.
    ///
    /// With a `ready` selector the page is read once that selector matches,
    /// or after [`READY_TIMEOUT`] with whatever has rendered by then.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn render(&self, url: &str, ready: Option<&str>) -> Result<String> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| PipelineError::Render(e.to_string()))?;

        let html = tokio::time::timeout(RENDER_TIMEOUT, async {
            page.wait_for_navigation().await?;
            if let Some(selector) = ready {
                let tab = &page;
                let found = poll_until(READY_TIMEOUT, READY_POLL, move || async move {
                    tab.find_element(selector).await.is_ok()
                })
                .await;
                if !found {
                    tracing::debug!(%url, selector, "Ready selector never matched; reading page as is");
                }
            }
            page.content().await
        })
        .await;

        // Close the tab whatever happened above.
        if let Err(e) = page.close().await {
            tracing::warn!(%url, error = %e, "Failed to close browser tab");
        }

        match html {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => Err(PipelineError::Render(e.to_string())),
            Err(_) => Err(PipelineError::Render(format!("timed out rendering {url}"))),
        }
    }

    pub async fn close(mut self) {
        use tracing::{info, warn};

        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        let _ = self.handler.await;
        info!("Headless browser session closed");
    }
}

/// Placeholder session when built without the `render` feature.
#[cfg(not(feature = "render"))]
#[derive(Debug)]
pub struct RenderSession {
    _private: (),
}

#[cfg(not(feature = "render"))]
impl RenderSession {
    pub async fn launch() -> Result<Self> {
        Err(PipelineError::Render(
            "built without the `render` feature".to_string(),
        ))
    }

    pub async fn render(&self, url: &str, _ready: Option<&str>) -> Result<String> {
        Err(PipelineError::Render(format!(
            "cannot render {url}: built without the `render` feature"
        )))
    }

    pub async fn close(self) {}
}
