//! Static HTML fetching shared by listing collection and deep extraction.

use crate::error::{PipelineError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Desktop browser user agent; some sources serve stripped pages to bots.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Something that returns the HTML behind a URL.
pub trait PageSource {
    async fn get_html(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for Fetcher {
    /// GET a page and return its body. Non-2xx responses are errors.
    #[instrument(level = "debug", skip(self))]
    async fn get_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Scraping(format!("GET {url} returned {status}")));
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned pages and records what was asked for and how many
    /// requests were in flight at once. Unknown URLs answer 404.
    #[derive(Debug, Default)]
    pub struct ScriptedPages {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedPages {
        pub fn new<I, K, V>(pages: I) -> Self
        where
            I: IntoIterator<Item = (K, V)>,
            K: Into<String>,
            V: Into<String>,
        {
            Self {
                pages: pages.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
                ..Self::default()
            }
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn requested(&self, url: &str) -> bool {
            self.requests.lock().unwrap().iter().any(|u| u == url)
        }

        pub fn peak_in_flight(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    impl PageSource for ScriptedPages {
        async fn get_html(&self, url: &str) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| PipelineError::Scraping(format!("GET {url} returned 404 Not Found")))
        }
    }
}
