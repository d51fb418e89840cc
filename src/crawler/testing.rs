//! Scripted fetcher shared by the crawler unit tests

use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::crawler::policy::CrawlPolicy;
use crate::output::{CrawlMetadata, UrlResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub(crate) fn page(url: &str) -> FetchedPage {
    FetchedPage {
        markdown: format!("# {}", url),
        html: format!("<html><body><h1>{}</h1></body></html>", url),
        status_code: 200,
        headers: HashMap::from([("content-type".to_string(), "text/html".to_string())]),
        content_type: Some("text/html".to_string()),
        final_url: url.to_string(),
    }
}

pub(crate) fn result(url: &str) -> UrlResult {
    let page = page(url);
    UrlResult {
        url: url.to_string(),
        markdown: page.markdown,
        images: vec![],
        links: vec![],
        metadata: CrawlMetadata {
            crawl_time: Utc::now(),
            content_type: page.content_type,
            status_code: page.status_code,
            headers: page.headers,
            final_url: page.final_url,
        },
        extracted_content: None,
        extraction_error: None,
    }
}

/// Fetcher that replays per-URL scripts and falls back to a fixed outcome
pub(crate) struct ScriptedFetcher {
    succeed_by_default: bool,
    delay: Duration,
    panic_on: Option<String>,
    scripts: Mutex<HashMap<String, VecDeque<Result<FetchedPage, FetchError>>>>,
    calls: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(succeed_by_default: bool) -> Self {
        Self {
            succeed_by_default,
            delay: Duration::ZERO,
            panic_on: None,
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn always_ok() -> Self {
        Self::new(true)
    }

    pub(crate) fn always_failing() -> Self {
        Self::new(false)
    }

    /// Every fetch sleeps this long before answering
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fetching `url` panics instead of answering
    pub(crate) fn panicking_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }

    /// Queues outcomes for `url`; once drained the default outcome applies
    pub(crate) fn script(self, url: &str, outcomes: Vec<Result<FetchedPage, FetchError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), outcomes.into());
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Highest number of fetches observed in flight at once
    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url, _policy: &CrawlPolicy) -> Result<FetchedPage, FetchError> {
        let key = url.as_str().to_string();
        if self.panic_on.as_deref() == Some(key.as_str()) {
            panic!("scripted fetcher panicked on {}", key);
        }
        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        self.active.fetch_sub(1, Ordering::SeqCst);

        match scripted {
            Some(outcome) => outcome,
            None if self.succeed_by_default => Ok(page(&key)),
            None => Err(FetchError::Network("connection refused".to_string())),
        }
    }
}
