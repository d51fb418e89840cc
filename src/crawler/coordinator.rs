//! Batch orchestration
//!
//! This module fans a batch of URLs out to crawl operations and joins them
//! back into one report:
//! - Validating the batch request before any work starts
//! - Admitting at most `concurrent_limit` operations at a time
//! - Collecting exactly one outcome per input URL through a single owner
//! - Tracking submitted batches as jobs in the [`JobRegistry`]
//! - Honoring cancellation for URLs not yet started

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::operation::crawl_url;
use crate::crawler::policy::{CrawlPolicy, RetryPolicy};
use crate::crawler::session::SessionPolicy;
use crate::extract::{enrich, ExtractionPolicy, Extractor, UnconfiguredExtractor};
use crate::jobs::{Job, JobError, JobRegistry};
use crate::output::{BatchReport, UrlError, UrlResult};
use crate::{AggregationError, CrawlError, ValidationError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Reason recorded for URLs never admitted because the batch was cancelled
pub const CANCELLED_BEFORE_START: &str = "cancelled before start";

type Outcome = Result<UrlResult, UrlError>;

fn default_true() -> bool {
    true
}

/// A batch of URLs plus the policies that apply to every one of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub urls: Vec<String>,

    /// Admission limit; the configured default applies when absent and
    /// out-of-range values are clamped
    #[serde(default)]
    pub concurrent_limit: Option<i64>,

    #[serde(default)]
    pub retry_config: Option<RetryPolicy>,

    #[serde(default)]
    pub extraction_config: Option<ExtractionPolicy>,

    #[serde(default)]
    pub session_config: Option<SessionPolicy>,

    #[serde(default = "default_true")]
    pub extract_images: bool,

    #[serde(default = "default_true")]
    pub extract_links: bool,
}

impl BatchRequest {
    /// A request for `urls` with every policy left at its default
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            concurrent_limit: None,
            retry_config: None,
            extraction_config: None,
            session_config: None,
            extract_images: true,
            extract_links: true,
        }
    }
}

/// A validated batch, ready to run
struct BatchPlan {
    urls: Vec<String>,
    limit: usize,
    context: Arc<BatchContext>,
}

/// Everything a worker needs, shared read-only across the batch
struct BatchContext {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    policy: CrawlPolicy,
    retry: RetryPolicy,
    extraction: Option<ExtractionPolicy>,
}

impl BatchContext {
    async fn crawl(&self, url: &str, cancel: &CancellationToken) -> Outcome {
        let mut result =
            crawl_url(self.fetcher.as_ref(), url, &self.policy, &self.retry, cancel).await?;

        if let Some(extraction) = &self.extraction {
            enrich(self.extractor.as_ref(), &mut result, extraction).await;
        }

        Ok(result)
    }
}

/// Runs batches and single crawls against one fetcher
///
/// Cloning is cheap; clones share the fetcher, extractor and job registry.
#[derive(Clone)]
pub struct Coordinator {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    registry: JobRegistry,
    crawler: CrawlerConfig,
    retry: RetryPolicy,
}

impl Coordinator {
    /// Creates a coordinator with an empty registry and no extraction service
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &Config) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(UnconfiguredExtractor),
            registry: JobRegistry::new(),
            crawler: config.crawler.clone(),
            retry: config.retry.to_policy(),
        }
    }

    /// Creates a coordinator backed by a reqwest [`HttpFetcher`]
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_registry(mut self, registry: JobRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Retry policy applied when a request carries none
    pub fn default_retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Builds the page policy for a single request
    pub fn crawl_policy(
        &self,
        extract_images: bool,
        extract_links: bool,
        session: Option<SessionPolicy>,
    ) -> CrawlPolicy {
        match session {
            Some(session) => CrawlPolicy::new(
                extract_images,
                extract_links,
                Some(session),
                self.crawler.page_timeout(),
            ),
            None => CrawlPolicy {
                extract_images,
                extract_links,
                ..self.crawler.default_crawl_policy()
            },
        }
    }

    /// Runs a batch to completion and returns its report
    pub async fn run_batch(&self, request: BatchRequest) -> Result<BatchReport, CrawlError> {
        self.run_batch_until(request, CancellationToken::new()).await
    }

    /// Runs a batch that stops admitting URLs once `cancel` fires
    pub async fn run_batch_until(
        &self,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> Result<BatchReport, CrawlError> {
        let plan = self.plan(request)?;
        self.execute(plan, None, cancel).await
    }

    /// Registers a job for the batch and runs it in the background
    ///
    /// Returns the pending job immediately. Invalid requests are rejected
    /// before any job is created. Must be called within a tokio runtime.
    pub fn submit_batch(&self, request: BatchRequest) -> Result<Job, CrawlError> {
        let plan = self.plan(request)?;
        let job = self.registry.create();
        let cancel = self.registry.cancellation_token(job.job_id)?;

        tracing::info!(job_id = %job.job_id, urls = plan.urls.len(), "Submitted batch");

        let coordinator = self.clone();
        let job_id = job.job_id;
        tokio::spawn(async move { coordinator.run_job(job_id, plan, cancel).await });

        Ok(job)
    }

    /// Current snapshot of a submitted job
    pub fn get_status(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.registry.get(job_id)
    }

    /// Requests cancellation of a submitted job
    pub fn cancel(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.registry.cancel(job_id)
    }

    /// Requests cancellation of every unfinished job
    pub fn cancel_all(&self) {
        self.registry.cancel_all();
    }

    /// Crawls one URL with the default retry policy
    pub async fn crawl_single(&self, url: &str, policy: &CrawlPolicy) -> Outcome {
        crawl_url(
            self.fetcher.as_ref(),
            url,
            policy,
            &self.retry,
            &CancellationToken::new(),
        )
        .await
    }

    /// Crawls one URL and runs extraction over its markdown
    pub async fn crawl_and_extract(
        &self,
        url: &str,
        policy: &CrawlPolicy,
        extraction: &ExtractionPolicy,
    ) -> Outcome {
        let mut result = self.crawl_single(url, policy).await?;
        enrich(self.extractor.as_ref(), &mut result, extraction).await;
        Ok(result)
    }

    fn plan(&self, request: BatchRequest) -> Result<BatchPlan, ValidationError> {
        if request.urls.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }

        let retry = request.retry_config.unwrap_or_else(|| self.retry.clone());
        retry.validate()?;

        let policy = self.crawl_policy(
            request.extract_images,
            request.extract_links,
            request.session_config,
        );
        policy.validate()?;

        let limit = self.concurrency_limit(request.concurrent_limit);

        Ok(BatchPlan {
            urls: request.urls,
            limit,
            context: Arc::new(BatchContext {
                fetcher: Arc::clone(&self.fetcher),
                extractor: Arc::clone(&self.extractor),
                policy,
                retry,
                extraction: request.extraction_config,
            }),
        })
    }

    fn concurrency_limit(&self, requested: Option<i64>) -> usize {
        let max = self.crawler.max_concurrency.max(1);
        let Some(requested) = requested else {
            return self.crawler.default_concurrency.clamp(1, max);
        };

        let limit = match usize::try_from(requested) {
            Ok(n) => n.clamp(1, max),
            Err(_) if requested < 0 => 1,
            Err(_) => max,
        };

        if i64::try_from(limit) != Ok(requested) {
            tracing::warn!(requested, limit, "Concurrency limit out of range, clamped");
        }

        limit
    }

    async fn run_job(self, job_id: Uuid, plan: BatchPlan, cancel: CancellationToken) {
        if let Err(e) = self.registry.mark_running(job_id, plan.urls.len()) {
            tracing::error!(job_id = %job_id, error = %e, "Could not start job");
            return;
        }

        let worker = self.clone();
        let handle = tokio::spawn(async move { worker.execute(plan, Some(job_id), cancel).await });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(AggregationError::Dispatcher(e.to_string()).into()),
        };

        let recorded = match outcome {
            Ok(report) => {
                tracing::info!(
                    job_id = %job_id,
                    successful = report.metadata.successful_count,
                    failed = report.metadata.failed_count,
                    "Job completed"
                );
                self.registry.complete(job_id, report)
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Job failed");
                self.registry.fail(job_id, e.to_string())
            }
        };

        if let Err(e) = recorded {
            tracing::error!(job_id = %job_id, error = %e, "Could not record job outcome");
        }
    }

    /// Fans the plan out and joins every outcome into a report
    async fn execute(
        &self,
        plan: BatchPlan,
        job_id: Option<Uuid>,
        cancel: CancellationToken,
    ) -> Result<BatchReport, CrawlError> {
        let start_time = Utc::now();
        let total = plan.urls.len();

        tracing::info!(urls = total, limit = plan.limit, "Starting batch");

        let (tx, rx) = mpsc::channel(total.max(1));
        let dispatcher = tokio::spawn(dispatch(plan, tx, cancel));

        let collected = collect_outcomes(rx, total, |done| {
            if let Some(job_id) = job_id {
                if let Err(e) = self.registry.set_progress(job_id, done, total) {
                    tracing::debug!(job_id = %job_id, error = %e, "Progress update skipped");
                }
            }
        })
        .await;

        let (successes, failures) = match collected {
            Ok(outcomes) => outcomes,
            Err(e) => {
                dispatcher.abort();
                return Err(e.into());
            }
        };

        dispatcher
            .await
            .map_err(|e| AggregationError::Dispatcher(e.to_string()))?;

        let report = BatchReport::new(successes, failures, start_time, Utc::now());

        tracing::info!(
            successful = report.metadata.successful_count,
            failed = report.metadata.failed_count,
            seconds = report.metadata.total_time_seconds,
            "Batch finished"
        );

        Ok(report)
    }
}

/// Admits URLs under the semaphore and spawns one worker per URL
///
/// Every input index produces exactly one message on `tx`, either from its
/// worker or, when cancelled before admission, from here.
async fn dispatch(plan: BatchPlan, tx: mpsc::Sender<(usize, Outcome)>, cancel: CancellationToken) {
    let semaphore = Arc::new(Semaphore::new(plan.limit));
    let mut workers = JoinSet::new();
    let mut pending = plan.urls.into_iter().enumerate();

    while let Some((index, url)) = pending.next() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            tracing::info!(remaining = pending.len() + 1, "Batch cancelled, skipping remaining URLs");
            let _ = tx
                .send((index, Err(UrlError::not_attempted(url, CANCELLED_BEFORE_START))))
                .await;
            break;
        };

        let context = Arc::clone(&plan.context);
        let tx = tx.clone();
        let cancel = cancel.clone();

        workers.spawn(async move {
            let outcome = context.crawl(&url, &cancel).await;
            drop(permit);
            let _ = tx.send((index, outcome)).await;
        });
    }

    for (index, url) in pending {
        let _ = tx
            .send((index, Err(UrlError::not_attempted(url, CANCELLED_BEFORE_START))))
            .await;
    }
    drop(tx);

    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Crawl worker stopped without reporting");
        }
    }
}

/// Receives outcomes until every sender is gone
///
/// Fails if any index reports twice or if fewer than `total` outcomes
/// arrive. `on_progress` is called with the running count after each one.
async fn collect_outcomes<F>(
    mut rx: mpsc::Receiver<(usize, Outcome)>,
    total: usize,
    mut on_progress: F,
) -> Result<(Vec<UrlResult>, Vec<UrlError>), AggregationError>
where
    F: FnMut(usize),
{
    let mut seen = vec![false; total];
    let mut successes = Vec::new();
    let mut failures = Vec::new();

    while let Some((index, outcome)) = rx.recv().await {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(AggregationError::DuplicateOutcome { index }),
        }

        match outcome {
            Ok(result) => successes.push(result),
            Err(error) => failures.push(error),
        }

        on_progress(successes.len() + failures.len());
    }

    let received = successes.len() + failures.len();
    if received != total {
        return Err(AggregationError::MissingOutcomes {
            expected: total,
            received,
        });
    }

    Ok((successes, failures))
}
