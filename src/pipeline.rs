//! Task orchestration.
//!
//! Each task runs as its own tokio task, so a panic inside one pipeline is
//! caught at its join handle and never reaches its siblings. At most
//! `task_concurrency` tasks are in flight. Within a task the phases run
//! strictly in sequence, each one submitting all of its work and draining
//! all of it before the next starts:
//!
//! 1. **Histogram**: one tone chart request
//! 2. **Fetch**: article markup, bounded async concurrency
//! 3. **Extract**: title/body on the rayon extractor pool
//! 4. **Aggregate**: survivors back into their buckets
//! 5. **Write**: one line appended under the file's lock

use crate::aggregate::aggregate;
use crate::config::Config;
use crate::error::Result;
use crate::gdelt::HistogramClient;
use crate::models::{Article, Task};
use crate::outputs::ChartWriter;
use crate::scrapers::{ContentFetcher, ExtractorPool};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Outcome counts of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    /// Tasks that returned an error and wrote nothing.
    pub failed: usize,
    pub panicked: usize,
}

#[derive(Clone)]
pub struct Harvester {
    histogram: HistogramClient,
    fetcher: ContentFetcher,
    extractor: ExtractorPool,
    writer: ChartWriter,
    task_concurrency: usize,
}

impl Harvester {
    pub fn new(
        histogram: HistogramClient,
        fetcher: ContentFetcher,
        extractor: ExtractorPool,
        writer: ChartWriter,
        task_concurrency: usize,
    ) -> Self {
        Self {
            histogram,
            fetcher,
            extractor,
            writer,
            task_concurrency: task_concurrency.max(1),
        }
    }

    /// Wire every stage from the run configuration.
    ///
    /// One HTTP client with a shared connection pool serves both the
    /// histogram requests and the article fetches.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.task_concurrency.max(config.fetch_concurrency))
            .build()?;

        Ok(Self::new(
            HistogramClient::new(http.clone(), config.base_url.clone(), config.request_timeout()),
            ContentFetcher::new(http, config.fetch_timeout(), config.fetch_concurrency),
            ExtractorPool::new(config.extract_threads)?,
            ChartWriter::new(config.output_dir.clone()),
            config.task_concurrency,
        ))
    }

    /// Run one task's pipeline end to end.
    ///
    /// Returns the path the chart was appended to. An error means nothing
    /// was written for this task.
    #[instrument(level = "info", skip_all, fields(country = %task.country, window = %task.window))]
    pub async fn run_task(&self, task: Task) -> Result<PathBuf> {
        let t0 = Instant::now();
        let mut bins = self.histogram.fetch_tone_chart(&task).await?;

        let refs: Vec<Article> = bins
            .iter_mut()
            .flat_map(|bin| std::mem::take(&mut bin.articles))
            .collect();
        let fetched = self.fetcher.fetch_all(refs).await;
        let extracted = self.extractor.extract_all(fetched).await;

        let chart = aggregate(&task, bins, extracted);
        let path = self.writer.append_chart(&chart).await?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Task complete");
        Ok(path)
    }

    /// Run every task, at most `task_concurrency` at a time, in whatever
    /// order they finish.
    #[instrument(level = "info", skip_all, fields(tasks = tasks.len()))]
    pub async fn run(&self, tasks: Vec<Task>) -> RunSummary {
        self.drive(tasks, |harvester, task| async move { harvester.run_task(task).await })
            .await
    }

    /// Spawn `job` once per task and tally the outcomes. A panicking job
    /// surfaces as a `JoinError` here and is counted, not propagated.
    async fn drive<F, Fut>(&self, tasks: Vec<Task>, job: F) -> RunSummary
    where
        F: Fn(Harvester, Task) -> Fut,
        Fut: Future<Output = Result<PathBuf>> + Send + 'static,
    {
        let total = tasks.len();
        info!(total, task_concurrency = self.task_concurrency, "Starting harvest");

        let mut outcomes = stream::iter(tasks)
            .map(|task| {
                let label = format!("{} {}", task.country, task.window);
                let handle = tokio::spawn(job(self.clone(), task));
                async move { (label, handle.await) }
            })
            .buffer_unordered(self.task_concurrency);

        let mut summary = RunSummary::default();
        while let Some((label, outcome)) = outcomes.next().await {
            match outcome {
                Ok(Ok(path)) => {
                    summary.succeeded += 1;
                    debug!(task = %label, path = %path.display(), "Task succeeded");
                }
                Ok(Err(e)) => {
                    summary.failed += 1;
                    error!(task = %label, error = %e, "Task aborted; nothing written");
                }
                Err(e) => {
                    summary.panicked += 1;
                    error!(task = %label, error = %e, "Task panicked; nothing written");
                }
            }
        }

        info!(
            total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            panicked = summary.panicked,
            "Harvest finished"
        );
        summary
    }
}
