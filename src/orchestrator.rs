use chrono::NaiveDate;
use log::{debug, error, info, warn};

use crate::batch::{Batch, DateRange};
use crate::browser::{BrowsingContext, HttpContext};
use crate::config::RunConfig;
use crate::currency::Basket;
use crate::dataset::{Dataset, DateResult};
use crate::delay_manager::{PaceOutcome, Pacer, Shutdown};
use crate::error::{ConfigError, PersistenceError, ScrapeError};
use crate::fetcher::BatchFetcher;
use crate::store::DatasetStore;

/// Where a run currently is. `Done` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PartitionRange,
    FetchBatch(usize),
    MergeAndPersist(usize),
    Pace(usize),
    Done,
    Aborted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches_total: usize,
    pub batches_completed: usize,
    pub dates_fetched: usize,
    /// Dates that still failed after all retries. They stay missing (or keep older values).
    pub failed_dates: Vec<NaiveDate>,
    /// Stopped early on a shutdown request, after the last completed checkpoint.
    pub interrupted: bool,
    /// First date of the earliest batch that was not processed, if interrupted.
    pub resume_from: Option<NaiveDate>,
}

/// Drives a whole run: partition, then fetch, merge, checkpoint and pace per batch.
pub struct ScrapeOrchestrator<C> {
    basket: Basket,
    range: DateRange,
    batch_size: usize,
    retries: u32,
    fetcher: BatchFetcher<C>,
    store: DatasetStore,
    pacer: Pacer,
    shutdown: Shutdown,
    state: RunState,
}

impl ScrapeOrchestrator<HttpContext> {
    /// Orchestrator backed by the plain-HTTP browsing context.
    pub fn from_config(config: &RunConfig) -> Result<Self, ConfigError> {
        let context = HttpContext::new(config.navigation_timeout)?;
        ScrapeOrchestrator::new(config, context)
    }
}

impl<C: BrowsingContext> ScrapeOrchestrator<C> {
    pub fn new(config: &RunConfig, context: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let basket = config.basket();
        let fetcher = BatchFetcher::new(
            context,
            config.endpoint()?,
            config.extractor()?,
            config.settle,
            config.navigation_timeout,
        );

        Ok(ScrapeOrchestrator {
            store: DatasetStore::new(&config.data_dir, basket.base()),
            basket,
            range: config.date_range()?,
            batch_size: config.batch_size,
            retries: config.retries,
            fetcher,
            pacer: Pacer::new(config.pacing, config.pacing_jitter),
            shutdown: Shutdown::never(),
            state: RunState::Idle,
        })
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn basket(&self) -> &Basket {
        &self.basket
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Process every batch in chronological order, checkpointing after each one.
    ///
    /// A persistence failure aborts the run. Fetch failures only leave their dates
    /// untouched in the dataset; re-running the same range fills them in.
    pub async fn run(&mut self) -> Result<RunSummary, ScrapeError> {
        self.state = RunState::PartitionRange;
        let batches = match self.range.batches(self.batch_size) {
            Ok(batches) => batches,
            Err(e) => {
                self.state = RunState::Aborted;
                return Err(e.into());
            }
        };

        let mut summary = RunSummary {
            batches_total: batches.len(),
            ..RunSummary::default()
        };
        info!(
            "Fetching {} currencies against {} from {} to {} in {} batches",
            self.basket.len(),
            self.basket.base(),
            self.range.start(),
            self.range.end(),
            batches.len()
        );

        for batch in &batches {
            if self.shutdown.is_triggered() {
                warn!("Shutdown requested. Stopping before batch {}.", batch.index + 1);
                summary.interrupted = true;
                summary.resume_from = batch.first();
                break;
            }
            let (Some(first), Some(last)) = (batch.first(), batch.last()) else {
                continue;
            };

            info!(
                "Getting rates from {} to {} (batch {}/{})",
                first,
                last,
                batch.index + 1,
                batches.len()
            );
            self.state = RunState::FetchBatch(batch.index);
            let results = self.fetch_with_retries(batch).await;

            let mut rates_found = 0;
            for (date, result) in &results {
                match result {
                    Ok(row) => {
                        summary.dates_fetched += 1;
                        rates_found += row.present_count();
                    }
                    Err(e) => {
                        warn!("{}: {}", date, e);
                        summary.failed_dates.push(*date);
                    }
                }
            }

            debug!(
                "Batch {}: {} rates across {} dates",
                batch.index + 1,
                rates_found,
                results.len()
            );

            self.state = RunState::MergeAndPersist(batch.index);
            if let Err(e) = self.checkpoint(&results) {
                error!("Checkpoint for batch {} failed: {}", batch.index + 1, e);
                self.state = RunState::Aborted;
                return Err(e.into());
            }
            summary.batches_completed += 1;

            if batch.index + 1 < batches.len() {
                self.state = RunState::Pace(batch.index);
                if self.pacer.pace(&mut self.shutdown).await == PaceOutcome::Cancelled {
                    warn!("Shutdown requested during pacing. Progress is saved up to {}.", last);
                    summary.interrupted = true;
                    summary.resume_from = batches.get(batch.index + 1).and_then(Batch::first);
                    break;
                }
            }
        }

        self.state = RunState::Done;
        info!(
            "Run finished: {}/{} batches, {} dates fetched, {} failed.",
            summary.batches_completed,
            summary.batches_total,
            summary.dates_fetched,
            summary.failed_dates.len()
        );
        Ok(summary)
    }

    // Each retry round waits one pacing interval first, and is skipped on shutdown.
    async fn fetch_with_retries(&mut self, batch: &Batch) -> Vec<DateResult> {
        let mut results = self.fetcher.fetch_batch(&self.basket, &batch.dates).await;

        for attempt in 1..=self.retries {
            let failed: Vec<NaiveDate> = results
                .iter()
                .filter(|(_, r)| r.is_err())
                .map(|(d, _)| *d)
                .collect();
            if failed.is_empty() {
                break;
            }

            if self.pacer.pace(&mut self.shutdown).await == PaceOutcome::Cancelled {
                warn!("Shutdown requested. Skipping the remaining retries.");
                break;
            }
            info!(
                "Retrying {} failed dates (attempt {}/{})",
                failed.len(),
                attempt,
                self.retries
            );
            for (date, result) in self.fetcher.fetch_batch(&self.basket, &failed).await {
                if let Some(slot) = results.iter_mut().find(|(d, _)| *d == date) {
                    slot.1 = result;
                }
            }
        }

        results
    }

    /// Re-read the persisted dataset, fold the batch in and rewrite the file.
    fn checkpoint(&self, results: &[DateResult]) -> Result<Dataset, PersistenceError> {
        let existing = match self.store.load()? {
            Some(dataset) => dataset,
            None => Dataset::new(self.basket.currencies().to_vec()),
        };
        if existing.columns() != self.basket.currencies() {
            debug!(
                "Persisted columns {:?} differ from basket; new currencies are appended.",
                existing.columns()
            );
        }

        let merged = Dataset::merge(Some(existing), results);
        self.store.save(&merged)?;
        Ok(merged)
    }
}
