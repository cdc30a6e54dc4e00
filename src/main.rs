use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use log::{info, warn};

use fx_table_scraper::browser::DEFAULT_ENDPOINT;
use fx_table_scraper::extractor::DEFAULT_TABLE_SELECTOR;
use fx_table_scraper::{logger, CurrencyCode, RunConfig, ScrapeOrchestrator, Shutdown};

#[derive(Parser)]
#[command(
    name = "fx-table-scraper",
    about = "Scrape daily currency tables into a checkpointed CSV per base currency"
)]
struct Cli {
    /// Base currency every rate is quoted against.
    #[arg(long, default_value = "USD")]
    base: CurrencyCode,

    /// Number of top currencies in the basket (the base is removed from it).
    #[arg(long, default_value_t = 20)]
    basket_size: usize,

    /// First date (YYYY-MM-DD), inclusive.
    #[arg(long, default_value = "2022-01-01")]
    start: NaiveDate,

    /// Last date (YYYY-MM-DD), inclusive.
    #[arg(long, default_value = "2024-08-31")]
    end: NaiveDate,

    /// Dates fetched concurrently and checkpointed together.
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Pause between batches, in seconds.
    #[arg(long, default_value_t = 60)]
    pacing_secs: u64,

    /// Random extra pause of up to this many seconds.
    #[arg(long, default_value_t = 0)]
    pacing_jitter_secs: u64,

    /// Settling wait after each page load, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    settle_ms: u64,

    /// Navigation timeout per page, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Extra fetch rounds for dates that failed within a batch.
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Directory holding `to_<BASE>_rates.csv`.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Currency-table page; `from` and `date` are added as query parameters.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// CSS selector of the rate table.
    #[arg(long, default_value = DEFAULT_TABLE_SELECTOR)]
    table_selector: String,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            base_currency: self.base,
            basket_size: self.basket_size,
            start_date: self.start,
            end_date: self.end,
            batch_size: self.batch_size,
            pacing: Duration::from_secs(self.pacing_secs),
            pacing_jitter: Duration::from_secs(self.pacing_jitter_secs),
            settle: Duration::from_millis(self.settle_ms),
            navigation_timeout: Duration::from_secs(self.timeout_secs),
            retries: self.retries,
            data_dir: self.data_dir,
            endpoint: self.endpoint,
            table_selector: self.table_selector,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    info!("Starting currency table scraper...");

    let config = cli.into_config();
    let (trigger, shutdown) = Shutdown::channel();
    let mut orchestrator = ScrapeOrchestrator::from_config(&config)
        .context("invalid configuration")?
        .with_shutdown(shutdown);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received. Finishing the current batch before stopping.");
            trigger.trigger();
        }
    });

    let summary = orchestrator.run().await.context("scrape run aborted")?;

    if !summary.failed_dates.is_empty() {
        warn!(
            "{} dates could not be fetched; re-run the same range to fill them in.",
            summary.failed_dates.len()
        );
    }
    info!("Dataset at {:?}", orchestrator.store().path());

    if summary.interrupted {
        let resume = summary
            .resume_from
            .map(|d| d.to_string())
            .unwrap_or_else(|| "the start date".to_string());
        warn!(
            "Interrupted after {}/{} batches. Re-run with --start {} to continue.",
            summary.batches_completed, summary.batches_total, resume
        );
        bail!(
            "run interrupted after {}/{} batches",
            summary.batches_completed,
            summary.batches_total
        );
    }
    Ok(())
}
