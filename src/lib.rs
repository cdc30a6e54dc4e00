pub mod batch;
pub mod browser;
pub mod config;
pub mod currency;
pub mod dataset;
pub mod delay_manager;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logger;
pub mod orchestrator;
pub mod store;

// Exporting types for convenience
pub use batch::{Batch, DateRange};
pub use browser::{BrowsingContext, HttpContext, Page, RateTableEndpoint};
pub use config::RunConfig;
pub use currency::{Basket, CurrencyCode};
pub use dataset::{Dataset, DateResult, RateRow};
pub use delay_manager::{Pacer, Shutdown, ShutdownTrigger};
pub use error::{ConfigError, ExtractionError, FetchError, NavigationError, PersistenceError, ScrapeError};
pub use extractor::RateExtractor;
pub use fetcher::BatchFetcher;
pub use orchestrator::{RunState, RunSummary, ScrapeOrchestrator};
pub use store::DatasetStore;
