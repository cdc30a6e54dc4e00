use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

/// The rate table itself could not be located on a loaded page.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("rate table not found (selector `{selector}`)")]
    TableNotFound { selector: String },
}

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("blocked by {url} with HTTP {status}")]
    Blocked { url: String, status: u16 },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("navigation to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("page content requested before navigation")]
    NotLoaded,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: first column must be `Date`")]
    MissingDateColumn { path: PathBuf },

    #[error("{path}: invalid date `{value}`")]
    InvalidDate { path: PathBuf, value: String },

    #[error("{path}: invalid currency column `{value}`")]
    InvalidColumn { path: PathBuf, value: String },

    #[error("{path}: date {date} appears more than once")]
    DuplicateDate { path: PathBuf, date: NaiveDate },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid currency code `{0}` (expected three uppercase letters)")]
    InvalidCurrency(String),

    #[error("start date {start} is after end date {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("basket size must be at least 1")]
    ZeroBasketSize,

    #[error("basket for base {0} is empty")]
    EmptyBasket(String),

    #[error("invalid table selector `{0}`")]
    InvalidSelector(String),

    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
