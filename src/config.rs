use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::batch::DateRange;
use crate::browser::{RateTableEndpoint, DEFAULT_ENDPOINT};
use crate::currency::{Basket, CurrencyCode};
use crate::error::ConfigError;
use crate::extractor::{RateExtractor, DEFAULT_TABLE_SELECTOR};

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_currency: CurrencyCode,
    /// How many entries of the top-currency list make up the basket (base removed afterwards).
    pub basket_size: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub batch_size: usize,
    pub pacing: Duration,
    pub pacing_jitter: Duration,
    pub settle: Duration,
    pub navigation_timeout: Duration,
    /// Extra fetch rounds for dates that failed within a batch.
    pub retries: u32,
    pub data_dir: PathBuf,
    pub endpoint: String,
    pub table_selector: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            base_currency: CurrencyCode::usd(),
            basket_size: 20,
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).expect("valid default start date"),
            end_date: NaiveDate::from_ymd_opt(2024, 8, 31).expect("valid default end date"),
            batch_size: 10,
            pacing: Duration::from_secs(60),
            pacing_jitter: Duration::ZERO,
            settle: Duration::from_millis(5000),
            navigation_timeout: Duration::from_secs(30),
            retries: 0,
            data_dir: PathBuf::from("data"),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            table_selector: DEFAULT_TABLE_SELECTOR.to_string(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.basket_size == 0 {
            return Err(ConfigError::ZeroBasketSize);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.basket().is_empty() {
            return Err(ConfigError::EmptyBasket(self.base_currency.to_string()));
        }
        self.date_range()?;
        self.endpoint()?;
        self.extractor()?;
        Ok(())
    }

    pub fn basket(&self) -> Basket {
        Basket::top(self.basket_size, self.base_currency.clone())
    }

    pub fn date_range(&self) -> Result<DateRange, ConfigError> {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn endpoint(&self) -> Result<RateTableEndpoint, ConfigError> {
        RateTableEndpoint::new(&self.endpoint)
    }

    pub fn extractor(&self) -> Result<RateExtractor, ConfigError> {
        RateExtractor::new(&self.table_selector)
    }
}
