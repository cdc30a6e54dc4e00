use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use url::Url;

use crate::currency::CurrencyCode;
use crate::error::{ConfigError, FetchError, NavigationError};

pub const DEFAULT_ENDPOINT: &str = "https://www.xe.com/en-gb/currencytables/";

#[async_trait]
pub trait BrowsingContext: Send + Sync {
    type Page: Page;

    async fn new_page(&self) -> Result<Self::Page, FetchError>;
}

#[async_trait]
pub trait Page: Send {
    async fn goto(&mut self, url: &Url) -> Result<(), FetchError>;

    async fn wait_for_timeout(&mut self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    async fn content(&self) -> Result<String, FetchError>;

    async fn close(&mut self);
}

/// Builds the per-date table URL: `<endpoint>?from=<BASE>&date=<YYYY-MM-DD>`.
#[derive(Debug, Clone)]
pub struct RateTableEndpoint {
    base_url: Url,
}

impl RateTableEndpoint {
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let base_url =
            Url::parse(endpoint).map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(RateTableEndpoint { base_url })
    }

    pub fn url_for(&self, base: &CurrencyCode, date: NaiveDate) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("from", base.as_str())
            .append_pair("date", &date.format("%Y-%m-%d").to_string());
        url
    }
}

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
}

// One client, so one cookie jar, for every page.
pub struct HttpContext {
    client: Client,
}

impl HttpContext {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.9"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(HttpContext { client })
    }
}

#[async_trait]
impl BrowsingContext for HttpContext {
    type Page = HttpPage;

    async fn new_page(&self) -> Result<HttpPage, FetchError> {
        Ok(HttpPage {
            client: self.client.clone(),
            user_agent: random_user_agent(),
            body: None,
        })
    }
}

pub struct HttpPage {
    client: Client,
    user_agent: &'static str,
    body: Option<String>,
}

#[async_trait]
impl Page for HttpPage {
    async fn goto(&mut self, url: &Url) -> Result<(), FetchError> {
        debug!("GET {}", url);
        let request_error = |source| NavigationError::Request {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.user_agent)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            return Err(NavigationError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(NavigationError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        self.body = Some(resp.text().await.map_err(request_error)?);
        Ok(())
    }

    async fn content(&self) -> Result<String, FetchError> {
        self.body.clone().ok_or_else(|| NavigationError::NotLoaded.into())
    }

    async fn close(&mut self) {
        self.body = None;
    }
}
