use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use log::debug;
use scraper::Html;

use crate::browser::{BrowsingContext, Page, RateTableEndpoint};
use crate::currency::Basket;
use crate::dataset::{DateResult, RateRow};
use crate::error::{FetchError, NavigationError};
use crate::extractor::RateExtractor;

pub struct BatchFetcher<C> {
    context: C,
    endpoint: RateTableEndpoint,
    extractor: RateExtractor,
    settle: Duration,
    navigation_timeout: Duration,
}

impl<C: BrowsingContext> BatchFetcher<C> {
    pub fn new(
        context: C,
        endpoint: RateTableEndpoint,
        extractor: RateExtractor,
        settle: Duration,
        navigation_timeout: Duration,
    ) -> Self {
        BatchFetcher {
            context,
            endpoint,
            extractor,
            settle,
            navigation_timeout,
        }
    }

    /// One result per input date, in input order. A failed date never affects its siblings.
    pub async fn fetch_batch(&self, basket: &Basket, dates: &[NaiveDate]) -> Vec<DateResult> {
        let fetches = dates.iter().map(|&date| async move {
            let result = self.fetch_date(basket, date).await;
            (date, result)
        });
        join_all(fetches).await
    }

    async fn fetch_date(&self, basket: &Basket, date: NaiveDate) -> Result<RateRow, FetchError> {
        let mut page = self.context.new_page().await?;
        let result = self.load_and_extract(&mut page, basket, date).await;
        page.close().await;
        result
    }

    async fn load_and_extract(
        &self,
        page: &mut C::Page,
        basket: &Basket,
        date: NaiveDate,
    ) -> Result<RateRow, FetchError> {
        let url = self.endpoint.url_for(basket.base(), date);

        match tokio::time::timeout(self.navigation_timeout, page.goto(&url)).await {
            Ok(loaded) => loaded?,
            Err(_) => {
                return Err(NavigationError::Timeout {
                    url: url.to_string(),
                    after: self.navigation_timeout,
                }
                .into())
            }
        }

        page.wait_for_timeout(self.settle).await;
        let html = page.content().await?;
        debug!("{}: {} bytes", date, html.len());

        let document = Html::parse_document(&html);
        Ok(self.extractor.extract(&document, basket, date)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::DEFAULT_TABLE_SELECTOR;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use url::Url;

    #[derive(Clone)]
    struct Response {
        delay: Duration,
        html: Option<String>,
    }

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
        completed: Mutex<Vec<String>>,
    }

    struct FakeContext {
        responses: HashMap<String, Response>,
        counters: Arc<Counters>,
    }

    struct FakePage {
        responses: HashMap<String, Response>,
        counters: Arc<Counters>,
        body: Option<String>,
    }

    #[async_trait]
    impl BrowsingContext for FakeContext {
        type Page = FakePage;

        async fn new_page(&self) -> Result<FakePage, FetchError> {
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakePage {
                responses: self.responses.clone(),
                counters: self.counters.clone(),
                body: None,
            })
        }
    }

    #[async_trait]
    impl Page for FakePage {
        async fn goto(&mut self, url: &Url) -> Result<(), FetchError> {
            let date = url
                .query_pairs()
                .find(|(k, _)| k == "date")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            let response = self.responses.get(&date).cloned().unwrap_or(Response {
                delay: Duration::ZERO,
                html: None,
            });
            tokio::time::sleep(response.delay).await;
            self.counters.completed.lock().unwrap().push(date);
            match response.html {
                Some(html) => {
                    self.body = Some(html);
                    Ok(())
                }
                None => Err(NavigationError::Status {
                    url: url.to_string(),
                    status: 502,
                }
                .into()),
            }
        }

        async fn content(&self) -> Result<String, FetchError> {
            self.body.clone().ok_or_else(|| NavigationError::NotLoaded.into())
        }

        async fn close(&mut self) {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn table(eur: &str) -> String {
        format!("<table><tr><th>EUR</th><td>Euro</td><td>{eur}</td></tr></table>")
    }

    fn fetcher(responses: Vec<(NaiveDate, Response)>, timeout: Duration) -> (BatchFetcher<FakeContext>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let context = FakeContext {
            responses: responses
                .into_iter()
                .map(|(d, r)| (d.format("%Y-%m-%d").to_string(), r))
                .collect(),
            counters: counters.clone(),
        };
        let fetcher = BatchFetcher::new(
            context,
            RateTableEndpoint::new("https://rates.test/currencytables/").unwrap(),
            RateExtractor::new(DEFAULT_TABLE_SELECTOR).unwrap(),
            Duration::ZERO,
            timeout,
        );
        (fetcher, counters)
    }

    fn basket() -> Basket {
        let code = |s: &str| s.parse::<crate::currency::CurrencyCode>().unwrap();
        Basket::new(code("USD"), [code("EUR"), code("JPY")])
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_input_order_not_completion_order() {
        let (fetcher, counters) = fetcher(
            vec![
                (ymd(1), Response { delay: Duration::from_secs(3), html: Some(table("0.91")) }),
                (ymd(2), Response { delay: Duration::from_secs(2), html: Some(table("0.92")) }),
                (ymd(3), Response { delay: Duration::from_secs(1), html: Some(table("0.93")) }),
            ],
            Duration::from_secs(30),
        );

        let results = fetcher.fetch_batch(&basket(), &[ymd(1), ymd(2), ymd(3)]).await;

        let completed = counters.completed.lock().unwrap().clone();
        assert_eq!(completed, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);

        let dates: Vec<NaiveDate> = results.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![ymd(1), ymd(2), ymd(3)]);
        let eur: Vec<Option<String>> = results
            .iter()
            .map(|(_, r)| r.as_ref().unwrap().get(&"EUR".parse().unwrap()).map(str::to_string))
            .collect();
        assert_eq!(eur, vec![Some("0.91".into()), Some("0.92".into()), Some("0.93".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_isolated_and_pages_always_closed() {
        let (fetcher, counters) = fetcher(
            vec![
                (ymd(1), Response { delay: Duration::ZERO, html: Some(table("0.91")) }),
                (ymd(2), Response { delay: Duration::ZERO, html: None }),
                (ymd(3), Response { delay: Duration::ZERO, html: Some("<p>maintenance</p>".into()) }),
                (ymd(4), Response { delay: Duration::from_secs(60), html: Some(table("0.94")) }),
            ],
            Duration::from_secs(10),
        );

        let results = fetcher
            .fetch_batch(&basket(), &[ymd(1), ymd(2), ymd(3), ymd(4)])
            .await;

        assert!(results[0].1.is_ok());
        assert!(matches!(
            results[1].1,
            Err(FetchError::Navigation(NavigationError::Status { status: 502, .. }))
        ));
        assert!(matches!(results[2].1, Err(FetchError::Extraction(_))));
        assert!(matches!(
            results[3].1,
            Err(FetchError::Navigation(NavigationError::Timeout { .. }))
        ));

        assert_eq!(counters.opened.load(Ordering::SeqCst), 4);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (fetcher, counters) = fetcher(vec![], Duration::from_secs(1));
        assert!(fetcher.fetch_batch(&basket(), &[]).await.is_empty());
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
    }
}
