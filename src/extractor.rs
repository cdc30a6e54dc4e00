use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use crate::currency::Basket;
use crate::dataset::RateRow;
use crate::error::{ConfigError, ExtractionError};

pub const DEFAULT_TABLE_SELECTOR: &str = "table";

/// Pulls one [`RateRow`] out of a rendered currency-table page.
pub struct RateExtractor {
    table_selector: String,
    table: Selector,
    row: Selector,
    header: Selector,
    cell: Selector,
}

impl RateExtractor {
    pub fn new(table_selector: &str) -> Result<Self, ConfigError> {
        let parse = |s: &str| {
            Selector::parse(s).map_err(|_| ConfigError::InvalidSelector(s.to_string()))
        };
        Ok(RateExtractor {
            table_selector: table_selector.to_string(),
            table: parse(table_selector)?,
            row: parse("tr")?,
            header: parse("th")?,
            cell: parse("td")?,
        })
    }

    /// Read the rate of each basket currency against the basket's base.
    ///
    /// The page must already show the table for `(basket.base(), date)`. A currency
    /// with no matching row, or a row with no usable data cell, comes back as `None`.
    /// Only a missing table is an error.
    pub fn extract(
        &self,
        document: &Html,
        basket: &Basket,
        date: NaiveDate,
    ) -> Result<RateRow, ExtractionError> {
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ExtractionError::TableNotFound {
                selector: self.table_selector.clone(),
            })?;

        let cells = basket
            .currencies()
            .iter()
            .map(|code| (code.clone(), self.rate_for(table, code.as_str())))
            .collect();

        Ok(RateRow { date, cells })
    }

    fn rate_for(&self, table: ElementRef<'_>, code: &str) -> Option<String> {
        let row = table.select(&self.row).find(|row| {
            row.select(&self.header)
                .any(|th| element_text(th) == code)
        })?;

        // Several representations per row; the last column is the one quoted against the base.
        let last = row.select(&self.cell).last()?;
        let rate = element_text(last);
        if rate.is_empty() {
            None
        } else {
            Some(rate)
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
