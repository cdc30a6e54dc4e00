use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::currency::CurrencyCode;
use crate::error::FetchError;

/// Rates for one date, in basket order. `None` marks a currency the page did not list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRow {
    pub date: NaiveDate,
    pub cells: Vec<(CurrencyCode, Option<String>)>,
}

impl RateRow {
    pub fn get(&self, code: &CurrencyCode) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == code)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn present_count(&self) -> usize {
        self.cells.iter().filter(|(_, v)| v.is_some()).count()
    }
}

pub type DateResult = (NaiveDate, Result<RateRow, FetchError>);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<CurrencyCode>,
    rows: BTreeMap<NaiveDate, BTreeMap<CurrencyCode, String>>,
}

impl Dataset {
    pub fn new(columns: Vec<CurrencyCode>) -> Self {
        Dataset {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[CurrencyCode] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.rows.contains_key(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn cell(&self, date: NaiveDate, code: &CurrencyCode) -> Option<&str> {
        self.rows.get(&date)?.get(code).map(String::as_str)
    }

    /// A row laid out in column order, absent cells as `None`.
    pub fn row(&self, date: NaiveDate) -> Option<Vec<Option<&str>>> {
        let cells = self.rows.get(&date)?;
        Some(
            self.columns
                .iter()
                .map(|c| cells.get(c).map(String::as_str))
                .collect(),
        )
    }

    fn add_column(&mut self, code: &CurrencyCode) {
        if !self.columns.contains(code) {
            self.columns.push(code.clone());
        }
    }

    pub(crate) fn set_cell(&mut self, date: NaiveDate, code: &CurrencyCode, value: String) {
        self.add_column(code);
        self.rows.entry(date).or_default().insert(code.clone(), value);
    }

    pub(crate) fn ensure_row(&mut self, date: NaiveDate) {
        self.rows.entry(date).or_default();
    }

    /// Fold a successfully fetched row in: non-absent incoming cells win, absent ones keep what is there.
    pub fn apply(&mut self, date: NaiveDate, row: &RateRow) {
        let cells = self.rows.entry(date).or_default();
        for (code, value) in &row.cells {
            if !self.columns.contains(code) {
                self.columns.push(code.clone());
            }
            if let Some(value) = value {
                cells.insert(code.clone(), value.clone());
            }
        }
    }

    /// Reconcile a fetched batch with the persisted dataset.
    ///
    /// Failed slots are dropped before merging. The result's dates are the sorted
    /// union of both sides and its columns are the existing ones followed by any
    /// currency seen only in `incoming`.
    pub fn merge(existing: Option<Dataset>, incoming: &[DateResult]) -> Dataset {
        let mut merged = existing.unwrap_or_default();
        for (date, result) in incoming {
            if let Ok(row) = result {
                merged.apply(*date, row);
            }
        }
        merged
    }
}
