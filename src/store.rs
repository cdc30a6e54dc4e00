use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info};

use crate::currency::CurrencyCode;
use crate::dataset::Dataset;
use crate::error::PersistenceError;

const DATE_COLUMN: &str = "Date";

/// CSV file holding the dataset for one base currency: `<dir>/to_<BASE>_rates.csv`.
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    pub fn new(data_dir: impl AsRef<Path>, base: &CurrencyCode) -> Self {
        DatasetStore {
            path: data_dir.as_ref().join(format!("to_{}_rates.csv", base)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been persisted yet.
    pub fn load(&self) -> Result<Option<Dataset>, PersistenceError> {
        if !self.path.try_exists().map_err(|e| self.io_error(e))? {
            debug!("No dataset at {:?} yet.", self.path);
            return Ok(None);
        }

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let headers = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        match headers.get(0) {
            Some(DATE_COLUMN) => {}
            _ => {
                return Err(PersistenceError::MissingDateColumn {
                    path: self.path.clone(),
                })
            }
        }

        let columns = headers
            .iter()
            .skip(1)
            .map(|h| {
                h.parse::<CurrencyCode>()
                    .map_err(|_| PersistenceError::InvalidColumn {
                        path: self.path.clone(),
                        value: h.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut dataset = Dataset::new(columns.clone());
        for record in rdr.records() {
            let record = record.map_err(|e| self.csv_error(e))?;
            let raw_date = record.get(0).unwrap_or_default();
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
                PersistenceError::InvalidDate {
                    path: self.path.clone(),
                    value: raw_date.to_string(),
                }
            })?;
            if dataset.contains_date(date) {
                return Err(PersistenceError::DuplicateDate {
                    path: self.path.clone(),
                    date,
                });
            }

            dataset.ensure_row(date);
            for (code, value) in columns.iter().zip(record.iter().skip(1)) {
                if !value.is_empty() {
                    dataset.set_cell(date, code, value.to_string());
                }
            }
        }

        debug!("Loaded {} rows from {:?}", dataset.len(), self.path);
        Ok(Some(dataset))
    }

    /// Rewrite the whole file. Goes through a sibling `.tmp` file and a rename,
    /// so a crash leaves either the previous or the new checkpoint on disk.
    pub fn save(&self, dataset: &Dataset) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let tmp_path = self.tmp_path();
        {
            let mut wtr = csv::Writer::from_path(&tmp_path).map_err(|e| self.csv_error(e))?;

            let mut header = vec![DATE_COLUMN.to_string()];
            header.extend(dataset.columns().iter().map(|c| c.to_string()));
            wtr.write_record(&header).map_err(|e| self.csv_error(e))?;

            for date in dataset.dates() {
                let mut record = vec![date.format("%Y-%m-%d").to_string()];
                if let Some(cells) = dataset.row(date) {
                    record.extend(cells.into_iter().map(|c| c.unwrap_or_default().to_string()));
                }
                wtr.write_record(&record).map_err(|e| self.csv_error(e))?;
            }
            wtr.flush().map_err(|e| self.io_error(e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))?;
        info!("Checkpoint written: {} rows to {:?}", dataset.len(), self.path);
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn csv_error(&self, source: csv::Error) -> PersistenceError {
        PersistenceError::Csv {
            path: self.path.clone(),
            source,
        }
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
