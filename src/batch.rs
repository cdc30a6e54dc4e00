use chrono::NaiveDate;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub dates: Vec<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::EmptyRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    /// Split into batches of `size` days; only the last one may be shorter.
    pub fn batches(&self, size: usize) -> Result<Vec<Batch>, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        let days: Vec<NaiveDate> = self.days().collect();
        Ok(days
            .chunks(size)
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                dates: chunk.to_vec(),
            })
            .collect())
    }
}

impl Batch {
    pub fn first(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_25_days_in_batches_of_10() {
        let range = DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 25)).unwrap();
        let batches = range.batches(10).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(batches[0].first(), Some(ymd(2024, 1, 1)));
        assert_eq!(batches[0].last(), Some(ymd(2024, 1, 10)));
        assert_eq!(batches[1].first(), Some(ymd(2024, 1, 11)));
        assert_eq!(batches[2].last(), Some(ymd(2024, 1, 25)));
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(ymd(2024, 2, 29), ymd(2024, 2, 29)).unwrap();
        assert_eq!(range.day_count(), 1);
        let batches = range.batches(10).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].dates, vec![ymd(2024, 2, 29)]);
    }

    #[test]
    fn test_range_crosses_year_boundary() {
        let range = DateRange::new(ymd(2023, 12, 30), ymd(2024, 1, 2)).unwrap();
        let days: Vec<NaiveDate> = range.days().collect();
        assert_eq!(days, vec![ymd(2023, 12, 30), ymd(2023, 12, 31), ymd(2024, 1, 1), ymd(2024, 1, 2)]);
    }

    #[test]
    fn test_rejects_inverted_range_and_zero_batch() {
        assert!(matches!(
            DateRange::new(ymd(2024, 1, 2), ymd(2024, 1, 1)),
            Err(ConfigError::EmptyRange { .. })
        ));
        let range = DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 2)).unwrap();
        assert!(matches!(range.batches(0), Err(ConfigError::ZeroBatchSize)));
    }

    proptest! {
        #[test]
        fn prop_batches_cover_range_without_gaps(offset in 0i64..2000, span in 0i64..400, size in 1usize..40) {
            let start = ymd(2018, 1, 1) + chrono::Duration::days(offset);
            let end = start + chrono::Duration::days(span);
            let range = DateRange::new(start, end).unwrap();
            let batches = range.batches(size).unwrap();

            let flat: Vec<NaiveDate> = batches.iter().flat_map(|b| b.dates.iter().copied()).collect();
            let expected: Vec<NaiveDate> = range.days().collect();
            prop_assert_eq!(flat, expected);

            for (i, batch) in batches.iter().enumerate() {
                prop_assert_eq!(batch.index, i);
                if i + 1 < batches.len() {
                    prop_assert_eq!(batch.len(), size);
                } else {
                    prop_assert!(batch.len() >= 1 && batch.len() <= size);
                }
            }
        }
    }
}
