use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Acquisition window given on the command line, both bounds at UTC midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_utc_date(start)?;
        let end = parse_utc_date(end)?;
        Self::new(start, end)
    }

    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::DateOrder {
                start: rfc3339(&start),
                end: rfc3339(&end),
            });
        }
        Ok(Self { start, end })
    }

    /// Lower bound as expected by the `gte` field of a date range filter.
    pub fn gte(&self) -> String {
        rfc3339(&self.start)
    }

    /// Upper bound as expected by the `lte` field of a date range filter.
    pub fn lte(&self) -> String {
        rfc3339(&self.end)
    }
}

fn parse_utc_date(date: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidDate(date.to_string()))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::InvalidDate(date.to_string()))?;
    Ok(midnight.and_utc())
}

fn rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3339_bounds() {
        let range = TimeRange::parse("2020-08-01", "2021-09-12").unwrap();
        assert_eq!(range.gte(), "2020-08-01T00:00:00Z");
        assert_eq!(range.lte(), "2021-09-12T00:00:00Z");
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let err = TimeRange::parse("2021-09-12", "2020-08-01").unwrap_err();
        assert!(matches!(err, Error::DateOrder { .. }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_same_day_is_rejected() {
        let err = TimeRange::parse("2021-09-12", "2021-09-12").unwrap_err();
        assert!(matches!(err, Error::DateOrder { .. }));
    }

    #[test]
    fn test_malformed_dates() {
        for bad in ["2021-13-01", "12-09-2021", "2021/09/12", "", "yesterday"] {
            let err = TimeRange::parse(bad, "2022-01-01").unwrap_err();
            assert!(matches!(err, Error::InvalidDate(ref d) if d == bad), "{bad}");
        }
    }
}
