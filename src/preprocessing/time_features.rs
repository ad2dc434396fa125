//! Calendar features derived from the activity timestamps
//!
//! Parsing is best effort: a value no format accepts becomes a null
//! timestamp. Missing calendar features are filled with seeded placeholders
//! and reported as such, so callers can tell real values from invented ones.

use crate::error::{PredictorError, Result};
use crate::provenance::FieldSource;
use super::{columns, MissingColumnPolicy};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

/// Canonical text form written back to the log
const NORMALIZED_DATETIME: &str = "%Y-%m-%d %H:%M:%S";
const NORMALIZED_DATE: &str = "%Y-%m-%d";
const NORMALIZED_TIME: &str = "%H:%M:%S";

/// A parsed `Date` cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub datetime: NaiveDateTime,
    /// The source text carried a time of day
    pub has_time: bool,
}

impl Timestamp {
    /// 0 = Monday .. 6 = Sunday
    pub fn day_of_week(&self) -> i64 {
        self.datetime.weekday().num_days_from_monday() as i64
    }

    pub fn hour(&self) -> Option<i64> {
        self.has_time.then(|| self.datetime.hour() as i64)
    }

    fn normalized(&self) -> String {
        let format = if self.has_time { NORMALIZED_DATETIME } else { NORMALIZED_DATE };
        self.datetime.format(format).to_string()
    }
}

/// Parse a date or date-time in any supported format
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Timestamp { datetime: dt.naive_local(), has_time: true });
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|datetime| Timestamp { datetime, has_time: true })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|datetime| Timestamp { datetime, has_time: false })
        })
}

/// Parse a time of day, accepting full date-times as well
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let s = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
        .or_else(|| parse_timestamp(s).filter(|t| t.has_time).map(|t| t.datetime.time()))
}

/// "Weekday" for Monday..Friday, "Weekend" otherwise
pub fn week_flag(day_of_week: i64) -> &'static str {
    if day_of_week < 5 {
        columns::WEEKDAY
    } else {
        columns::WEEKEND
    }
}

/// Outcome of timestamp normalization and feature extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeFeatureSummary {
    /// Non-empty timestamp cells no format accepted
    pub unparseable_timestamps: usize,
    pub day_of_week: FieldSource,
    pub week_flag: FieldSource,
    pub hour: FieldSource,
}

/// Derives `DayOfWeek`, `Week(day/end)` and `Hour`
#[derive(Debug, Clone)]
pub struct TimeFeatureExtractor {
    random_state: u64,
    policy: MissingColumnPolicy,
}

impl TimeFeatureExtractor {
    pub fn new(random_state: u64, policy: MissingColumnPolicy) -> Self {
        Self { random_state, policy }
    }

    /// Rewrite `Date` and `Time` in canonical form; invalid cells become null
    pub fn normalize_timestamps(&self, df: &DataFrame) -> Result<(DataFrame, usize)> {
        let mut result = df.clone();
        let mut unparseable = 0usize;

        if let Some(raw) = text_column(df, columns::DATE)? {
            let normalized: StringChunked = raw
                .iter()
                .map(|cell| {
                    let cell = cell.as_deref()?;
                    let parsed = parse_timestamp(cell);
                    if parsed.is_none() && !cell.trim().is_empty() {
                        unparseable += 1;
                    }
                    parsed.map(|t| t.normalized())
                })
                .collect();
            result.with_column(normalized.with_name(columns::DATE.into()).into_series())?;
        }

        if let Some(raw) = text_column(df, columns::TIME)? {
            let normalized: StringChunked = raw
                .iter()
                .map(|cell| {
                    let cell = cell.as_deref()?;
                    let parsed = parse_time_of_day(cell);
                    if parsed.is_none() && !cell.trim().is_empty() {
                        unparseable += 1;
                    }
                    parsed.map(|t| t.format(NORMALIZED_TIME).to_string())
                })
                .collect();
            result.with_column(normalized.with_name(columns::TIME.into()).into_series())?;
        }

        if unparseable > 0 {
            warn!(cells = unparseable, "unparseable timestamps set to null");
        }
        Ok((result, unparseable))
    }

    /// Add the calendar feature columns
    pub fn extract(&self, df: &DataFrame) -> Result<(DataFrame, TimeFeatureSummary)> {
        let n = df.height();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut summary = TimeFeatureSummary::default();

        let dates: Option<Vec<Option<Timestamp>>> = text_column(df, columns::DATE)?.map(|cells| {
            cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_timestamp))
                .collect()
        });
        let has_dates = dates
            .as_ref()
            .map_or(false, |d| d.iter().any(Option::is_some));

        let existing_dow = int_column(df, columns::DAY_OF_WEEK)?;
        let existing_flag = text_column(df, columns::WEEK_FLAG)?;

        if !has_dates
            && self.policy == MissingColumnPolicy::Reject
            && (existing_dow.is_none() || existing_flag.is_none())
        {
            return Err(PredictorError::SchemaError(
                "no parseable Date column and no DayOfWeek/Week(day/end) columns".to_string(),
            ));
        }

        let mut day_of_week = Vec::with_capacity(n);
        let mut flags = Vec::with_capacity(n);
        let (mut dow_filled, mut flag_filled) = (0usize, 0usize);

        for i in 0..n {
            let observed = dates.as_ref().and_then(|d| d[i]);
            match observed {
                Some(ts) => {
                    let dow = ts.day_of_week();
                    day_of_week.push(dow);
                    flags.push(week_flag(dow).to_string());
                }
                None => {
                    let prior_dow = existing_dow
                        .as_ref()
                        .and_then(|v| v[i])
                        .filter(|d| (0..7).contains(d));
                    let dow = match prior_dow {
                        Some(d) => d,
                        None => {
                            dow_filled += 1;
                            rng.gen_range(0..7)
                        }
                    };

                    let prior_flag = existing_flag
                        .as_ref()
                        .and_then(|v| v[i].clone())
                        .filter(|f| f == columns::WEEKDAY || f == columns::WEEKEND);
                    let flag = match prior_flag {
                        Some(f) => f,
                        None => {
                            flag_filled += 1;
                            if rng.gen_bool(0.5) { columns::WEEKDAY } else { columns::WEEKEND }.to_string()
                        }
                    };

                    day_of_week.push(dow);
                    flags.push(flag);
                }
            }
        }

        summary.day_of_week = FieldSource::from_counts(n, dow_filled);
        summary.week_flag = FieldSource::from_counts(n, flag_filled);
        if dow_filled > 0 || flag_filled > 0 {
            warn!(
                day_of_week = dow_filled,
                week_flag = flag_filled,
                "filled calendar features with random placeholders"
            );
        }

        let mut result = df.clone();
        result.with_column(Series::new(columns::DAY_OF_WEEK.into(), day_of_week))?;
        result.with_column(Series::new(columns::WEEK_FLAG.into(), flags))?;

        if let Some(hours) = self.derive_hours(df, dates.as_deref())? {
            let missing = hours.iter().filter(|h| h.is_none()).count();
            summary.hour = FieldSource::from_counts(n, missing);
            let ca: Int64Chunked = hours.into_iter().collect();
            result.with_column(ca.with_name(columns::HOUR.into()).into_series())?;
        } else if df.column(columns::HOUR).is_ok() {
            summary.hour = FieldSource::Observed;
        } else {
            summary.hour = FieldSource::Absent;
        }

        debug!(?summary, "extracted time features");
        Ok((result, summary))
    }

    /// Hour of day from `Time`, or from `Date` when it carries a time
    fn derive_hours(
        &self,
        df: &DataFrame,
        dates: Option<&[Option<Timestamp>]>,
    ) -> Result<Option<Vec<Option<i64>>>> {
        if let Some(times) = text_column(df, columns::TIME)? {
            let hours = times
                .iter()
                .map(|t| t.as_deref().and_then(parse_time_of_day).map(|t| t.hour() as i64))
                .collect();
            return Ok(Some(hours));
        }

        Ok(dates.map(|d| d.iter().map(|ts| ts.and_then(|t| t.hour())).collect()))
    }
}

/// A column read as text, `None` when absent
fn text_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let as_text = column.as_materialized_series().cast(&DataType::String)?;
    Ok(Some(
        as_text.str()?.into_iter().map(|v| v.map(str::to_string)).collect(),
    ))
}

/// A column read as integers, `None` when absent; non-numeric text becomes null
fn int_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<i64>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let casted = column.as_materialized_series().cast(&DataType::Int64)?;
    Ok(Some(casted.i64()?.into_iter().collect()))
}
