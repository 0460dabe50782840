//! FILENAME: trend-engine/src/time_key.rs
//! Time bucketing - maps inspection dates to period keys.
//!
//! Each granularity is a `TimeKeyExtractor` strategy with the same contract:
//! key a date, label a key, order keys. The rest of the pipeline never looks
//! at dates directly, which is what makes it granularity-agnostic.
//!
//! Week keys use the ISO week-year, not the calendar year of the date:
//! 2024-12-30 is a Monday in ISO week 1 of 2025 and keys as `2025-W01`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Weekday};
use qc_model::InspectionRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// GRANULARITY
// ============================================================================

/// The time-bucketing resolution of a trend report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Day
    }
}

impl Granularity {
    /// Adjective used in report titles and file names ("Daily", "Weekly", ...).
    pub fn display_name(&self) -> &'static str {
        match self {
            Granularity::Day => "Daily",
            Granularity::Week => "Weekly",
            Granularity::Month => "Monthly",
            Granularity::Year => "Yearly",
        }
    }

    /// The bucketing strategy for this granularity.
    pub fn extractor(&self) -> &'static dyn TimeKeyExtractor {
        match self {
            Granularity::Day => &DayBuckets,
            Granularity::Week => &WeekBuckets,
            Granularity::Month => &MonthBuckets,
            Granularity::Year => &YearBuckets,
        }
    }
}

// ============================================================================
// TIME KEY
// ============================================================================

/// A bucket key. Keys of one granularity order chronologically; a report
/// never mixes granularities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TimeKey {
    Day(NaiveDate),
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Year(i32),
}

impl TimeKey {
    /// First calendar day covered by the bucket.
    pub fn start_date(&self) -> Option<NaiveDate> {
        match *self {
            TimeKey::Day(date) => Some(date),
            TimeKey::Week { year, week } => NaiveDate::from_isoywd_opt(year, week, Weekday::Mon),
            TimeKey::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1),
            TimeKey::Year(year) => NaiveDate::from_ymd_opt(year, 1, 1),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            TimeKey::Day(_) => Granularity::Day,
            TimeKey::Week { .. } => Granularity::Week,
            TimeKey::Month { .. } => Granularity::Month,
            TimeKey::Year(_) => Granularity::Year,
        }
    }

    /// Human-readable column header.
    pub fn label(&self) -> String {
        match *self {
            TimeKey::Day(date) => date.format("%m/%d/%Y").to_string(),
            TimeKey::Week { year, week } => match self.start_date() {
                Some(monday) => {
                    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(monday);
                    format!(
                        "W{:02} '{:02} ({} - {})",
                        week,
                        year.rem_euclid(100),
                        monday.format("%b %d"),
                        sunday.format("%b %d")
                    )
                }
                None => self.to_string(),
            },
            TimeKey::Month { .. } => match self.start_date() {
                Some(first) => first.format("%b %Y").to_string(),
                None => self.to_string(),
            },
            TimeKey::Year(year) => year.to_string(),
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            TimeKey::Week { year, week } => write!(f, "{:04}-W{:02}", year, week),
            TimeKey::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            TimeKey::Year(year) => write!(f, "{:04}", year),
        }
    }
}

/// Error returned when a string is not a valid bucket key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeKeyParseError(pub String);

impl fmt::Display for TimeKeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time key: {:?}", self.0)
    }
}

impl std::error::Error for TimeKeyParseError {}

impl FromStr for TimeKey {
    type Err = TimeKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || TimeKeyParseError(s.to_string());

        if let Some((year, week)) = s.split_once("-W") {
            let year: i32 = year.parse().map_err(|_| err())?;
            let week: u32 = week.parse().map_err(|_| err())?;
            return NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
                .map(|_| TimeKey::Week { year, week })
                .ok_or_else(err);
        }

        match s.len() {
            10 => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(TimeKey::Day)
                .map_err(|_| err()),
            7 => {
                let (year, month) = s.split_once('-').ok_or_else(err)?;
                let year: i32 = year.parse().map_err(|_| err())?;
                let month: u32 = month.parse().map_err(|_| err())?;
                if (1..=12).contains(&month) {
                    Ok(TimeKey::Month { year, month })
                } else {
                    Err(err())
                }
            }
            4 if s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().map(TimeKey::Year).map_err(|_| err())
            }
            _ => Err(err()),
        }
    }
}

impl From<TimeKey> for String {
    fn from(key: TimeKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for TimeKey {
    type Error = TimeKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ============================================================================
// TIMESTAMP PARSING
// ============================================================================

/// Parses the inspection date spellings the API sends: `YYYY-MM-DD`,
/// ISO/RFC 3339 date-times (the date part is used) and `DD/MM/YYYY`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    // Date-times without an offset ("2024-03-01T08:15:00", "2024-03-01 08:15")
    if let (Some(date_part), Some(sep)) = (raw.get(..10), raw.as_bytes().get(10)) {
        if *sep == b'T' || *sep == b' ' {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

// ============================================================================
// EXTRACTOR STRATEGIES
// ============================================================================

/// Bucketing strategy for one granularity.
pub trait TimeKeyExtractor: Send + Sync {
    fn granularity(&self) -> Granularity;

    /// Bucket key for a calendar date.
    fn key_for_date(&self, date: NaiveDate) -> TimeKey;

    /// Bucket key for a raw timestamp; `None` when it cannot be parsed.
    fn key_of(&self, timestamp: &str) -> Option<TimeKey> {
        parse_timestamp(timestamp).map(|date| self.key_for_date(date))
    }

    /// Bucket key for a record.
    fn record_key(&self, record: &InspectionRecord) -> Option<TimeKey> {
        record.timestamp.as_deref().and_then(|ts| self.key_of(ts))
    }

    fn label_of(&self, key: &TimeKey) -> String {
        key.label()
    }

    /// Chronological comparison of two keys of this granularity.
    fn compare(&self, a: &TimeKey, b: &TimeKey) -> Ordering {
        a.cmp(b)
    }
}

pub struct DayBuckets;
pub struct WeekBuckets;
pub struct MonthBuckets;
pub struct YearBuckets;

impl TimeKeyExtractor for DayBuckets {
    fn granularity(&self) -> Granularity {
        Granularity::Day
    }

    fn key_for_date(&self, date: NaiveDate) -> TimeKey {
        TimeKey::Day(date)
    }
}

impl TimeKeyExtractor for WeekBuckets {
    fn granularity(&self) -> Granularity {
        Granularity::Week
    }

    fn key_for_date(&self, date: NaiveDate) -> TimeKey {
        let iso = date.iso_week();
        TimeKey::Week {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// The weekly endpoint may pre-bucket records with a `weekKey`.
    fn record_key(&self, record: &InspectionRecord) -> Option<TimeKey> {
        let precomputed = record
            .week_key
            .as_deref()
            .and_then(|key| key.parse::<TimeKey>().ok())
            .filter(|key| key.granularity() == Granularity::Week);

        precomputed.or_else(|| record.timestamp.as_deref().and_then(|ts| self.key_of(ts)))
    }
}

impl TimeKeyExtractor for MonthBuckets {
    fn granularity(&self) -> Granularity {
        Granularity::Month
    }

    fn key_for_date(&self, date: NaiveDate) -> TimeKey {
        TimeKey::Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl TimeKeyExtractor for YearBuckets {
    fn granularity(&self) -> Granularity {
        Granularity::Year
    }

    fn key_for_date(&self, date: NaiveDate) -> TimeKey {
        TimeKey::Year(date.year())
    }
}

// ============================================================================
// DEFAULT DATE WINDOWS
// ============================================================================

/// Default report window for a granularity, ending at `today`.
///
/// - Day: the last 30 days.
/// - Week: four ISO weeks, Monday three weeks back through this week's Sunday.
/// - Month: the first of the month twelve months back through today.
/// - Year: 1 January four years back through today.
pub fn default_window(granularity: Granularity, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match granularity {
        Granularity::Day => (
            today.checked_sub_days(Days::new(30)).unwrap_or(today),
            today,
        ),
        Granularity::Week => {
            let to_sunday = 6 - today.weekday().num_days_from_monday() as u64;
            let sunday = today.checked_add_days(Days::new(to_sunday)).unwrap_or(today);
            let monday = sunday.checked_sub_days(Days::new(27)).unwrap_or(today);
            (monday, sunday)
        }
        Granularity::Month => {
            let start = today
                .with_day(1)
                .and_then(|first| first.checked_sub_months(Months::new(12)))
                .unwrap_or(today);
            (start, today)
        }
        Granularity::Year => {
            let start = NaiveDate::from_ymd_opt(today.year() - 4, 1, 1).unwrap_or(today);
            (start, today)
        }
    }
}
