//! Time Normalization
//!
//! Query bounds travel on the wire as millisecond epochs. Callers may supply
//! them as date strings (`YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`) interpreted in
//! a configured time zone, or as epoch integers in seconds (10 digits) or
//! milliseconds (13 digits).
//!
//! Raw caller input ([`TimeInput`]) is resolved once into a [`TimeValue`] and
//! then converted to milliseconds.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Time zone used for date strings when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Shanghai;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const EPOCH_SECONDS_DIGITS: u32 = 10;
const EPOCH_MILLIS_DIGITS: u32 = 13;

/// A time input that could not be normalized.
///
/// Every variant is an invalid-format failure; they differ only in the
/// reason reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// The date-time string was empty or missing.
    #[error("date-time string cannot be empty")]
    Empty,

    /// The string matched neither accepted pattern.
    #[error("invalid date-time format '{value}': {source}")]
    InvalidFormat {
        /// The offending input.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: chrono::ParseError,
    },

    /// The integer is neither a second nor a millisecond epoch.
    #[error("invalid epoch {value}: must be seconds (10 digits) or milliseconds (13 digits)")]
    InvalidEpoch {
        /// The offending input.
        value: i64,
    },

    /// The wall-clock time falls in a gap of the configured zone.
    #[error("'{value}' does not exist in time zone {timezone}")]
    NonexistentLocalTime {
        /// The offending input.
        value: String,
        /// Zone the input was interpreted in.
        timezone: Tz,
    },
}

/// Time bound as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeInput {
    /// Date or date-time string.
    Text(String),
    /// Epoch integer in seconds or milliseconds.
    Integer(i64),
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for TimeInput {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for TimeInput {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for TimeInput {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

/// Values above `i64::MAX` saturate and fail normalization as
/// [`TimeError::InvalidEpoch`].
impl From<u64> for TimeInput {
    fn from(value: u64) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Time bound after its representation has been identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    /// Wall-clock time in the normalizer's zone.
    DateString(NaiveDateTime),
    /// Seconds since the Unix epoch.
    EpochSeconds(i64),
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
}

impl TimeValue {
    /// Classify an epoch integer by its base-10 digit count.
    pub const fn from_epoch(value: i64) -> Result<Self, TimeError> {
        match digit_count(value) {
            Some(EPOCH_SECONDS_DIGITS) => Ok(Self::EpochSeconds(value)),
            Some(EPOCH_MILLIS_DIGITS) => Ok(Self::EpochMillis(value)),
            _ => Err(TimeError::InvalidEpoch { value }),
        }
    }

    /// Parse a `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` string.
    ///
    /// A date-only string resolves to midnight.
    pub fn from_date_str(value: &str) -> Result<Self, TimeError> {
        if value.is_empty() {
            return Err(TimeError::Empty);
        }

        let source = match NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT) {
            Ok(date_time) => return Ok(Self::DateString(date_time)),
            Err(e) => e,
        };

        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(|date| Self::DateString(date.and_time(NaiveTime::MIN)))
            .map_err(|_| TimeError::InvalidFormat {
                value: value.to_string(),
                source,
            })
    }
}

/// Digit count of a non-negative integer; `None` for negatives.
const fn digit_count(value: i64) -> Option<u32> {
    if value < 0 {
        return None;
    }
    match value.checked_ilog10() {
        Some(log) => Some(log + 1),
        None => Some(1),
    }
}

/// Converts caller time inputs into canonical millisecond epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeNormalizer {
    timezone: Tz,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl TimeNormalizer {
    /// Create a normalizer interpreting date strings in `timezone`.
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Zone used for date strings.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Identify the representation of a raw input.
    pub fn resolve(&self, input: &TimeInput) -> Result<TimeValue, TimeError> {
        match input {
            TimeInput::Text(value) => TimeValue::from_date_str(value),
            TimeInput::Integer(value) => TimeValue::from_epoch(*value),
        }
    }

    /// Normalize a raw input to milliseconds since the Unix epoch.
    pub fn normalize(&self, input: &TimeInput) -> Result<i64, TimeError> {
        match self.resolve(input)? {
            TimeValue::EpochMillis(millis) => Ok(millis),
            TimeValue::EpochSeconds(seconds) => Ok(seconds * 1000),
            TimeValue::DateString(naive) => self
                .timezone
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.timestamp_millis())
                .ok_or_else(|| TimeError::NonexistentLocalTime {
                    value: naive.format(DATE_TIME_FORMAT).to_string(),
                    timezone: self.timezone,
                }),
        }
    }
}

/// Normalize with the default (`Asia/Shanghai`) zone.
pub fn normalize(input: impl Into<TimeInput>) -> Result<i64, TimeError> {
    TimeNormalizer::default().normalize(&input.into())
}

/// Position of `current` within `[start, end]` as a percentage in `0..=100`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn range_progress(start: i64, end: i64, current: i64) -> f64 {
    if current <= start {
        return 0.0;
    }
    if current >= end {
        return 100.0;
    }
    let elapsed = i128::from(current) - i128::from(start);
    let span = i128::from(end) - i128::from(start);
    elapsed as f64 / span as f64 * 100.0
}
