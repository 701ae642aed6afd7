use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    SecondsFormat, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::DEFAULT_REFERENCE_TIMEZONE;
use crate::error::{ConfigError, TimestampFormatError};

/// Rendering used by eJP screens and some exported fields
pub const DISPLAY_FORMAT: &str = "%d %b %y  %H:%M:%S";

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    // Two-digit years first: `%Y` would also accept "18" as year 18
    "%d %b %y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%d %b %y %H:%M",
    "%d %b %Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %b %y", "%d %b %Y", "%m/%d/%Y"];

/// Parses the date representations found in eJP exports and renders them as
/// canonical UTC instants. Inputs without an offset are read as wall-clock
/// time in the reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampNormalizer {
    reference_timezone: Tz,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self {
            reference_timezone: chrono_tz::US::Eastern,
        }
    }
}

impl TimestampNormalizer {
    pub fn new(reference_timezone: Tz) -> Self {
        Self { reference_timezone }
    }

    pub fn from_timezone_name(name: &str) -> Result<Self, ConfigError> {
        let name = name.trim();
        let name = if name.is_empty() {
            DEFAULT_REFERENCE_TIMEZONE
        } else {
            name
        };
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| ConfigError::Timezone(name.to_string()))
    }

    pub fn reference_timezone(&self) -> Tz {
        self.reference_timezone
    }

    /// Blank input yields `None`; anything else must match a known format.
    pub fn parse_timestamp(
        &self,
        value: &str,
    ) -> Result<Option<DateTime<Utc>>, TimestampFormatError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Some(dt.with_timezone(&Utc)));
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
        }

        // A trailing `Z` on an otherwise naive body means UTC
        if let Some(body) = trimmed
            .strip_suffix('Z')
            .or_else(|| trimmed.strip_suffix('z'))
        {
            if let Some(naive) = parse_naive(body) {
                return Ok(Some(Utc.from_utc_datetime(&naive)));
            }
        }

        let cleaned = clean_display_text(trimmed);
        match parse_naive(&cleaned) {
            Some(naive) => self
                .localize(naive)
                .map(Some)
                .ok_or_else(|| TimestampFormatError::new(value)),
            None => Err(TimestampFormatError::new(value)),
        }
    }

    /// Canonical ISO-8601 UTC with a literal `Z`, or `None` for blank input
    pub fn format_to_iso_timestamp(
        &self,
        value: Option<&str>,
    ) -> Result<Option<String>, TimestampFormatError> {
        let Some(value) = value else {
            return Ok(None);
        };
        Ok(self.parse_timestamp(value)?.map(|dt| to_iso_string(&dt)))
    }

    pub fn to_display_format(&self, instant: &DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.reference_timezone)
            .format(DISPLAY_FORMAT)
            .to_string()
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.reference_timezone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            // Repeated wall-clock hour: take the standard-time reading
            LocalResult::Ambiguous(_, latest) => Some(latest.with_timezone(&Utc)),
            // Skipped wall-clock hour: keep the offset in force just before the jump
            LocalResult::None => {
                let before = self
                    .reference_timezone
                    .from_local_datetime(&(naive - Duration::hours(1)))
                    .earliest()?;
                let offset: FixedOffset = before.offset().fix();
                offset
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }
}

/// Whole seconds, or six fractional digits when the instant has any
pub fn to_iso_string(instant: &DateTime<Utc>) -> String {
    let format = if instant.nanosecond() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    instant.to_rfc3339_opts(format, true)
}

/// Parses a value previously produced by [`to_iso_string`]
pub fn parse_canonical(value: &str) -> Option<DateTime<Utc>> {
    if !value.ends_with('Z') {
        return None;
    }
    let dt = DateTime::parse_from_rfc3339(value).ok()?.with_timezone(&Utc);
    (to_iso_string(&dt) == value).then_some(dt)
}

pub fn is_canonical_timestamp(value: &str) -> bool {
    parse_canonical(value).is_some()
}

fn clean_display_text(value: &str) -> String {
    let collapsed = WHITESPACE.replace_all(value, " ");
    ORDINAL_SUFFIX.replace_all(&collapsed, "$1").into_owned()
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}
