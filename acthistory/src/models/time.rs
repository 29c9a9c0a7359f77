use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Activity start time of an act, in whichever representation the store
/// produced it.
///
/// Naive values carry no zone and are interpreted as UTC so that comparisons
/// between acts are stable regardless of where the traversal runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivityTime {
    Instant(DateTime<Utc>),
    Local(NaiveDateTime),
    Date(NaiveDate),
    EpochMillis(i64),
    Text(String),
}

impl ActivityTime {
    /// Convert to a UTC instant. Returns `None` when the value cannot be
    /// interpreted as a point in time.
    pub fn normalize(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(instant) => Some(*instant),
            Self::Local(naive) => Some(Utc.from_utc_datetime(naive)),
            Self::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive)),
            Self::EpochMillis(millis) => Utc.timestamp_millis_opt(*millis).single(),
            Self::Text(text) => parse_text(text),
        }
    }

    /// The calendar date of the normalised instant.
    pub fn date(&self) -> Option<NaiveDate> {
        self.normalize().map(|instant| instant.date_naive())
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl From<DateTime<Utc>> for ActivityTime {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Instant(instant)
    }
}

impl From<NaiveDateTime> for ActivityTime {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Local(naive)
    }
}

impl From<NaiveDate> for ActivityTime {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}
