// ISO-8601 calendar week identifiers (YYYY-Www, Monday start)
use crate::domain::errors::WeekParseError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parses an upstream timestamp into wall-clock time. Accepts RFC 3339 with an
/// offset, naive ISO date-times and bare dates (read as midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// An ISO week, stored as the Monday that starts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeek(NaiveDate);

impl IsoWeek {
    pub fn new(year: i32, week: u32) -> Option<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).map(Self)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        Self(date - Duration::days(offset))
    }

    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    /// Buckets an upstream start-time string. Offsets are ignored: the week is
    /// taken from the wall-clock date as written.
    pub fn from_timestamp(raw: &str) -> Option<Self> {
        parse_timestamp(raw).map(|dt| Self::from_date(dt.date()))
    }

    pub fn year(&self) -> i32 {
        self.0.iso_week().year()
    }

    pub fn week(&self) -> u32 {
        self.0.iso_week().week()
    }

    pub fn previous(&self) -> Self {
        Self(self.0 - Duration::weeks(1))
    }

    /// The `count` weeks ending at (and including) this one, oldest first.
    pub fn trailing(&self, count: usize) -> Vec<IsoWeek> {
        let mut weeks = Vec::with_capacity(count);
        let mut cursor = *self;
        for _ in 0..count {
            weeks.push(cursor);
            cursor = cursor.previous();
        }
        weeks.reverse();
        weeks
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year(), self.week())
    }
}

impl FromStr for IsoWeek {
    type Err = WeekParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || WeekParseError {
            input: s.to_string(),
        };
        let (year, week) = s.split_once("-W").ok_or_else(err)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || week.len() != 2 || !all_digits(year) || !all_digits(week) {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let week: u32 = week.parse().map_err(|_| err())?;
        IsoWeek::new(year, week).ok_or_else(err)
    }
}

impl Serialize for IsoWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IsoWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_start_times_into_iso_weeks() {
        let w23 = IsoWeek::from_timestamp("2024-06-03T10:00:00").unwrap();
        assert_eq!(w23.to_string(), "2024-W23");

        let w22 = IsoWeek::from_timestamp("2024-05-27T10:00:00").unwrap();
        assert_eq!(w22.to_string(), "2024-W22");

        // Sunday still belongs to the week that started on Monday
        let sunday = IsoWeek::from_timestamp("2024-06-09T23:59:59").unwrap();
        assert_eq!(sunday, w23);
    }

    #[test]
    fn test_accepts_offsets_and_plain_dates() {
        assert_eq!(
            IsoWeek::from_timestamp("2024-06-03T10:00:00+02:00").unwrap().to_string(),
            "2024-W23"
        );
        assert_eq!(
            IsoWeek::from_timestamp("2024-06-03T10:00:00.123Z").unwrap().to_string(),
            "2024-W23"
        );
        assert_eq!(IsoWeek::from_timestamp("2024-06-03").unwrap().to_string(), "2024-W23");
        assert!(IsoWeek::from_timestamp("yesterday").is_none());
        assert!(IsoWeek::from_timestamp("   ").is_none());
    }

    #[test]
    fn test_year_boundary_uses_iso_year() {
        // 2024-12-30 is the Monday of 2025-W01
        let week = IsoWeek::from_timestamp("2024-12-31T08:00:00").unwrap();
        assert_eq!(week.to_string(), "2025-W01");
        assert_eq!(week.year(), 2025);
        assert_eq!(week.previous().to_string(), "2024-W52");
    }

    #[test]
    fn test_parse_round_trips_display() {
        let week: IsoWeek = "2024-W23".parse().unwrap();
        assert_eq!(week.year(), 2024);
        assert_eq!(week.week(), 23);
        assert_eq!(IsoWeek::from_date(NaiveDate::from_ymd_opt(2024, 6, 5).unwrap()), week);
    }

    #[test]
    fn test_parse_rejects_malformed_weeks() {
        for input in ["2024-23", "2024-W3", "24-W23", "2024-W54", "2024-Wab", "", "2024-W023"] {
            assert!(input.parse::<IsoWeek>().is_err(), "{input} should be rejected");
        }
        // 2020 has 53 weeks, 2021 does not
        assert!("2020-W53".parse::<IsoWeek>().is_ok());
        assert!("2021-W53".parse::<IsoWeek>().is_err());
    }

    #[test]
    fn test_trailing_weeks_are_oldest_first() {
        let week: IsoWeek = "2024-W02".parse().unwrap();
        let labels: Vec<String> = week.trailing(3).iter().map(|w| w.to_string()).collect();
        assert_eq!(labels, vec!["2023-W52", "2024-W01", "2024-W02"]);
        assert!(week.trailing(0).is_empty());
    }

    #[test]
    fn test_serializes_as_label() {
        let week: IsoWeek = "2024-W23".parse().unwrap();
        assert_eq!(serde_json::to_string(&week).unwrap(), "\"2024-W23\"");
        let back: IsoWeek = serde_json::from_str("\"2024-W23\"").unwrap();
        assert_eq!(back, week);
    }
}
