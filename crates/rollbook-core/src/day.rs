//! Day-range normalisation — the sole authority for "what day is this".
//!
//! Attendance keys always store the UTC-midnight `start` instant, never the
//! raw input, so `2025-01-05T14:30:00Z` and `2025-01-05` collapse onto the
//! same record.

use chrono::{
  DateTime, Datelike as _, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc,
};

use crate::{Error, Result};

/// A half-open UTC day interval: `[start, start + 24h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl DayRange {
  /// The calendar day containing `instant`.
  pub fn of(instant: DateTime<Utc>) -> Self {
    let start = instant.date_naive().and_time(NaiveTime::MIN).and_utc();
    Self { start, end: start + Duration::days(1) }
  }

  /// Parse any supported date representation into its day range.
  ///
  /// Accepted shapes: RFC 3339 datetimes, `YYYY-MM-DD`,
  /// `YYYY-MM-DD HH:MM:SS`, and integer Unix-epoch milliseconds.
  pub fn parse(raw: &str) -> Result<Self> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
      return Ok(Self::of(dt.with_timezone(&Utc)));
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
      return Ok(Self::of(d.and_time(NaiveTime::MIN).and_utc()));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
      return Ok(Self::of(dt.and_utc()));
    }
    if let Ok(millis) = raw.parse::<i64>()
      && let Some(dt) = DateTime::from_timestamp_millis(millis)
    {
      return Ok(Self::of(dt));
    }

    Err(Error::InvalidDate(raw.to_owned()))
  }

  /// Whether `instant` falls within this day.
  pub fn contains(&self, instant: DateTime<Utc>) -> bool {
    instant >= self.start && instant < self.end
  }

  /// The Monday-aligned UTC week containing `instant`, as a half-open
  /// `[monday, monday + 7d)` interval. Weekly attendance views bucket on
  /// these boundaries.
  pub fn week_of(instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = Self::of(instant).start;
    let offset = i64::from(day.weekday().num_days_from_monday());
    let monday = day - Duration::days(offset);
    (monday, monday + Duration::days(7))
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
  }

  #[test]
  fn all_shapes_of_one_day_share_a_start() {
    let expected = midnight(2025, 1, 5);
    let millis = (expected.timestamp() * 1000 + 14 * 3_600_000).to_string();

    for input in [
      "2025-01-05",
      "2025-01-05T00:00:00Z",
      "2025-01-05T14:30:00Z",
      "2025-01-05T23:59:59+00:00",
      "2025-01-05 08:15:00",
      millis.as_str(),
    ] {
      let range = DayRange::parse(input).unwrap();
      assert_eq!(range.start, expected, "input {input:?}");
      assert_eq!(range.end, expected + Duration::days(1));
    }
  }

  #[test]
  fn offset_datetimes_normalise_to_the_utc_day() {
    // 02:00 at +05:30 is the previous UTC day.
    let range = DayRange::parse("2025-03-10T02:00:00+05:30").unwrap();
    assert_eq!(range.start, midnight(2025, 3, 9));
  }

  #[test]
  fn garbage_is_invalid_date() {
    for input in ["", "not-a-date", "2025-13-40", "05/01/2025"] {
      assert!(matches!(
        DayRange::parse(input),
        Err(Error::InvalidDate(_))
      ), "input {input:?}");
    }
  }

  #[test]
  fn weeks_start_on_monday() {
    // 2025-03-10 is a Monday.
    let monday = midnight(2025, 3, 10);
    for d in 10..17 {
      let (start, end) = DayRange::week_of(midnight(2025, 3, d));
      assert_eq!(start, monday, "day {d}");
      assert_eq!(end, monday + Duration::days(7));
    }
    // The following Monday opens a new week.
    let (start, _) = DayRange::week_of(midnight(2025, 3, 17));
    assert_eq!(start, midnight(2025, 3, 17));
  }

  #[test]
  fn contains_is_half_open() {
    let range = DayRange::parse("2025-01-05").unwrap();
    assert!(range.contains(range.start));
    assert!(range.contains(range.end - Duration::seconds(1)));
    assert!(!range.contains(range.end));
  }
}
