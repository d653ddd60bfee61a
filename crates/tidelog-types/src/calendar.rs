//! Day and minute arithmetic over millisecond Unix timestamps (UTC).

use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, Time};

/// Milliseconds in one minute.
pub const MS_PER_MINUTE: u64 = 60_000;

/// Milliseconds in one UTC day.
pub const MS_PER_DAY: u64 = 86_400_000;

/// Number of minute slots in one day.
pub const MINUTES_PER_DAY: usize = 1440;

/// Truncate a millisecond timestamp down to the start of its minute.
#[must_use]
pub const fn truncate_to_minute(timestamp_ms: u64) -> u64 {
    timestamp_ms - (timestamp_ms % MS_PER_MINUTE)
}

/// Split a millisecond timestamp into `(day_utc, minute_index)`.
///
/// `day_utc` counts days since the Unix epoch; `minute_index` is the offset of
/// the minute within that day, always below [`MINUTES_PER_DAY`].
///
/// ```
/// use tidelog_types::calendar::split_timestamp;
///
/// // 1970-01-02 00:01:30.250
/// assert_eq!(split_timestamp(86_400_000 + 90_250), (1, 1));
/// ```
#[must_use]
pub const fn split_timestamp(timestamp_ms: u64) -> (u64, u64) {
    let ts = truncate_to_minute(timestamp_ms);
    (ts / MS_PER_DAY, (ts % MS_PER_DAY) / MS_PER_MINUTE)
}

/// Timestamp of the start of `minute_index` on `day_utc`.
#[must_use]
pub const fn minute_start_ms(day_utc: u64, minute_index: u64) -> u64 {
    day_utc * MS_PER_DAY + minute_index * MS_PER_MINUTE
}

/// Julian day number of 1970-01-01.
const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// Calendar date of a day number, or `None` if it lies outside the range
/// supported by the `time` crate.
#[must_use]
pub fn day_to_date(day_utc: u64) -> Option<Date> {
    let days = i32::try_from(day_utc).ok()?;
    Date::from_julian_day(UNIX_EPOCH_JULIAN_DAY.checked_add(days)?).ok()
}

/// Day number of a calendar date, or `None` for dates before the epoch.
#[must_use]
pub fn date_to_day(date: Date) -> Option<u64> {
    u64::try_from(date.to_julian_day() - UNIX_EPOCH_JULIAN_DAY).ok()
}

/// Wall-clock time of a minute index, or `None` if the index is out of range.
#[must_use]
pub fn minute_to_time(minute_index: u64) -> Option<Time> {
    if minute_index >= MINUTES_PER_DAY as u64 {
        return None;
    }
    Time::from_hms((minute_index / 60) as u8, (minute_index % 60) as u8, 0).ok()
}

/// RFC 3339 rendering of a millisecond timestamp, falling back to the raw
/// number outside the range of the `time` crate.
///
/// ```
/// use tidelog_types::calendar::format_timestamp;
///
/// assert_eq!(format_timestamp(1_641_630_000_000), "2022-01-08T08:20:00Z");
/// ```
pub fn format_timestamp(timestamp_ms: u64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_ms) * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| timestamp_ms.to_string())
}
