//! Output formatting utilities for text and JSON output.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use tidelog_store::{DeviceSummary, FeedEntry};
use tidelog_types::calendar::{day_to_date, format_timestamp, minute_to_time};
use tidelog_types::fixed::from_x100;
use tidelog_types::{SensorReading, WriteNotification};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Emit JSON instead of text.
    pub json: bool,
}

impl FormatOptions {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Serialize value to a pretty JSON string.
    pub fn as_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)? + "\n")
    }
}

/// A day number followed by its calendar date.
pub fn format_day(day_utc: u64) -> String {
    match day_to_date(day_utc) {
        Some(date) => format!("{} ({})", day_utc, date),
        None => day_utc.to_string(),
    }
}

/// A minute index followed by its wall-clock time, e.g. "500 (08:20)".
pub fn format_minute(minute_index: u16) -> String {
    match minute_to_time(u64::from(minute_index)) {
        Some(t) => format!("{} ({:02}:{:02})", minute_index, t.hour(), t.minute()),
        None => minute_index.to_string(),
    }
}

fn format_optional_day(day_utc: Option<u64>) -> String {
    day_utc.map_or_else(|| "-".to_string(), format_day)
}

/// Four measurements on one line.
fn format_values(
    temperature_x100: u64,
    ph_x100: u64,
    dissolved_oxygen_x100: u64,
    salinity_x100: u64,
) -> String {
    format!(
        "temperature {}  pH {}  DO {}  salinity {}",
        from_x100(temperature_x100),
        from_x100(ph_x100),
        from_x100(dissolved_oxygen_x100),
        from_x100(salinity_x100)
    )
}

pub fn format_reading_text(reading: &SensorReading) -> String {
    format!(
        "{}\n  {}\n",
        format_timestamp(reading.timestamp_ms),
        format_values(
            reading.temperature_x100,
            reading.ph_x100,
            reading.dissolved_oxygen_x100,
            reading.salinity_x100
        )
    )
}

/// JSON or text for an optional reading; absent readings print a note in text mode.
pub fn format_optional_reading(
    reading: Option<&SensorReading>,
    opts: &FormatOptions,
) -> Result<String> {
    if opts.json {
        return opts.as_json(&reading);
    }
    Ok(match reading {
        Some(reading) => format_reading_text(reading),
        None => "No reading\n".to_string(),
    })
}

pub fn format_notification_text(n: &WriteNotification) -> String {
    format!(
        "device {} day {} minute {} by {}\n  {}\n",
        n.device_id,
        n.day_utc,
        format_minute(n.minute_index),
        n.caller,
        format_values(
            n.temperature_x100,
            n.ph_x100,
            n.dissolved_oxygen_x100,
            n.salinity_x100
        )
    )
}

pub fn format_device_text(summary: &DeviceSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Device {}", summary.id);
    let _ = writeln!(out, "  Name:      {}", summary.name);
    let _ = writeln!(out, "  Owner:     {}", summary.owner);
    let _ = writeln!(out, "  Created:   {}", format_timestamp(summary.created_ms));
    let _ = writeln!(out, "  First day: {}", format_optional_day(summary.first_day_utc));
    let _ = writeln!(out, "  Last day:  {}", format_optional_day(summary.last_day_utc));
    let _ = writeln!(out, "  Buckets:   {}", summary.bucket_count);
    out
}

pub fn format_device_list_text(devices: &[DeviceSummary]) -> String {
    if devices.is_empty() {
        return "No devices\n".to_string();
    }

    let mut out = format!("{:<6} {:<20} {:<20} {:>8}  LAST DAY\n", "ID", "NAME", "OWNER", "BUCKETS");
    for d in devices {
        let _ = writeln!(
            out,
            "{:<6} {:<20} {:<20} {:>8}  {}",
            d.id.0,
            d.name,
            d.owner,
            d.bucket_count,
            format_optional_day(d.last_day_utc)
        );
    }
    out
}

pub fn format_feed_text(entries: &[FeedEntry]) -> String {
    if entries.is_empty() {
        return "No writes\n".to_string();
    }

    let mut out = String::new();
    for entry in entries {
        let _ = write!(out, "#{} {}", entry.seq, format_notification_text(&entry.notification));
    }
    out
}
