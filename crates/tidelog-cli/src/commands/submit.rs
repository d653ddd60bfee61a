//! Submit command implementation.

use anyhow::{Context, Result, bail};
use tidelog_store::{FixedClock, Store};
use tidelog_types::calendar::split_timestamp;
use tidelog_types::{DeviceId, MeasurementParts};

use crate::cli::ReadingArgs;
use crate::format::{FormatOptions, format_notification_text};

impl From<ReadingArgs> for MeasurementParts {
    fn from(args: ReadingArgs) -> Self {
        Self {
            temperature: args.temperature,
            ph: args.ph,
            dissolved_oxygen: args.oxygen,
            salinity: args.salinity,
        }
    }
}

/// Write one minute for `device` as `caller`.
///
/// `at` replaces the store's clock for this write; without it the wall clock decides
/// which minute is written. An `at` on a day before the device's last written
/// day is rejected, so backfill stays within the current day.
pub fn cmd_submit(
    store: Store,
    device: DeviceId,
    values: ReadingArgs,
    at: Option<u64>,
    caller: &str,
    opts: &FormatOptions,
) -> Result<String> {
    let mut store = match at {
        Some(at) => {
            let (day_utc, _) = split_timestamp(at);
            let summary = store.device_summary(device)?;
            if let Some(last_day) = summary.last_day_utc
                && day_utc < last_day
            {
                bail!(
                    "--at {} falls on day {}, before day {} last written to device {}",
                    at,
                    day_utc,
                    last_day,
                    device
                );
            }
            store.with_clock(FixedClock(at))
        }
        None => store,
    };

    let notification = store
        .submit_reading_parts(device, &values.into(), caller)
        .with_context(|| format!("Failed to submit reading to device {}", device))?;

    if opts.json {
        opts.as_json(&notification)
    } else {
        Ok(format_notification_text(&notification))
    }
}
