//! Point, latest and fill-count queries.

use anyhow::Result;
use serde::Serialize;
use tidelog_store::Store;
use tidelog_types::DeviceId;

use crate::format::{FormatOptions, format_day, format_optional_reading};

pub fn cmd_get(
    store: &Store,
    device: DeviceId,
    day: u64,
    minute: u16,
    opts: &FormatOptions,
) -> Result<String> {
    let reading = store.get_at_minute(device, day, minute)?;
    format_optional_reading(reading.as_ref(), opts)
}

pub fn cmd_latest(store: &Store, device: DeviceId, opts: &FormatOptions) -> Result<String> {
    let reading = store.latest(device)?;
    format_optional_reading(reading.as_ref(), opts)
}

#[derive(Serialize)]
struct Filled {
    device_id: DeviceId,
    day_utc: u64,
    filled: u32,
}

pub fn cmd_filled(store: &Store, device: DeviceId, day: u64, opts: &FormatOptions) -> Result<String> {
    let filled = store.day_filled_count(device, day)?;
    if opts.json {
        opts.as_json(&Filled {
            device_id: device,
            day_utc: day,
            filled,
        })
    } else {
        Ok(format!("{} of 1440 minutes on day {}\n", filled, format_day(day)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidelog_store::FixedClock;
    use tidelog_types::Measurements;
    use tidelog_types::calendar::minute_start_ms;

    fn seeded() -> (Store, DeviceId) {
        let mut store = Store::open_in_memory()
            .unwrap()
            .with_clock(FixedClock(minute_start_ms(19000, 500)));
        let id = store.create_device("pond", "0xfarm").unwrap().id();
        store
            .submit_reading_x100(id, Measurements::new(2753, 720, 680, 3500), "0xfarm")
            .unwrap();
        (store, id)
    }

    #[test]
    fn test_get() {
        let (store, id) = seeded();
        let opts = FormatOptions::default();
        assert!(cmd_get(&store, id, 19000, 500, &opts).unwrap().contains("27.53"));
        assert_eq!(cmd_get(&store, id, 19000, 501, &opts).unwrap(), "No reading\n");
        assert_eq!(cmd_get(&store, id, 18999, 1500, &opts).unwrap(), "No reading\n");
        assert!(cmd_get(&store, id, 19000, 1440, &opts).is_err());
    }

    #[test]
    fn test_latest_and_filled() {
        let (store, id) = seeded();
        let opts = FormatOptions::default();
        assert!(cmd_latest(&store, id, &opts).unwrap().contains("2022-01-08T08:20:00Z"));
        assert_eq!(
            cmd_filled(&store, id, 19000, &opts).unwrap(),
            "1 of 1440 minutes on day 19000 (2022-01-08)\n"
        );

        let json = cmd_filled(&store, id, 19001, &FormatOptions::new(true)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["filled"], 0);
    }
}
