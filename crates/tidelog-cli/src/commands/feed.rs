//! Feed command - recent write notifications.

use anyhow::Result;
use tidelog_store::{FeedQuery, Store};
use tidelog_types::DeviceId;

use crate::format::{FormatOptions, format_feed_text};

pub fn cmd_feed(
    store: &Store,
    device: Option<DeviceId>,
    limit: u32,
    opts: &FormatOptions,
) -> Result<String> {
    let mut query = FeedQuery::new().limit(limit);
    if let Some(device) = device {
        query = query.device(device);
    }

    let entries = store.notifications(&query)?;
    if opts.json {
        opts.as_json(&entries)
    } else {
        Ok(format_feed_text(&entries))
    }
}
