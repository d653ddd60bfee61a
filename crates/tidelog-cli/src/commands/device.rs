//! Device registration and metadata commands.

use anyhow::{Context, Result};
use tidelog_store::{DeviceSummary, Store};
use tidelog_types::DeviceId;

use crate::format::{FormatOptions, format_device_list_text, format_device_text};

/// Register a device owned by `owner` and report its id.
pub fn cmd_create(store: &mut Store, name: &str, owner: &str, opts: &FormatOptions) -> Result<String> {
    let device = store
        .create_device(name, owner)
        .with_context(|| format!("Failed to create device '{}'", name))?;

    if opts.json {
        opts.as_json(&DeviceSummary::from_device(&device))
    } else {
        Ok(format!("{}\n", device.id()))
    }
}

pub fn cmd_list(store: &Store, opts: &FormatOptions) -> Result<String> {
    let devices = store.list_devices().context("Failed to list devices")?;
    if opts.json {
        opts.as_json(&devices)
    } else {
        Ok(format_device_list_text(&devices))
    }
}

pub fn cmd_info(store: &Store, device: DeviceId, opts: &FormatOptions) -> Result<String> {
    let summary: DeviceSummary = store.device_summary(device)?;
    if opts.json {
        opts.as_json(&summary)
    } else {
        Ok(format_device_text(&summary))
    }
}
