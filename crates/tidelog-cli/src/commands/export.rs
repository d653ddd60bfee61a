//! Export command - one day of readings as CSV.

use std::io::Write;

use anyhow::{Context, Result};
use tidelog_store::Store;
use tidelog_types::DeviceId;

/// Stream the present readings of `day` to `out`. Returns the row count.
pub fn cmd_export<W: Write>(store: &Store, device: DeviceId, day: u64, out: W) -> Result<usize> {
    let rows = store
        .export_day_csv(device, day, out)
        .with_context(|| format!("Failed to export day {} of device {}", day, device))?;
    tracing::debug!("Exported {} rows", rows);
    Ok(rows)
}
