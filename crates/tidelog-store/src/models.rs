//! Data models for stored data.

use serde::{Deserialize, Serialize};

use tidelog_types::{DeviceId, WriteNotification};

use crate::device::Device;

/// Device metadata without its buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Host-assigned device id.
    pub id: DeviceId,
    /// Device name.
    pub name: String,
    /// Recorded owner identity.
    pub owner: String,
    /// Creation time (ms since the Unix epoch).
    pub created_ms: u64,
    /// First day that ever received a bucket.
    pub first_day_utc: Option<u64>,
    /// Day of the most recent submit.
    pub last_day_utc: Option<u64>,
    /// Number of day buckets.
    pub bucket_count: u64,
}

impl DeviceSummary {
    /// Summarize an in-memory device.
    pub fn from_device(device: &Device) -> Self {
        Self {
            id: device.id(),
            name: device.name().to_string(),
            owner: device.owner().to_string(),
            created_ms: device.created_ms(),
            first_day_utc: device.first_day(),
            last_day_utc: device.last_day(),
            bucket_count: device.buckets().count() as u64,
        }
    }
}

/// One entry of the persisted notification feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Position in the feed; strictly increasing across all devices.
    pub seq: i64,
    /// The notification as emitted.
    #[serde(flatten)]
    pub notification: WriteNotification,
}
