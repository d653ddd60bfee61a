//! Per-device minute-bucketed storage for environmental sensor readings.
//!
//! Each device owns a sparse set of day buckets. A bucket is created on the
//! first write to a day and always holds 1440 minute slots; every write
//! overwrites exactly one slot, so resubmitting a minute converges on the
//! last value written.
//!
//! # Features
//!
//! - In-memory [`Device`] model with idempotent minute upsert
//! - Backward-scanning "latest reading" query
//! - Host collaborators as traits: clock, id allocation, authorization,
//!   notification delivery
//! - SQLite-backed [`Store`] with transactional writes and a notification feed
//! - CSV export of a day
//!
//! # Example
//!
//! ```
//! use tidelog_store::{Device, DeviceId};
//! use tidelog_types::Measurements;
//! use tidelog_types::calendar::minute_start_ms;
//!
//! let mut device = Device::new(DeviceId(1), "pond-3", "0xowner", 0);
//! let mut feed = Vec::new();
//!
//! let now = minute_start_ms(19000, 500);
//! device.submit_reading_x100(Measurements::new(2753, 720, 680, 3500), now, "0xowner", &mut feed)?;
//!
//! assert_eq!(device.day_filled_count(19000), 1);
//! assert_eq!(device.latest().map(|r| r.temperature_x100), Some(2753));
//! assert_eq!(feed.len(), 1);
//! # Ok::<(), tidelog_store::Error>(())
//! ```

mod bucket;
mod device;
mod error;
pub mod host;
mod models;
mod queries;
mod schema;
mod store;

pub use bucket::DayBucket;
pub use device::Device;
pub use error::{Error, Result};
pub use host::{
    Allowlist, Authorizer, Clock, FixedClock, IdAllocator, NotificationSink, OwnerOnly,
    SequentialIds, SystemClock, TracingSink,
};
pub use models::{DeviceSummary, FeedEntry};
pub use queries::FeedQuery;
pub use store::Store;
pub use tidelog_types::DeviceId;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/tidelog/data.db`
/// - macOS: `~/Library/Application Support/tidelog/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\tidelog\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("tidelog")
        .join("data.db")
}
