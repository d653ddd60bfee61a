//! Collaborators supplied by the execution host.
//!
//! The storage model does not own time, identity, authorization policy or
//! event delivery. It consults these traits instead:
//!
//! | Trait | Concern | Provided implementations |
//! |-------|---------|--------------------------|
//! | [`Clock`] | Trusted wall-clock timestamp | [`SystemClock`], [`FixedClock`] |
//! | [`IdAllocator`] | Fresh device identities | [`SequentialIds`] |
//! | [`Authorizer`] | Who may write to a device | [`OwnerOnly`], [`Allowlist`] |
//! | [`NotificationSink`] | Write-notification delivery | [`TracingSink`], `Vec<WriteNotification>` |
//!
//! The SQLite [`Store`](crate::Store) plays the host role for persisted
//! devices: it assigns ids from the database and wraps every write in a
//! transaction.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tidelog_types::{DeviceId, WriteNotification};
use tracing::info;

use crate::device::Device;

/// Source of trusted timestamps in milliseconds since the Unix epoch.
pub trait Clock {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall clock of the local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        u64::try_from(nanos / 1_000_000).unwrap_or(0)
    }
}

/// A clock frozen at a single instant.
///
/// Used for tests and for operator backfill where the timestamp of each
/// reading is known ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}

/// Allocates unique identities for new devices.
pub trait IdAllocator {
    /// Return an id that has never been returned before.
    fn next_id(&self) -> DeviceId;
}

/// Monotonic in-process id counter starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    /// Create a counter whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&self) -> DeviceId {
        DeviceId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Decides whether a caller may write to a device.
pub trait Authorizer {
    /// Whether `caller` may submit readings to `device`.
    fn is_authorized(&self, device: &Device, caller: &str) -> bool;
}

/// Only the recorded owner may write.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerOnly;

impl Authorizer for OwnerOnly {
    fn is_authorized(&self, device: &Device, caller: &str) -> bool {
        device.owner() == caller
    }
}

/// The owner plus an explicit set of additional writers.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    writers: BTreeSet<String>,
}

impl Allowlist {
    /// Create an allowlist from writer identities.
    pub fn new<I, S>(writers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            writers: writers.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of writers besides the owner.
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    /// Whether only the owner may write.
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl Authorizer for Allowlist {
    fn is_authorized(&self, device: &Device, caller: &str) -> bool {
        device.owner() == caller || self.writers.contains(caller)
    }
}

/// Receives one notification per successful write.
pub trait NotificationSink {
    /// Deliver a notification. Delivery failures are the sink's concern.
    fn notify(&mut self, notification: WriteNotification);
}

impl NotificationSink for Vec<WriteNotification> {
    fn notify(&mut self, notification: WriteNotification) {
        self.push(notification);
    }
}

/// Logs each notification through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, n: WriteNotification) {
        info!(
            device = %n.device_id,
            day = n.day_utc,
            minute = n.minute_index,
            caller = %n.caller,
            "reading written"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_are_unique() {
        let ids = SequentialIds::default();
        assert_eq!(ids.next_id(), DeviceId(1));
        assert_eq!(ids.next_id(), DeviceId(2));

        let ids = SequentialIds::starting_at(100);
        assert_eq!(ids.next_id(), DeviceId(100));
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(42).now_ms(), 42);
    }

    #[test]
    fn test_owner_only() {
        let device = Device::new(DeviceId(1), "pond-3", "0xowner", 0);
        assert!(OwnerOnly.is_authorized(&device, "0xowner"));
        assert!(!OwnerOnly.is_authorized(&device, "0xother"));
        assert!(!OwnerOnly.is_authorized(&device, ""));
    }

    #[test]
    fn test_allowlist_includes_owner() {
        let device = Device::new(DeviceId(1), "pond-3", "0xowner", 0);
        let policy = Allowlist::new(["0xtechnician"]);
        assert_eq!(policy.len(), 1);
        assert!(policy.is_authorized(&device, "0xowner"));
        assert!(policy.is_authorized(&device, "0xtechnician"));
        assert!(!policy.is_authorized(&device, "0xstranger"));
    }
}
