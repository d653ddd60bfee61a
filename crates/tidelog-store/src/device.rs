//! The per-device time series: day buckets, minute upsert and queries.

use std::collections::BTreeMap;
use std::convert::Infallible;

use tidelog_types::calendar::{MINUTES_PER_DAY, split_timestamp, truncate_to_minute};
use tidelog_types::{DeviceId, MeasurementParts, Measurements, SensorReading, WriteNotification};
use tracing::{debug, warn};

use crate::bucket::DayBucket;
use crate::error::{Error, Result};
use crate::host::{Authorizer, Clock, IdAllocator, NotificationSink, OwnerOnly};

/// A sensor device and its minute-granularity history.
///
/// Days without data have no bucket at all. `first_day_utc` is set once, on
/// the first bucket ever created, and `last_day_utc` follows every submit.
/// Both are `None` exactly when the device has no buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    id: DeviceId,
    name: String,
    owner: String,
    buckets: BTreeMap<u64, DayBucket>,
    first_day_utc: Option<u64>,
    last_day_utc: Option<u64>,
    created_ms: u64,
}

impl Device {
    /// Create a device with a host-assigned id.
    pub fn new(
        id: DeviceId,
        name: impl Into<String>,
        owner: impl Into<String>,
        created_ms: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner: owner.into(),
            buckets: BTreeMap::new(),
            first_day_utc: None,
            last_day_utc: None,
            created_ms,
        }
    }

    /// Create a device, taking its id and creation time from the host.
    pub fn create<I, C>(
        ids: &I,
        clock: &C,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self
    where
        I: IdAllocator + ?Sized,
        C: Clock + ?Sized,
    {
        let device = Self::new(ids.next_id(), name, owner, clock.now_ms());
        debug!("Created device {} ({})", device.id, device.name);
        device
    }

    /// Reassemble a device from persisted parts.
    ///
    /// `buckets` may be a subset of the persisted buckets; the day bounds are
    /// taken as given.
    pub(crate) fn from_parts(
        id: DeviceId,
        name: String,
        owner: String,
        created_ms: u64,
        first_day_utc: Option<u64>,
        last_day_utc: Option<u64>,
        buckets: impl IntoIterator<Item = DayBucket>,
    ) -> Self {
        Self {
            id,
            name,
            owner,
            buckets: buckets.into_iter().map(|b| (b.day_utc(), b)).collect(),
            first_day_utc,
            last_day_utc,
            created_ms,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn created_ms(&self) -> u64 {
        self.created_ms
    }

    /// First day that ever received a bucket.
    pub fn first_day(&self) -> Option<u64> {
        self.first_day_utc
    }

    /// Day of the most recent submit.
    pub fn last_day(&self) -> Option<u64> {
        self.last_day_utc
    }

    /// The bucket for `day_utc`, if one exists.
    pub fn bucket(&self, day_utc: u64) -> Option<&DayBucket> {
        self.buckets.get(&day_utc)
    }

    /// All buckets in day order.
    pub fn buckets(&self) -> impl Iterator<Item = &DayBucket> {
        self.buckets.values()
    }

    /// Number of present slots on `day_utc`, 0 if there is no bucket.
    pub fn day_filled_count(&self, day_utc: u64) -> u32 {
        self.buckets.get(&day_utc).map_or(0, DayBucket::filled)
    }

    /// Create the bucket for `day_utc` if it does not exist yet.
    ///
    /// The first bucket a device ever gets also fixes `first_day_utc`.
    /// Calling this for an existing day is a no-op.
    pub fn ensure_bucket(&mut self, day_utc: u64) -> &mut DayBucket {
        if self.first_day_utc.is_none() {
            self.first_day_utc = Some(day_utc);
        }
        let id = self.id;
        self.buckets.entry(day_utc).or_insert_with(|| {
            debug!("Allocating bucket for device {} day {}", id, day_utc);
            DayBucket::new(day_utc)
        })
    }

    /// Write one minute slot, authorizing with [`OwnerOnly`].
    ///
    /// See [`submit_with_policy`](Self::submit_with_policy).
    pub fn submit_reading_x100<S>(
        &mut self,
        values: Measurements,
        now_ms: u64,
        caller: &str,
        sink: &mut S,
    ) -> Result<WriteNotification>
    where
        S: NotificationSink + ?Sized,
    {
        self.submit_with_policy(values, now_ms, caller, &OwnerOnly, sink)
    }

    /// Convert `(whole, hundredths)` pairs and write one minute slot.
    ///
    /// A single bad fraction rejects the whole call before anything changes.
    pub fn submit_reading_parts<S>(
        &mut self,
        parts: &MeasurementParts,
        now_ms: u64,
        caller: &str,
        sink: &mut S,
    ) -> Result<WriteNotification>
    where
        S: NotificationSink + ?Sized,
    {
        let values = parts.to_x100()?;
        self.submit_reading_x100(values, now_ms, caller, sink)
    }

    /// Write the reading for the minute containing `now_ms`.
    ///
    /// The slot is overwritten entirely; a second write to the same minute
    /// replaces the first and leaves the fill counter unchanged. Exactly one
    /// notification is delivered to `sink` on success and none on failure; a
    /// copy is also returned to the caller.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorized`] if `policy` rejects `caller`
    /// - [`Error::InvalidMinuteIndex`] if the computed minute is out of range
    pub fn submit_with_policy<A, S>(
        &mut self,
        values: Measurements,
        now_ms: u64,
        caller: &str,
        policy: &A,
        sink: &mut S,
    ) -> Result<WriteNotification>
    where
        A: Authorizer + ?Sized,
        S: NotificationSink + ?Sized,
    {
        if !policy.is_authorized(self, caller) {
            warn!("Rejected write to device {} by {}", self.id, caller);
            return Err(Error::Unauthorized {
                device_id: self.id,
                caller: caller.to_string(),
            });
        }

        let (day_utc, minute) = split_timestamp(now_ms);
        if minute >= MINUTES_PER_DAY as u64 {
            return Err(Error::InvalidMinuteIndex(minute));
        }
        let timestamp_ms = truncate_to_minute(now_ms);

        let bucket = self.ensure_bucket(day_utc);
        let was_present = bucket.upsert(minute as usize, SensorReading::new(timestamp_ms, values))?;
        self.last_day_utc = Some(day_utc);

        debug!(
            "Upserted device {} day {} minute {} (overwrite: {})",
            self.id, day_utc, minute, was_present
        );

        let notification = WriteNotification {
            device_id: self.id,
            day_utc,
            minute_index: minute as u16,
            timestamp_ms,
            temperature_x100: values.temperature_x100,
            ph_x100: values.ph_x100,
            dissolved_oxygen_x100: values.dissolved_oxygen_x100,
            salinity_x100: values.salinity_x100,
            caller: caller.to_string(),
        };
        sink.notify(notification.clone());

        Ok(notification)
    }

    /// The reading at `minute_index` of `day_utc`.
    ///
    /// Returns `Ok(None)` when the day has no bucket, without checking the
    /// index, and when the minute was never written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMinuteIndex`] if the day has a bucket and
    /// `minute_index >= 1440`.
    pub fn get_at_minute(&self, day_utc: u64, minute_index: u16) -> Result<Option<SensorReading>> {
        match self.buckets.get(&day_utc) {
            Some(bucket) => bucket.get(minute_index),
            None => Ok(None),
        }
    }

    /// The most recently written reading across all days.
    pub fn latest(&self) -> Option<SensorReading> {
        let result = scan_latest(self.first_day_utc, self.last_day_utc, |day| {
            Ok::<_, Infallible>(self.buckets.get(&day))
        });
        match result {
            Ok(reading) => reading,
            Err(never) => match never {},
        }
    }
}

/// Walk days backward from `last` looking for the latest present reading.
///
/// Each visited day is looked up with `bucket_at`. A missing bucket, or one
/// with no present slot, moves the scan one day back; the scan ends at
/// `first` (or immediately when `first` is unknown).
pub(crate) fn scan_latest<B, E, F>(
    first: Option<u64>,
    last: Option<u64>,
    mut bucket_at: F,
) -> std::result::Result<Option<SensorReading>, E>
where
    B: std::borrow::Borrow<DayBucket>,
    F: FnMut(u64) -> std::result::Result<Option<B>, E>,
{
    let Some(mut day) = last else {
        return Ok(None);
    };

    loop {
        if let Some(reading) = bucket_at(day)?.and_then(|b| b.borrow().latest()) {
            return Ok(Some(reading));
        }

        match first {
            Some(first) if day > first => day -= 1,
            _ => return Ok(None),
        }
    }
}
