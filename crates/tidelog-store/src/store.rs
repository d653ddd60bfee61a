//! Main store implementation.
//!
//! [`Store`] is the host for persisted devices: SQLite assigns device ids,
//! each submit runs in one transaction covering the device row, the touched
//! bucket and the feed entry, and the configured [`NotificationSink`] only
//! sees a notification after that transaction has committed.

use std::io;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::{debug, info};

use tidelog_types::calendar::{format_timestamp, split_timestamp};
use tidelog_types::fixed::from_x100;
use tidelog_types::{DeviceId, MeasurementParts, Measurements, SensorReading, WriteNotification};

use crate::bucket::DayBucket;
use crate::device::{Device, scan_latest};
use crate::error::{Error, Result};
use crate::host::{Authorizer, Clock, NotificationSink, OwnerOnly, SystemClock, TracingSink};
use crate::models::{DeviceSummary, FeedEntry};
use crate::queries::FeedQuery;
use crate::schema;

/// SQLite-based store for device time series.
pub struct Store {
    conn: Connection,
    clock: Box<dyn Clock + Send>,
    policy: Box<dyn Authorizer + Send>,
    sink: Box<dyn NotificationSink + Send>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self::with_connection(conn))
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            clock: Box::new(SystemClock),
            policy: Box::new(OwnerOnly),
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the source of trusted timestamps (default: [`SystemClock`]).
    pub fn with_clock(mut self, clock: impl Clock + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the write authorization policy (default: [`OwnerOnly`]).
    pub fn with_policy(mut self, policy: impl Authorizer + Send + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replace the notification sink (default: [`TracingSink`]).
    pub fn with_sink(mut self, sink: impl NotificationSink + Send + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }
}

// Device operations
impl Store {
    /// Create a device owned by `owner`; the database assigns its id.
    pub fn create_device(&mut self, name: &str, owner: &str) -> Result<Device> {
        let created_ms = self.clock.now_ms();

        self.conn.execute(
            "INSERT INTO devices (name, owner, created_ms) VALUES (?1, ?2, ?3)",
            rusqlite::params![name, owner, created_ms as i64],
        )?;
        let id = DeviceId(self.conn.last_insert_rowid() as u64);

        info!("Created device {} ({}) owned by {}", id, name, owner);
        Ok(Device::new(id, name, owner, created_ms))
    }

    /// Load a device with every one of its buckets.
    pub fn load_device(&self, id: DeviceId) -> Result<Device> {
        let header = load_header(&self.conn, id)?;

        let mut stmt = self.conn.prepare(
            "SELECT day_utc, filled, slots FROM buckets WHERE device_id = ? ORDER BY day_utc",
        )?;
        let rows = stmt
            .query_map([id.0 as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, i64>(1)? as u32,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let buckets = rows
            .into_iter()
            .map(|(day, filled, blob)| DayBucket::decode(day, filled, &blob))
            .collect::<Result<Vec<_>>>()?;

        Ok(header.into_device(id, buckets))
    }

    /// Metadata of one device.
    pub fn device_summary(&self, id: DeviceId) -> Result<DeviceSummary> {
        self.list_devices()?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or(Error::DeviceNotFound(id))
    }

    /// List all devices.
    pub fn list_devices(&self) -> Result<Vec<DeviceSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, d.owner, d.created_ms, d.first_day_utc, d.last_day_utc,
                    (SELECT COUNT(*) FROM buckets b WHERE b.device_id = d.id)
             FROM devices d ORDER BY d.id",
        )?;

        let devices = stmt
            .query_map([], |row| {
                Ok(DeviceSummary {
                    id: DeviceId(row.get::<_, i64>(0)? as u64),
                    name: row.get(1)?,
                    owner: row.get(2)?,
                    created_ms: row.get::<_, i64>(3)? as u64,
                    first_day_utc: row.get::<_, Option<i64>>(4)?.map(|d| d as u64),
                    last_day_utc: row.get::<_, Option<i64>>(5)?.map(|d| d as u64),
                    bucket_count: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(devices)
    }
}

// Write operations
impl Store {
    /// Write the reading for the current minute to device `id`.
    ///
    /// Runs entirely inside one transaction: if anything fails, no bucket is
    /// created, no slot changes and nothing is appended to the feed.
    pub fn submit_reading_x100(
        &mut self,
        id: DeviceId,
        values: Measurements,
        caller: &str,
    ) -> Result<WriteNotification> {
        let now_ms = self.clock.now_ms();
        let (day_utc, _) = split_timestamp(now_ms);

        let tx = self.conn.transaction()?;

        // Only the day being written is needed for the upsert
        let header = load_header(&tx, id)?;
        let buckets = load_bucket(&tx, id, day_utc)?;
        let mut device = header.into_device(id, buckets);

        let mut emitted = Vec::with_capacity(1);
        let notification =
            device.submit_with_policy(values, now_ms, caller, self.policy.as_ref(), &mut emitted)?;

        persist_submit(&tx, &device, &notification)?;
        tx.commit()?;

        debug!(
            "Committed write to device {} day {} minute {}",
            id, notification.day_utc, notification.minute_index
        );

        for n in emitted {
            self.sink.notify(n);
        }
        Ok(notification)
    }

    /// Convert `(whole, hundredths)` pairs and write the current minute.
    pub fn submit_reading_parts(
        &mut self,
        id: DeviceId,
        parts: &MeasurementParts,
        caller: &str,
    ) -> Result<WriteNotification> {
        let values = parts.to_x100()?;
        self.submit_reading_x100(id, values, caller)
    }
}

// Query operations
impl Store {
    /// The reading at `minute_index` of `day_utc` for device `id`.
    ///
    /// See [`Device::get_at_minute`].
    pub fn get_at_minute(
        &self,
        id: DeviceId,
        day_utc: u64,
        minute_index: u16,
    ) -> Result<Option<SensorReading>> {
        load_header(&self.conn, id)?;
        match load_bucket(&self.conn, id, day_utc)? {
            Some(bucket) => bucket.get(minute_index),
            None => Ok(None),
        }
    }

    /// The most recently written reading of device `id`.
    ///
    /// Loads one bucket per visited day, starting from the last touched day.
    pub fn latest(&self, id: DeviceId) -> Result<Option<SensorReading>> {
        let header = load_header(&self.conn, id)?;
        scan_latest(header.first_day_utc, header.last_day_utc, |day| {
            load_bucket(&self.conn, id, day)
        })
    }

    /// Number of present slots on `day_utc`, 0 if the day has no bucket.
    pub fn day_filled_count(&self, id: DeviceId, day_utc: u64) -> Result<u32> {
        load_header(&self.conn, id)?;
        let filled: Option<i64> = self
            .conn
            .query_row(
                "SELECT filled FROM buckets WHERE device_id = ?1 AND day_utc = ?2",
                rusqlite::params![id.0 as i64, day_utc as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(filled.map_or(0, |f| f as u32))
    }

    /// Query the notification feed.
    pub fn notifications(&self, query: &FeedQuery) -> Result<Vec<FeedEntry>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(FeedEntry {
                    seq: row.get(0)?,
                    notification: WriteNotification {
                        device_id: DeviceId(row.get::<_, i64>(1)? as u64),
                        day_utc: row.get::<_, i64>(2)? as u64,
                        minute_index: row.get::<_, i64>(3)? as u16,
                        timestamp_ms: row.get::<_, i64>(4)? as u64,
                        temperature_x100: row.get::<_, i64>(5)? as u64,
                        ph_x100: row.get::<_, i64>(6)? as u64,
                        dissolved_oxygen_x100: row.get::<_, i64>(7)? as u64,
                        salinity_x100: row.get::<_, i64>(8)? as u64,
                        caller: row.get(9)?,
                    },
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Count feed entries, optionally for a single device.
    pub fn count_notifications(&self, device_id: Option<DeviceId>) -> Result<u64> {
        let count: i64 = match device_id {
            Some(id) => self.conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE device_id = ?",
                [id.0 as i64],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?,
        };

        Ok(count as u64)
    }
}

/// One CSV row of a day export.
#[derive(Debug, Serialize)]
struct ExportRow {
    minute_index: u16,
    timestamp: String,
    temperature: String,
    ph: String,
    dissolved_oxygen: String,
    salinity: String,
}

// Export operations
impl Store {
    /// Write the present readings of one day as CSV, in minute order.
    ///
    /// Returns the number of rows written (excluding the header).
    pub fn export_day_csv<W: io::Write>(
        &self,
        id: DeviceId,
        day_utc: u64,
        writer: W,
    ) -> Result<usize> {
        load_header(&self.conn, id)?;
        let bucket = load_bucket(&self.conn, id, day_utc)?;

        let mut csv = csv::Writer::from_writer(writer);
        let mut rows = 0;

        // Always emit a header, even for empty days
        if bucket.as_ref().is_none_or(DayBucket::is_empty) {
            csv.write_record([
                "minute_index",
                "timestamp",
                "temperature",
                "ph",
                "dissolved_oxygen",
                "salinity",
            ])?;
        }

        for (minute_index, reading) in bucket.iter().flat_map(|b| b.readings()) {
            csv.serialize(ExportRow {
                minute_index,
                timestamp: format_timestamp(reading.timestamp_ms),
                temperature: from_x100(reading.temperature_x100).to_string(),
                ph: from_x100(reading.ph_x100).to_string(),
                dissolved_oxygen: from_x100(reading.dissolved_oxygen_x100).to_string(),
                salinity: from_x100(reading.salinity_x100).to_string(),
            })?;
            rows += 1;
        }

        csv.flush()?;
        debug!("Exported {} rows for device {} day {}", rows, id, day_utc);
        Ok(rows)
    }
}

/// Device row without buckets.
struct DeviceHeader {
    name: String,
    owner: String,
    created_ms: u64,
    first_day_utc: Option<u64>,
    last_day_utc: Option<u64>,
}

impl DeviceHeader {
    fn into_device(self, id: DeviceId, buckets: impl IntoIterator<Item = DayBucket>) -> Device {
        Device::from_parts(
            id,
            self.name,
            self.owner,
            self.created_ms,
            self.first_day_utc,
            self.last_day_utc,
            buckets,
        )
    }
}

fn load_header(conn: &Connection, id: DeviceId) -> Result<DeviceHeader> {
    conn.query_row(
        "SELECT name, owner, created_ms, first_day_utc, last_day_utc FROM devices WHERE id = ?",
        [id.0 as i64],
        |row| {
            Ok(DeviceHeader {
                name: row.get(0)?,
                owner: row.get(1)?,
                created_ms: row.get::<_, i64>(2)? as u64,
                first_day_utc: row.get::<_, Option<i64>>(3)?.map(|d| d as u64),
                last_day_utc: row.get::<_, Option<i64>>(4)?.map(|d| d as u64),
            })
        },
    )
    .optional()?
    .ok_or(Error::DeviceNotFound(id))
}

fn load_bucket(conn: &Connection, id: DeviceId, day_utc: u64) -> Result<Option<DayBucket>> {
    let row = conn
        .query_row(
            "SELECT filled, slots FROM buckets WHERE device_id = ?1 AND day_utc = ?2",
            rusqlite::params![id.0 as i64, day_utc as i64],
            |row| Ok((row.get::<_, i64>(0)? as u32, row.get::<_, Vec<u8>>(1)?)),
        )
        .optional()?;

    row.map(|(filled, blob)| DayBucket::decode(day_utc, filled, &blob))
        .transpose()
}

/// Write back everything a single submit touched.
fn persist_submit(tx: &Transaction<'_>, device: &Device, n: &WriteNotification) -> Result<()> {
    let id = device.id().0 as i64;

    tx.execute(
        "UPDATE devices SET first_day_utc = ?2, last_day_utc = ?3 WHERE id = ?1",
        rusqlite::params![
            id,
            device.first_day().map(|d| d as i64),
            device.last_day().map(|d| d as i64),
        ],
    )?;

    if let Some(bucket) = device.bucket(n.day_utc) {
        tx.execute(
            "INSERT INTO buckets (device_id, day_utc, filled, slots) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(device_id, day_utc) DO UPDATE SET filled = ?3, slots = ?4",
            rusqlite::params![id, n.day_utc as i64, bucket.filled(), bucket.encode_slots()],
        )?;
    }

    tx.execute(
        "INSERT INTO notifications (device_id, day_utc, minute_index, timestamp_ms,
         temperature_x100, ph_x100, dissolved_oxygen_x100, salinity_x100, caller)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            id,
            n.day_utc as i64,
            n.minute_index,
            n.timestamp_ms as i64,
            n.temperature_x100 as i64,
            n.ph_x100 as i64,
            n.dissolved_oxygen_x100 as i64,
            n.salinity_x100 as i64,
            n.caller,
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::host::{Allowlist, FixedClock};
    use tidelog_types::Parts;
    use tidelog_types::calendar::minute_start_ms;

    const OWNER: &str = "0xowner";

    /// Sink that can be inspected after being handed to the store.
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<WriteNotification>>>);

    impl NotificationSink for SharedSink {
        fn notify(&mut self, notification: WriteNotification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    fn store_at(now_ms: u64) -> Store {
        Store::open_in_memory().unwrap().with_clock(FixedClock(now_ms))
    }

    fn values(temperature_x100: u64) -> Measurements {
        Measurements::new(temperature_x100, 720, 680, 3500)
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.list_devices().unwrap().is_empty());
    }

    #[test]
    fn test_create_device_assigns_ids() {
        let mut store = store_at(1_000);
        let a = store.create_device("pond-1", OWNER).unwrap();
        let b = store.create_device("pond-2", OWNER).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.created_ms(), 1_000);

        let devices = store.list_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "pond-1");
        assert_eq!(devices[0].bucket_count, 0);
        assert_eq!(devices[0].first_day_utc, None);
    }

    #[test]
    fn test_unknown_device() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.latest(DeviceId(99)),
            Err(Error::DeviceNotFound(DeviceId(99)))
        ));
        assert!(matches!(
            store.load_device(DeviceId(99)),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_submit_and_query() {
        let mut store = store_at(minute_start_ms(19000, 500) + 1_234);
        let device = store.create_device("pond-1", OWNER).unwrap();

        let n = store
            .submit_reading_x100(device.id(), values(2753), OWNER)
            .unwrap();
        assert_eq!(n.day_utc, 19000);
        assert_eq!(n.minute_index, 500);

        let reading = store.get_at_minute(device.id(), 19000, 500).unwrap().unwrap();
        assert_eq!(reading.temperature_x100, 2753);
        assert_eq!(reading.timestamp_ms, minute_start_ms(19000, 500));
        assert_eq!(store.day_filled_count(device.id(), 19000).unwrap(), 1);
        assert_eq!(store.latest(device.id()).unwrap(), Some(reading));

        let summary = store.device_summary(device.id()).unwrap();
        assert_eq!(summary.first_day_utc, Some(19000));
        assert_eq!(summary.last_day_utc, Some(19000));
        assert_eq!(summary.bucket_count, 1);
    }

    #[test]
    fn test_submit_parts() {
        let mut store = store_at(minute_start_ms(19000, 10));
        let device = store.create_device("pond-1", OWNER).unwrap();
        let parts = MeasurementParts {
            temperature: Parts::new(27, 53),
            ph: Parts::new(7, 20),
            dissolved_oxygen: Parts::new(6, 80),
            salinity: Parts::new(35, 0),
        };

        let n = store.submit_reading_parts(device.id(), &parts, OWNER).unwrap();
        assert_eq!(n.temperature_x100, 2753);
        assert_eq!(n.salinity_x100, 3500);
    }

    #[test]
    fn test_rejected_submit_leaves_no_trace() {
        let sink = SharedSink::default();
        let mut store = store_at(minute_start_ms(19000, 0)).with_sink(sink.clone());
        let device = store.create_device("pond-1", OWNER).unwrap();

        let result = store.submit_reading_x100(device.id(), values(1), "0xintruder");
        assert!(matches!(result, Err(Error::Unauthorized { .. })));

        let parts = MeasurementParts {
            temperature: Parts::new(1, 100),
            ..Default::default()
        };
        let result = store.submit_reading_parts(device.id(), &parts, OWNER);
        assert!(matches!(result, Err(Error::InvalidFraction { hundredths: 100 })));

        assert_eq!(store.count_notifications(Some(device.id())).unwrap(), 0);
        assert_eq!(store.device_summary(device.id()).unwrap().bucket_count, 0);
        assert_eq!(store.device_summary(device.id()).unwrap().last_day_utc, None);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sink_receives_committed_writes() {
        let sink = SharedSink::default();
        let mut store = store_at(minute_start_ms(19000, 0)).with_sink(sink.clone());
        let device = store.create_device("pond-1", OWNER).unwrap();

        store.submit_reading_x100(device.id(), values(1), OWNER).unwrap();
        store.submit_reading_x100(device.id(), values(2), OWNER).unwrap();

        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].temperature_x100, 2);
    }

    #[test]
    fn test_allowlist_policy() {
        let mut store = store_at(minute_start_ms(19000, 0)).with_policy(Allowlist::new(["0xtech"]));
        let device = store.create_device("pond-1", OWNER).unwrap();

        store.submit_reading_x100(device.id(), values(1), "0xtech").unwrap();
        assert!(store.submit_reading_x100(device.id(), values(1), "0xother").is_err());
    }

    #[test]
    fn test_feed_query() {
        let mut store = store_at(minute_start_ms(19000, 0));
        let a = store.create_device("pond-1", OWNER).unwrap();
        let b = store.create_device("pond-2", OWNER).unwrap();

        store.submit_reading_x100(a.id(), values(1), OWNER).unwrap();
        store.submit_reading_x100(b.id(), values(2), OWNER).unwrap();
        store.submit_reading_x100(a.id(), values(3), OWNER).unwrap();

        let entries = store.notifications(&FeedQuery::new().device(a.id())).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].notification.temperature_x100, 3);
        assert!(entries[0].seq > entries[1].seq);

        let tail = store
            .notifications(&FeedQuery::new().after(entries[1].seq).oldest_first())
            .unwrap();
        let temps: Vec<u64> = tail.iter().map(|e| e.notification.temperature_x100).collect();
        assert_eq!(temps, vec![2, 3]);

        assert_eq!(store.count_notifications(None).unwrap(), 3);
    }

    #[test]
    fn test_load_device_matches_queries() {
        let mut store = store_at(minute_start_ms(19000, 5));
        let device = store.create_device("pond-1", OWNER).unwrap();
        store.submit_reading_x100(device.id(), values(5), OWNER).unwrap();

        let mut store = store.with_clock(FixedClock(minute_start_ms(19003, 6)));
        store.submit_reading_x100(device.id(), values(6), OWNER).unwrap();

        let loaded = store.load_device(device.id()).unwrap();
        assert_eq!(loaded.buckets().count(), 2);
        assert_eq!(loaded.first_day(), Some(19000));
        assert_eq!(loaded.last_day(), Some(19003));
        assert_eq!(loaded.latest(), store.latest(device.id()).unwrap());
        assert_eq!(loaded.day_filled_count(19000), 1);
    }

    #[test]
    fn test_export_day_csv() {
        let mut store = store_at(minute_start_ms(19000, 500));
        let device = store.create_device("pond-1", OWNER).unwrap();
        store.submit_reading_x100(device.id(), values(2753), OWNER).unwrap();

        let mut out = Vec::new();
        let rows = store.export_day_csv(device.id(), 19000, &mut out).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("minute_index,timestamp,temperature,ph,dissolved_oxygen,salinity")
        );
        assert_eq!(
            lines.next(),
            Some("500,2022-01-08T08:20:00Z,27.53,7.20,6.80,35.00")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_empty_day_has_header_only() {
        let mut store = store_at(0);
        let device = store.create_device("pond-1", OWNER).unwrap();

        let mut out = Vec::new();
        let rows = store.export_day_csv(device.id(), 19000, &mut out).unwrap();
        assert_eq!(rows, 0);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }
}
