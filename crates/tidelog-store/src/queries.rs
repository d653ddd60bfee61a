//! Query builder for the notification feed.
//!
//! # Example
//!
//! ```
//! use tidelog_store::{FeedQuery, Store};
//! use tidelog_types::DeviceId;
//!
//! let store = Store::open_in_memory()?;
//!
//! // Last 20 writes to one device
//! let query = FeedQuery::new().device(DeviceId(1)).limit(20);
//! let entries = store.notifications(&query)?;
//!
//! // Everything after a known position, oldest first (for tailing)
//! let tail = FeedQuery::new().after(42).oldest_first();
//! let entries = store.notifications(&tail)?;
//! # Ok::<(), tidelog_store::Error>(())
//! ```

use tidelog_types::DeviceId;

/// Fluent query builder for [`Store::notifications`](crate::Store::notifications).
///
/// By default, queries return entries newest first.
#[derive(Debug, Default, Clone)]
pub struct FeedQuery {
    /// Filter by device.
    pub device_id: Option<DeviceId>,
    /// Only entries with a sequence number strictly greater than this.
    pub after_seq: Option<i64>,
    /// Filter by day.
    pub day_utc: Option<u64>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by seq descending (newest first).
    pub newest_first: bool,
}

impl FeedQuery {
    /// Create a new query: all devices, no limit, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter by device.
    pub fn device(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Only entries written after feed position `seq`.
    ///
    /// Consumers tailing the feed pass the last `seq` they processed.
    pub fn after(mut self, seq: i64) -> Self {
        self.after_seq = Some(seq);
        self
    }

    /// Only entries for writes to `day_utc`.
    pub fn day(mut self, day_utc: u64) -> Self {
        self.day_utc = Some(day_utc);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results by oldest first (ascending by `seq`).
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(device_id) = self.device_id {
            conditions.push("device_id = ?");
            params.push(Box::new(device_id.0 as i64));
        }

        if let Some(seq) = self.after_seq {
            conditions.push("seq > ?");
            params.push(Box::new(seq));
        }

        if let Some(day) = self.day_utc {
            conditions.push("day_utc = ?");
            params.push(Box::new(day as i64));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT seq, device_id, day_utc, minute_index, timestamp_ms, temperature_x100, \
             ph_x100, dissolved_oxygen_x100, salinity_x100, caller \
             FROM notifications {} ORDER BY seq {}",
            where_clause, order
        );

        // SQLite only accepts OFFSET after LIMIT
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        sql
    }
}
