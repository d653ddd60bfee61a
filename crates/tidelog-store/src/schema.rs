//! Database schema and version check.

use rusqlite::Connection;

use crate::error::{Error, Result};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
///
/// A fresh database gets the current schema; a database written by a newer
/// version is refused.
pub fn initialize(conn: &Connection) -> Result<()> {
    match get_schema_version(conn)? {
        0 => {
            create_schema_v1(conn)?;
            set_schema_version(conn, SCHEMA_VERSION)?;
        }
        SCHEMA_VERSION => {}
        found => {
            return Err(Error::UnsupportedSchemaVersion {
                found,
                supported: SCHEMA_VERSION,
            });
        }
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per device; ids are assigned here
        CREATE TABLE IF NOT EXISTS devices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            owner TEXT NOT NULL,
            created_ms INTEGER NOT NULL,
            first_day_utc INTEGER,
            last_day_utc INTEGER
        );

        -- Dense 1440-slot day buckets, created on first write to a day
        CREATE TABLE IF NOT EXISTS buckets (
            device_id INTEGER NOT NULL REFERENCES devices(id),
            day_utc INTEGER NOT NULL,
            filled INTEGER NOT NULL CHECK (filled BETWEEN 0 AND 1440),
            slots BLOB NOT NULL,
            PRIMARY KEY (device_id, day_utc)
        );

        -- Append-only write-notification feed
        CREATE TABLE IF NOT EXISTS notifications (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id INTEGER NOT NULL REFERENCES devices(id),
            day_utc INTEGER NOT NULL,
            minute_index INTEGER NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            temperature_x100 INTEGER NOT NULL,
            ph_x100 INTEGER NOT NULL,
            dissolved_oxygen_x100 INTEGER NOT NULL,
            salinity_x100 INTEGER NOT NULL,
            caller TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_device
            ON notifications(device_id, seq);
        "#,
    )?;

    Ok(())
}
