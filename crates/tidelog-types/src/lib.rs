//! Shared types for minute-granularity environmental sensor series.
//!
//! This crate provides the value types used by the storage engine
//! (tidelog-store) and its front ends (tidelog-cli).
//!
//! # Features
//!
//! - ×100 fixed-point conversion for measurements
//! - The per-minute [`SensorReading`] slot and its binary layout
//! - The [`WriteNotification`] emitted for every upsert
//! - Day/minute arithmetic over millisecond UTC timestamps
//!
//! # Example
//!
//! ```
//! use tidelog_types::{Measurements, SensorReading, calendar, fixed};
//!
//! let temperature = fixed::to_x100(27, 53)?;
//! let reading = SensorReading::new(
//!     calendar::minute_start_ms(19000, 500),
//!     Measurements::new(temperature, 720, 680, 3500),
//! );
//! assert!(reading.present);
//! # Ok::<(), tidelog_types::CodecError>(())
//! ```

pub mod calendar;
pub mod error;
pub mod fixed;
pub mod types;

pub use error::{CodecError, CodecResult};
pub use fixed::Parts;
pub use types::{
    DeviceId, MeasurementParts, Measurements, SLOT_BYTES, SensorReading, WriteNotification,
};
