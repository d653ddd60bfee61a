//! Core value types for minute-granularity sensor series.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::fixed::Parts;

/// Host-assigned identity of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The four ×100 fixed-point measurements carried by every reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurements {
    /// Water temperature in hundredths of a degree Celsius.
    pub temperature_x100: u64,
    /// pH in hundredths.
    pub ph_x100: u64,
    /// Dissolved oxygen in hundredths of mg/L.
    pub dissolved_oxygen_x100: u64,
    /// Salinity in hundredths of PSU.
    pub salinity_x100: u64,
}

impl Measurements {
    /// Create a new set of measurements from raw ×100 values.
    #[must_use]
    pub const fn new(
        temperature_x100: u64,
        ph_x100: u64,
        dissolved_oxygen_x100: u64,
        salinity_x100: u64,
    ) -> Self {
        Self {
            temperature_x100,
            ph_x100,
            dissolved_oxygen_x100,
            salinity_x100,
        }
    }
}

/// The four measurements as `(whole, hundredths)` pairs.
///
/// Converted with [`MeasurementParts::to_x100`], which rejects the whole set if
/// any single pair has a hundredths component of 100 or more.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementParts {
    pub temperature: Parts,
    pub ph: Parts,
    pub dissolved_oxygen: Parts,
    pub salinity: Parts,
}

impl MeasurementParts {
    /// Convert all four pairs to ×100 fixed point.
    ///
    /// # Errors
    ///
    /// Returns the first [`CodecError`] encountered, in field order.
    pub fn to_x100(&self) -> CodecResult<Measurements> {
        Ok(Measurements {
            temperature_x100: self.temperature.to_x100()?,
            ph_x100: self.ph.to_x100()?,
            dissolved_oxygen_x100: self.dissolved_oxygen.to_x100()?,
            salinity_x100: self.salinity.to_x100()?,
        })
    }
}

/// Encoded size of one [`SensorReading`] slot in bytes.
pub const SLOT_BYTES: usize = 1 + 8 + 4 * 8;

/// One minute slot of a day bucket.
///
/// `present` distinguishes a slot that was never written from one that was
/// written with all-zero values. Empty slots are all-zero with
/// `present == false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Start of the minute this reading belongs to (ms since the Unix epoch).
    pub timestamp_ms: u64,
    /// Water temperature in hundredths of a degree Celsius.
    pub temperature_x100: u64,
    /// pH in hundredths.
    pub ph_x100: u64,
    /// Dissolved oxygen in hundredths of mg/L.
    pub dissolved_oxygen_x100: u64,
    /// Salinity in hundredths of PSU.
    pub salinity_x100: u64,
    /// Whether this slot has ever been written.
    pub present: bool,
}

impl SensorReading {
    /// An empty, never-written slot.
    pub const EMPTY: Self = Self {
        timestamp_ms: 0,
        temperature_x100: 0,
        ph_x100: 0,
        dissolved_oxygen_x100: 0,
        salinity_x100: 0,
        present: false,
    };

    /// Create a present reading for the minute starting at `timestamp_ms`.
    #[must_use]
    pub const fn new(timestamp_ms: u64, values: Measurements) -> Self {
        Self {
            timestamp_ms,
            temperature_x100: values.temperature_x100,
            ph_x100: values.ph_x100,
            dissolved_oxygen_x100: values.dissolved_oxygen_x100,
            salinity_x100: values.salinity_x100,
            present: true,
        }
    }

    /// The four measurements of this reading.
    #[must_use]
    pub const fn measurements(&self) -> Measurements {
        Measurements {
            temperature_x100: self.temperature_x100,
            ph_x100: self.ph_x100,
            dissolved_oxygen_x100: self.dissolved_oxygen_x100,
            salinity_x100: self.salinity_x100,
        }
    }

    /// Whether this is an empty slot with every field zeroed.
    #[must_use]
    pub fn is_empty_slot(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Encode the slot into its fixed-size little-endian layout.
    ///
    /// The layout is:
    /// - byte 0: present flag (0 or 1)
    /// - bytes 1-8: timestamp_ms (u64 LE)
    /// - bytes 9-40: temperature, pH, dissolved oxygen, salinity (u64 LE each)
    pub fn encode<B: bytes::BufMut>(&self, buf: &mut B) {
        buf.put_u8(u8::from(self.present));
        buf.put_u64_le(self.timestamp_ms);
        buf.put_u64_le(self.temperature_x100);
        buf.put_u64_le(self.ph_x100);
        buf.put_u64_le(self.dissolved_oxygen_x100);
        buf.put_u64_le(self.salinity_x100);
    }

    /// Decode a slot from its fixed-size little-endian layout.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InsufficientBytes`] if `data` contains fewer than
    /// [`SLOT_BYTES`] bytes.
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        use bytes::Buf;

        if data.len() < SLOT_BYTES {
            return Err(CodecError::InsufficientBytes {
                expected: SLOT_BYTES,
                actual: data.len(),
            });
        }

        let mut buf = data;
        let present = buf.get_u8() != 0;
        Ok(Self {
            present,
            timestamp_ms: buf.get_u64_le(),
            temperature_x100: buf.get_u64_le(),
            ph_x100: buf.get_u64_le(),
            dissolved_oxygen_x100: buf.get_u64_le(),
            salinity_x100: buf.get_u64_le(),
        })
    }
}

/// Structured message emitted once per successful minute upsert.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WriteNotification {
    /// Device that was written.
    pub device_id: DeviceId,
    /// Day of the write (days since the Unix epoch, UTC).
    pub day_utc: u64,
    /// Minute of the write within its day (0-1439).
    pub minute_index: u16,
    /// Minute-aligned timestamp of the write.
    pub timestamp_ms: u64,
    /// Water temperature in hundredths of a degree Celsius.
    pub temperature_x100: u64,
    /// pH in hundredths.
    pub ph_x100: u64,
    /// Dissolved oxygen in hundredths of mg/L.
    pub dissolved_oxygen_x100: u64,
    /// Salinity in hundredths of PSU.
    pub salinity_x100: u64,
    /// Identity of the writer.
    pub caller: String,
}

impl WriteNotification {
    /// The reading this notification describes.
    #[must_use]
    pub fn reading(&self) -> SensorReading {
        SensorReading::new(
            self.timestamp_ms,
            Measurements::new(
                self.temperature_x100,
                self.ph_x100,
                self.dissolved_oxygen_x100,
                self.salinity_x100,
            ),
        )
    }
}
