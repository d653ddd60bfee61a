//! Dense per-day storage of minute slots.

use tidelog_types::calendar::MINUTES_PER_DAY;
use tidelog_types::{SLOT_BYTES, SensorReading};

use crate::error::{Error, Result};

/// All minute slots of one UTC day.
///
/// A bucket always holds exactly [`MINUTES_PER_DAY`] slots, however sparse the
/// data is, and `filled` always equals the number of present slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    day_utc: u64,
    slots: Box<[SensorReading]>,
    filled: u32,
}

impl DayBucket {
    /// Allocate an empty bucket: every slot zeroed and not present.
    pub fn new(day_utc: u64) -> Self {
        Self {
            day_utc,
            slots: vec![SensorReading::EMPTY; MINUTES_PER_DAY].into_boxed_slice(),
            filled: 0,
        }
    }

    /// Day this bucket covers (days since the Unix epoch).
    pub fn day_utc(&self) -> u64 {
        self.day_utc
    }

    /// Number of present slots.
    pub fn filled(&self) -> u32 {
        self.filled
    }

    /// Number of slots, always 1440.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot has been written yet.
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// All slots in minute order, including empty ones.
    pub fn slots(&self) -> &[SensorReading] {
        &self.slots
    }

    /// The reading at `minute_index`, if that minute was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMinuteIndex`] if `minute_index >= 1440`.
    pub fn get(&self, minute_index: u16) -> Result<Option<SensorReading>> {
        let slot = self
            .slots
            .get(usize::from(minute_index))
            .ok_or(Error::InvalidMinuteIndex(u64::from(minute_index)))?;
        Ok(slot.present.then_some(*slot))
    }

    /// Overwrite the slot at `minute_index` with `reading`.
    ///
    /// Returns whether the slot was already present. `filled` is only
    /// incremented when it was not.
    pub(crate) fn upsert(&mut self, minute_index: usize, reading: SensorReading) -> Result<bool> {
        let slot = self
            .slots
            .get_mut(minute_index)
            .ok_or(Error::InvalidMinuteIndex(minute_index as u64))?;

        let was_present = slot.present;
        *slot = reading;
        if !was_present {
            self.filled += 1;
        }
        Ok(was_present)
    }

    /// The chronologically latest present reading of the day.
    pub fn latest(&self) -> Option<SensorReading> {
        self.slots.iter().rev().find(|slot| slot.present).copied()
    }

    /// Present readings with their minute index, in minute order.
    pub fn readings(&self) -> impl Iterator<Item = (u16, SensorReading)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.present)
            .map(|(minute, slot)| (minute as u16, *slot))
    }

    /// Encode every slot into one contiguous blob.
    pub fn encode_slots(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MINUTES_PER_DAY * SLOT_BYTES);
        for slot in self.slots.iter() {
            slot.encode(&mut buf);
        }
        buf
    }

    /// Rebuild a bucket from a persisted blob and fill counter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptBucket`] if the blob is not exactly 1440 slots
    /// long, if a slot that is not present carries data, or if `filled`
    /// disagrees with the number of present slots.
    pub fn decode(day_utc: u64, filled: u32, blob: &[u8]) -> Result<Self> {
        let expected = MINUTES_PER_DAY * SLOT_BYTES;
        if blob.len() != expected {
            return Err(Error::CorruptBucket {
                day_utc,
                reason: format!("slot blob is {} bytes, expected {}", blob.len(), expected),
            });
        }

        let slots = blob
            .chunks_exact(SLOT_BYTES)
            .map(SensorReading::decode)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if let Some(minute) = slots
            .iter()
            .position(|slot| !slot.present && !slot.is_empty_slot())
        {
            return Err(Error::CorruptBucket {
                day_utc,
                reason: format!("empty slot {} is not zeroed", minute),
            });
        }

        let present = slots.iter().filter(|slot| slot.present).count() as u32;
        if present != filled {
            return Err(Error::CorruptBucket {
                day_utc,
                reason: format!("fill counter is {} but {} slots are present", filled, present),
            });
        }

        Ok(Self {
            day_utc,
            slots: slots.into_boxed_slice(),
            filled,
        })
    }
}
