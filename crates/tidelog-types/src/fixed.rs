//! Fixed-point (×100) conversion for sensor measurements.
//!
//! Every measurement is stored as an unsigned integer scaled by 100, i.e. with
//! two implied decimal digits: `27.53 °C` is stored as `2753`.
//!
//! ```
//! use tidelog_types::fixed::{to_x100, from_x100, Parts};
//!
//! assert_eq!(to_x100(27, 53), Ok(2753));
//! assert_eq!(from_x100(2753), Parts::new(27, 53));
//! assert!(to_x100(27, 100).is_err());
//!
//! let parts: Parts = "7.5".parse().unwrap();
//! assert_eq!(parts.to_x100(), Ok(750));
//! ```

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Scale factor between a decimal value and its fixed-point representation.
pub const SCALE: u64 = 100;

/// Convert a `(whole, hundredths)` pair into a ×100 fixed-point integer.
///
/// # Errors
///
/// Returns [`CodecError::InvalidFraction`] when `frac_hundredths >= 100`, and
/// [`CodecError::Overflow`] when the scaled value does not fit in a `u64`.
pub fn to_x100(whole: u64, frac_hundredths: u64) -> CodecResult<u64> {
    if frac_hundredths >= SCALE {
        return Err(CodecError::InvalidFraction {
            hundredths: frac_hundredths,
        });
    }

    whole
        .checked_mul(SCALE)
        .and_then(|scaled| scaled.checked_add(frac_hundredths))
        .ok_or(CodecError::Overflow {
            whole,
            hundredths: frac_hundredths,
        })
}

/// Split a ×100 fixed-point integer back into its `(whole, hundredths)` parts.
#[must_use]
pub fn from_x100(value: u64) -> Parts {
    Parts {
        whole: value / SCALE,
        hundredths: value % SCALE,
    }
}

/// A decimal value expressed as a whole part and a hundredths part.
///
/// `Parts` is not validated on construction; [`Parts::to_x100`] performs the
/// range check so that the error surfaces at the point of submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parts {
    /// Whole units.
    pub whole: u64,
    /// Hundredths of a unit (valid range 0-99).
    pub hundredths: u64,
}

impl Parts {
    /// Create a new pair.
    #[must_use]
    pub const fn new(whole: u64, hundredths: u64) -> Self {
        Self { whole, hundredths }
    }

    /// Convert to a ×100 fixed-point integer.
    ///
    /// # Errors
    ///
    /// See [`to_x100`].
    pub fn to_x100(self) -> CodecResult<u64> {
        to_x100(self.whole, self.hundredths)
    }
}

impl From<(u64, u64)> for Parts {
    fn from((whole, hundredths): (u64, u64)) -> Self {
        Self { whole, hundredths }
    }
}

impl fmt::Display for Parts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.whole, self.hundredths)
    }
}

impl FromStr for Parts {
    type Err = CodecError;

    /// Parse decimal text such as `"27.53"`, `"7.5"` or `"28"`.
    ///
    /// A single fractional digit means tenths (`"7.5"` is 7 and 50 hundredths).
    /// Signs, exponents and more than two fractional digits are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodecError::InvalidDecimal(s.to_string());
        let trimmed = s.trim();

        let (whole_str, frac_str) = match trimmed.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (trimmed, None),
        };

        if whole_str.is_empty() || !whole_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u64 = whole_str.parse().map_err(|_| invalid())?;

        let hundredths = match frac_str {
            None => 0,
            Some(f) if f.is_empty() || f.len() > 2 => return Err(invalid()),
            Some(f) if !f.bytes().all(|b| b.is_ascii_digit()) => return Err(invalid()),
            Some(f) => {
                let digits: u64 = f.parse().map_err(|_| invalid())?;
                if f.len() == 1 { digits * 10 } else { digits }
            }
        };

        Ok(Self { whole, hundredths })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_x100_basic() {
        assert_eq!(to_x100(27, 53), Ok(2753));
        assert_eq!(to_x100(0, 0), Ok(0));
        assert_eq!(to_x100(0, 99), Ok(99));
        assert_eq!(to_x100(28, 0), Ok(2800));
    }

    #[test]
    fn test_to_x100_rejects_fraction_of_100() {
        assert_eq!(
            to_x100(1, 100),
            Err(CodecError::InvalidFraction { hundredths: 100 })
        );
        assert!(matches!(
            to_x100(0, u64::MAX),
            Err(CodecError::InvalidFraction { .. })
        ));
    }

    #[test]
    fn test_to_x100_overflow() {
        assert!(matches!(
            to_x100(u64::MAX, 0),
            Err(CodecError::Overflow { .. })
        ));
        // Largest whole that still fits
        let max_whole = u64::MAX / 100;
        assert!(to_x100(max_whole, 0).is_ok());
    }

    #[test]
    fn test_from_x100() {
        assert_eq!(from_x100(2753), Parts::new(27, 53));
        assert_eq!(from_x100(5), Parts::new(0, 5));
        assert_eq!(from_x100(0), Parts::default());
    }

    #[test]
    fn test_parts_display() {
        assert_eq!(Parts::new(27, 53).to_string(), "27.53");
        assert_eq!(Parts::new(7, 5).to_string(), "7.05");
        assert_eq!(Parts::new(0, 0).to_string(), "0.00");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!("27.53".parse::<Parts>(), Ok(Parts::new(27, 53)));
        assert_eq!("28".parse::<Parts>(), Ok(Parts::new(28, 0)));
        assert_eq!("7.5".parse::<Parts>(), Ok(Parts::new(7, 50)));
        assert_eq!("7.05".parse::<Parts>(), Ok(Parts::new(7, 5)));
        assert_eq!(" 35.00 ".parse::<Parts>(), Ok(Parts::new(35, 0)));
    }

    #[test]
    fn test_parse_decimal_rejects_bad_input() {
        for bad in ["", ".", "1.", ".5", "-1.00", "+1", "1.234", "1e3", "abc", "1.a"] {
            assert!(
                matches!(bad.parse::<Parts>(), Err(CodecError::InvalidDecimal(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }
}
