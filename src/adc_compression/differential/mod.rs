//! Amplitude vectors on the wire: signed differences from the previous value,
//! or the legacy fixed 16-bit form.

use crate::{AdcError, AdcResult, ByteBuffer, ByteCursor};

/// Largest value of the legacy fixed-width form.
pub const LEGACY_MAX: u32 = u16::MAX as u32;

/// Unsigned amplitude types stored in [`crate::AdcData`].
pub trait Amplitude: Copy {
    const NAME: &'static str;

    fn to_i64(self) -> i64;

    fn from_i64(value: i64) -> Option<Self>;
}

impl Amplitude for u32 {
    const NAME: &'static str = "32-bit amplitude";

    fn to_i64(self) -> i64 {
        i64::from(self)
    }

    fn from_i64(value: i64) -> Option<Self> {
        u32::try_from(value).ok()
    }
}

impl Amplitude for u16 {
    const NAME: &'static str = "16-bit amplitude";

    fn to_i64(self) -> i64 {
        i64::from(self)
    }

    fn from_i64(value: i64) -> Option<Self> {
        u16::try_from(value).ok()
    }
}

/// Writes every value as the signed difference from its predecessor
/// (the first one from zero).
///
/// Neighbouring pixels and time slices share a pedestal, so most differences
/// take one or two bytes.
pub fn encode_deltas<T: Amplitude>(values: &[T], buf: &mut ByteBuffer) {
    let mut previous = 0i64;
    for &v in values {
        let v = v.to_i64();
        buf.put_scount(v - previous);
        previous = v;
    }
}

/// Inverse of [`encode_deltas`], filling all of `out`.
pub fn decode_deltas<T: Amplitude>(cursor: &mut ByteCursor<'_>, out: &mut [T]) -> AdcResult<()> {
    // every difference takes at least one byte
    cursor.require(out.len())?;
    let mut previous = 0i64;
    for slot in out.iter_mut() {
        let delta = cursor.get_scount()?;
        previous = previous
            .checked_add(delta)
            .ok_or(AdcError::ValueOutOfRange {
                what: T::NAME,
                value: delta,
            })?;
        *slot = T::from_i64(previous).ok_or(AdcError::ValueOutOfRange {
            what: T::NAME,
            value: previous,
        })?;
    }
    Ok(())
}

/// Writes values as fixed `u16`, clamping anything above [`LEGACY_MAX`].
///
/// The clamp cannot be undone; a clamped value reads back as exactly 65535.
pub fn put_saturated_u16<T: Amplitude>(values: &[T], buf: &mut ByteBuffer) {
    for &v in values {
        buf.put_u16(v.to_i64().clamp(0, i64::from(LEGACY_MAX)) as u16);
    }
}

/// Reads fixed `u16` values into `out`.
pub fn get_u16_values<T: Amplitude>(cursor: &mut ByteCursor<'_>, out: &mut [T]) -> AdcResult<()> {
    cursor.require(2 * out.len())?;
    for slot in out.iter_mut() {
        let v = i64::from(cursor.get_u16()?);
        *slot = T::from_i64(v).ok_or(AdcError::ValueOutOfRange {
            what: T::NAME,
            value: v,
        })?;
    }
    Ok(())
}

/// How a record version stores amplitude vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCoding {
    /// Fixed `u16`, saturating (versions 0 to 2)
    Fixed16,
    /// Signed variable-length differences (version 3 and later)
    Differential,
}

impl ValueCoding {
    /// First record version using differences.
    pub const DIFFERENTIAL_SINCE: u32 = 3;

    pub fn for_version(version: u32) -> Self {
        if version >= Self::DIFFERENTIAL_SINCE {
            ValueCoding::Differential
        } else {
            ValueCoding::Fixed16
        }
    }

    pub fn put<T: Amplitude>(self, values: &[T], buf: &mut ByteBuffer) {
        match self {
            ValueCoding::Fixed16 => put_saturated_u16(values, buf),
            ValueCoding::Differential => encode_deltas(values, buf),
        }
    }

    pub fn get<T: Amplitude>(self, cursor: &mut ByteCursor<'_>, out: &mut [T]) -> AdcResult<()> {
        match self {
            ValueCoding::Fixed16 => get_u16_values(cursor, out),
            ValueCoding::Differential => decode_deltas(cursor, out),
        }
    }

    /// Smallest number of bytes `n` values can occupy.
    pub fn min_bytes(self, n: usize) -> usize {
        match self {
            ValueCoding::Fixed16 => 2 * n,
            ValueCoding::Differential => n,
        }
    }
}
