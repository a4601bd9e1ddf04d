//! Zero suppression: which pixels are transmitted at all.
//!
//! Sum records use per-group bitmaps or an explicit pixel list; sample
//! records use lists of closed pixel ranges.

use tracing::debug;

use crate::adc_compression::helpers::fits_i16;
use crate::raw_data::ListEntry;
use crate::{AdcError, AdcResult, ByteBuffer, ByteCursor};

/// Sum-mode zero suppression as stored in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroSuppression {
    /// Mode 0: every pixel in order
    None,
    /// Mode 1: a significance word per group of 16 pixels
    Bitmap,
    /// Mode 2: an explicit list of significant pixels
    List,
}

impl ZeroSuppression {
    pub fn from_mode(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(ZeroSuppression::None),
            1 => Some(ZeroSuppression::Bitmap),
            2 => Some(ZeroSuppression::List),
            _ => None,
        }
    }

    pub fn mode(self) -> u8 {
        match self {
            ZeroSuppression::None => 0,
            ZeroSuppression::Bitmap => 1,
            ZeroSuppression::List => 2,
        }
    }

    /// Picks the mode actually written.
    ///
    /// A requested list that the caller did not supply is replaced by
    /// whatever suits the density of `significant` pixels: a list when under
    /// 1/16 of the camera is significant, no suppression above 15/16, and the
    /// bitmap in between.
    pub fn select(self, list_known: bool, significant: usize, num_pixels: usize) -> Self {
        if self != ZeroSuppression::List || list_known {
            return self;
        }
        let selected = if significant * 16 < num_pixels {
            ZeroSuppression::List
        } else if significant * 16 > 15 * num_pixels {
            ZeroSuppression::None
        } else {
            ZeroSuppression::Bitmap
        };
        debug!(significant, num_pixels, ?selected, "zero suppression selected");
        selected
    }
}

/// Encoding of the pixel list of sum records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLayout {
    /// `i16` size and entries: 13-bit index, markup in bits 13 and 14
    Short13,
    /// `count` size and entries: 21-bit index, markup in bits 21 and 22
    Count21,
}

impl ListLayout {
    pub fn for_version(version: u32) -> Self {
        if version >= 4 {
            ListLayout::Count21
        } else {
            ListLayout::Short13
        }
    }

    fn index_bits(self) -> u32 {
        match self {
            ListLayout::Short13 => 13,
            ListLayout::Count21 => 21,
        }
    }

    /// Largest pixel index an entry can hold.
    pub fn max_index(self) -> usize {
        (1 << self.index_bits()) - 1
    }

    pub fn pack(self, entry: ListEntry) -> u32 {
        let bits = self.index_bits();
        entry.pixel as u32
            | u32::from(entry.low_gain) << bits
            | u32::from(entry.narrow_hg) << (bits + 1)
    }

    pub fn unpack(self, value: u32) -> ListEntry {
        let bits = self.index_bits();
        ListEntry {
            pixel: (value & ((1 << bits) - 1)) as usize,
            low_gain: value >> bits & 1 != 0,
            narrow_hg: value >> (bits + 1) & 1 != 0,
        }
    }

    /// Writes the list size and entries. Markup bits are left out unless
    /// `with_markup` is set.
    pub fn put_list(
        self,
        entries: &[ListEntry],
        with_markup: bool,
        buf: &mut ByteBuffer,
    ) -> AdcResult<()> {
        if let Some(e) = entries.iter().find(|e| e.pixel > self.max_index()) {
            return Err(AdcError::ImplausibleList(format!(
                "pixel {} does not fit a {}-bit list entry",
                e.pixel,
                self.index_bits()
            )));
        }
        let value = |e: &ListEntry| {
            if with_markup {
                self.pack(*e)
            } else {
                e.pixel as u32
            }
        };
        match self {
            ListLayout::Short13 => {
                if !fits_i16(entries.len()) {
                    return Err(AdcError::ImplausibleList(format!(
                        "{} entries do not fit a 16-bit list size",
                        entries.len()
                    )));
                }
                buf.put_i16(entries.len() as i16);
                for e in entries {
                    buf.put_i16(value(e) as i16);
                }
            }
            ListLayout::Count21 => {
                buf.put_count(entries.len() as u64);
                for e in entries {
                    buf.put_count(u64::from(value(e)));
                }
            }
        }
        Ok(())
    }

    /// Reads a list written by [`ListLayout::put_list`], checking that it is
    /// strictly increasing and within `num_pixels`.
    pub fn get_list(
        self,
        cursor: &mut ByteCursor<'_>,
        num_pixels: usize,
        with_markup: bool,
    ) -> AdcResult<Vec<ListEntry>> {
        let size = match self {
            ListLayout::Short13 => i64::from(cursor.get_i16()?),
            ListLayout::Count21 => i64::try_from(cursor.get_count()?).unwrap_or(i64::MAX),
        };
        if size < 0 || size as u64 > num_pixels as u64 {
            return Err(AdcError::ImplausibleList(format!(
                "list size {size} with {num_pixels} pixels"
            )));
        }
        let size = size as usize;
        cursor.require(match self {
            ListLayout::Short13 => 2 * size,
            ListLayout::Count21 => size,
        })?;
        let mut entries = Vec::with_capacity(size);
        for _ in 0..size {
            let value = match self {
                ListLayout::Short13 => u32::from(cursor.get_i16()? as u16),
                ListLayout::Count21 => cursor.get_count32()?,
            };
            if value >> (self.index_bits() + 2) != 0 {
                return Err(AdcError::ImplausibleList(format!(
                    "bits above the markup set in list entry {value:#x}"
                )));
            }
            let mut entry = self.unpack(value);
            if !with_markup {
                if entry.low_gain || entry.narrow_hg {
                    return Err(AdcError::ImplausibleList(format!(
                        "markup bits set in list entry {value:#x}"
                    )));
                }
                entry = ListEntry::pixel(entry.pixel);
            }
            if entry.pixel >= num_pixels {
                return Err(AdcError::ImplausibleList(format!(
                    "pixel {} out of range for {num_pixels} pixels",
                    entry.pixel
                )));
            }
            if entries
                .last()
                .is_some_and(|last: &ListEntry| last.pixel >= entry.pixel)
            {
                return Err(AdcError::ImplausibleList(format!(
                    "pixel {} out of order",
                    entry.pixel
                )));
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Checks a caller-supplied pixel list before it is written.
pub fn check_list(entries: &[ListEntry], num_pixels: usize) -> AdcResult<()> {
    for (i, e) in entries.iter().enumerate() {
        if e.pixel >= num_pixels {
            return Err(AdcError::ImplausibleList(format!(
                "pixel {} out of range for {num_pixels} pixels",
                e.pixel
            )));
        }
        if i > 0 && entries[i - 1].pixel >= e.pixel {
            return Err(AdcError::ImplausibleList(format!(
                "pixel {} out of order",
                e.pixel
            )));
        }
    }
    Ok(())
}

/// Closed range of significant pixels in a sample record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRange {
    pub start: usize,
    pub end: usize,
}

impl PixelRange {
    pub fn pixels(self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Collapses increasing pixel indices into maximal ranges.
pub fn ranges_from_pixels(pixels: impl IntoIterator<Item = usize>, out: &mut Vec<PixelRange>) {
    out.clear();
    for p in pixels {
        match out.last_mut() {
            Some(r) if r.end + 1 == p => r.end = p,
            _ => out.push(PixelRange { start: p, end: p }),
        }
    }
}

/// Writes a range list; a single pixel `p` is stored as `-p - 1`.
pub fn put_ranges(ranges: &[PixelRange], buf: &mut ByteBuffer) {
    buf.put_scount(ranges.len() as i64);
    for r in ranges {
        if r.start == r.end {
            buf.put_scount(-(r.start as i64) - 1);
        } else {
            buf.put_scount(r.start as i64);
            buf.put_scount(r.end as i64);
        }
    }
}

/// Reads a range list, requiring disjoint increasing ranges below `num_pixels`.
pub fn get_ranges(
    cursor: &mut ByteCursor<'_>,
    num_pixels: usize,
    out: &mut Vec<PixelRange>,
) -> AdcResult<()> {
    out.clear();
    let count = cursor.get_scount()?;
    if count < 0 || count as u64 > num_pixels as u64 {
        return Err(AdcError::ImplausibleList(format!(
            "range count {count} with {num_pixels} pixels"
        )));
    }
    cursor.require(count as usize)?;
    let mut next_free = 0i64;
    for _ in 0..count {
        let first = cursor.get_scount()?;
        let (start, end) = if first < 0 {
            (!first, !first)
        } else {
            (first, cursor.get_scount()?)
        };
        if start < next_free || end < start || end >= num_pixels as i64 {
            return Err(AdcError::ImplausibleList(format!(
                "pixel range {start}..={end} with {num_pixels} pixels"
            )));
        }
        next_free = end + 1;
        out.push(PixelRange {
            start: start as usize,
            end: end as usize,
        });
    }
    Ok(())
}
