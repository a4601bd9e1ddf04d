//! Version-dependent packing of record metadata into the item identifier.
//!
//! Every record version has one fixed [`IdentLayout`]; readers and writers go
//! through [`IdentLayout::pack`] and [`IdentLayout::unpack`] only.

use tracing::warn;

use crate::{AdcError, AdcResult};

/// Which of the two raw-data record kinds an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Sums,
    Samples,
}

/// Metadata carried in the identifier.
///
/// `counts` (pixels, gains) is only present for layouts that pack them;
/// later versions store the counts in the record body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentFields {
    pub tel_id: i32,
    pub zero_sup_mode: u8,
    pub data_red_mode: u8,
    pub list_known: bool,
    pub counts: Option<(usize, usize)>,
}

/// Bit layout of the identifier for one record version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentLayout {
    /// Version 0: 5-bit telescope ID, 11-bit pixel count.
    Legacy0,
    /// Version 1: 8-bit telescope ID, 12-bit pixel count.
    Legacy1,
    /// Sum versions 2 to 4: 19-bit telescope ID, counts in the body.
    SumModern,
    /// Sample versions 2 to 4: 16-bit telescope ID, counts in the body.
    SampleModern,
}

const MODE_MASK: u32 = 0x1F;
const ZERO_SUP_SHIFT: u32 = 5;
const DATA_RED_SHIFT: u32 = 10;
const LIST_KNOWN_BIT: u32 = 1 << 15;
const PIXELS_SHIFT: u32 = 16;
const TEL_LOW_MASK: u32 = 0x1F;

const LEGACY0_PIXEL_MASK: u32 = 0x7FF;
const LEGACY0_TWO_GAINS: u32 = 1 << 27;
const LEGACY1_PIXEL_MASK: u32 = 0xFFF;
const LEGACY1_TWO_GAINS: u32 = 1 << 28;
const LEGACY1_TEL_SHIFT: u32 = 29;
const LEGACY1_TEL_HIGH_MASK: u32 = 0x7;

const SUM_TEL_HIGH_SHIFT: u32 = 16;
const SUM_TEL_HIGH_MASK: u32 = 0x3FFF;

const SAMPLE_DATA_RED_SHIFT: u32 = 5;
const SAMPLE_LIST_KNOWN_BIT: u32 = 1 << 10;
const SAMPLE_TEL_SHIFT: u32 = 12;
const SAMPLE_TEL_MASK: u32 = 0xFFFF;

impl IdentLayout {
    pub fn for_record(kind: RecordKind, version: u32) -> Self {
        match (kind, version) {
            (_, 0) => IdentLayout::Legacy0,
            (_, 1) => IdentLayout::Legacy1,
            (RecordKind::Sums, _) => IdentLayout::SumModern,
            (RecordKind::Samples, _) => IdentLayout::SampleModern,
        }
    }

    /// Largest telescope ID the layout can represent exactly.
    pub fn max_tel_id(self) -> i32 {
        match self {
            IdentLayout::Legacy0 => 0x1F,
            IdentLayout::Legacy1 => 0xFF,
            IdentLayout::SumModern => 0x7_FFFF,
            IdentLayout::SampleModern => 0xFFFF,
        }
    }

    /// Largest pixel count for layouts with counts in the identifier.
    pub fn max_pixels(self) -> Option<usize> {
        match self {
            IdentLayout::Legacy0 => Some(LEGACY0_PIXEL_MASK as usize),
            IdentLayout::Legacy1 => Some(LEGACY1_PIXEL_MASK as usize),
            IdentLayout::SumModern | IdentLayout::SampleModern => None,
        }
    }

    pub fn packs_counts(self) -> bool {
        self.max_pixels().is_some()
    }

    /// Whether a decoded telescope ID identifies `expected`.
    ///
    /// Version 0 only carries the low 5 bits, so IDs 32 apart are ambiguous.
    pub fn same_telescope(self, expected: i32, found: i32) -> bool {
        match self {
            IdentLayout::Legacy0 => expected as u32 & TEL_LOW_MASK == found as u32,
            _ => expected == found,
        }
    }

    pub fn pack(self, fields: &IdentFields) -> AdcResult<i32> {
        let tel = self.checked_tel_id(fields.tel_id)?;
        if self.packs_counts() != fields.counts.is_some() {
            return Err(AdcError::ValueOutOfRange {
                what: "identifier pixel count",
                value: fields.counts.map_or(-1, |(np, _)| np as i64),
            });
        }
        let zs = u32::from(fields.zero_sup_mode) & MODE_MASK;
        let dr = u32::from(fields.data_red_mode) & MODE_MASK;
        let word = match self {
            IdentLayout::Legacy0 | IdentLayout::Legacy1 => {
                let mut word = (tel & TEL_LOW_MASK)
                    | zs << ZERO_SUP_SHIFT
                    | dr << DATA_RED_SHIFT
                    | u32::from(fields.list_known) * LIST_KNOWN_BIT;
                if let Some((np, ng)) = fields.counts {
                    word |= self.pack_counts(np, ng)?;
                }
                if self == IdentLayout::Legacy1 {
                    word |= (tel >> 5 & LEGACY1_TEL_HIGH_MASK) << LEGACY1_TEL_SHIFT;
                }
                word
            }
            IdentLayout::SumModern => {
                (tel & TEL_LOW_MASK)
                    | zs << ZERO_SUP_SHIFT
                    | dr << DATA_RED_SHIFT
                    | u32::from(fields.list_known) * LIST_KNOWN_BIT
                    | (tel >> 5 & SUM_TEL_HIGH_MASK) << SUM_TEL_HIGH_SHIFT
            }
            IdentLayout::SampleModern => {
                zs | dr << SAMPLE_DATA_RED_SHIFT
                    | u32::from(fields.list_known) * SAMPLE_LIST_KNOWN_BIT
                    | (tel & SAMPLE_TEL_MASK) << SAMPLE_TEL_SHIFT
            }
        };
        Ok(word as i32)
    }

    pub fn unpack(self, ident: i32) -> IdentFields {
        let word = ident as u32;
        match self {
            IdentLayout::Legacy0 | IdentLayout::Legacy1 => {
                let (pixel_mask, two_gains) = if self == IdentLayout::Legacy0 {
                    (LEGACY0_PIXEL_MASK, LEGACY0_TWO_GAINS)
                } else {
                    (LEGACY1_PIXEL_MASK, LEGACY1_TWO_GAINS)
                };
                let mut tel = word & TEL_LOW_MASK;
                if self == IdentLayout::Legacy1 {
                    tel |= (word >> LEGACY1_TEL_SHIFT & LEGACY1_TEL_HIGH_MASK) << 5;
                }
                IdentFields {
                    tel_id: tel as i32,
                    zero_sup_mode: (word >> ZERO_SUP_SHIFT & MODE_MASK) as u8,
                    data_red_mode: (word >> DATA_RED_SHIFT & MODE_MASK) as u8,
                    list_known: word & LIST_KNOWN_BIT != 0,
                    counts: Some((
                        (word >> PIXELS_SHIFT & pixel_mask) as usize,
                        if word & two_gains != 0 { 2 } else { 1 },
                    )),
                }
            }
            IdentLayout::SumModern => IdentFields {
                tel_id: ((word & TEL_LOW_MASK) | (word >> SUM_TEL_HIGH_SHIFT & SUM_TEL_HIGH_MASK) << 5)
                    as i32,
                zero_sup_mode: (word >> ZERO_SUP_SHIFT & MODE_MASK) as u8,
                data_red_mode: (word >> DATA_RED_SHIFT & MODE_MASK) as u8,
                list_known: word & LIST_KNOWN_BIT != 0,
                counts: None,
            },
            IdentLayout::SampleModern => IdentFields {
                tel_id: (word >> SAMPLE_TEL_SHIFT & SAMPLE_TEL_MASK) as i32,
                zero_sup_mode: (word & MODE_MASK) as u8,
                data_red_mode: (word >> SAMPLE_DATA_RED_SHIFT & MODE_MASK) as u8,
                list_known: word & SAMPLE_LIST_KNOWN_BIT != 0,
                counts: None,
            },
        }
    }

    fn checked_tel_id(self, tel_id: i32) -> AdcResult<u32> {
        if self == IdentLayout::Legacy0 {
            if !(0..=self.max_tel_id()).contains(&tel_id) {
                warn!(
                    tel_id,
                    stored = tel_id & 0x1F,
                    "telescope ID truncated to 5 bits in version 0 record"
                );
            }
            return Ok(tel_id as u32 & TEL_LOW_MASK);
        }
        if !(0..=self.max_tel_id()).contains(&tel_id) {
            return Err(AdcError::ValueOutOfRange {
                what: "telescope ID",
                value: i64::from(tel_id),
            });
        }
        Ok(tel_id as u32)
    }

    fn pack_counts(self, num_pixels: usize, num_gains: usize) -> AdcResult<u32> {
        let (pixel_mask, two_gains) = match self {
            IdentLayout::Legacy0 => (LEGACY0_PIXEL_MASK, LEGACY0_TWO_GAINS),
            _ => (LEGACY1_PIXEL_MASK, LEGACY1_TWO_GAINS),
        };
        if num_pixels > pixel_mask as usize {
            return Err(AdcError::PixelLimit {
                pixels: num_pixels,
                max: pixel_mask as usize,
            });
        }
        let gains = if num_gains == 2 { two_gains } else { 0 };
        Ok((num_pixels as u32) << PIXELS_SHIFT | gains)
    }
}
