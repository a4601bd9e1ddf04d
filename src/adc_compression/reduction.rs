//! Data reduction of sums: optional low gain and the 8-bit high-gain form.

use crate::adc_compression::zero_suppression::ZeroSuppression;
use crate::raw_data::{AdcData, HI_GAIN, KNOWN_SUM, LO_GAIN};

/// Sum-mode data reduction as stored in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataReduction {
    /// Mode 0: both gains at full width
    None,
    /// Mode 1: low gain only where flagged
    LowGainOptional,
    /// Mode 2: as mode 1, plus 8-bit high gain where it fits
    NarrowHighGain,
}

impl DataReduction {
    pub fn from_mode(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(DataReduction::None),
            1 => Some(DataReduction::LowGainOptional),
            2 => Some(DataReduction::NarrowHighGain),
            _ => None,
        }
    }

    pub fn mode(self) -> u8 {
        match self {
            DataReduction::None => 0,
            DataReduction::LowGainOptional => 1,
            DataReduction::NarrowHighGain => 2,
        }
    }

    /// Whether the per-pixel low-gain flag is transmitted.
    pub fn has_markup(self) -> bool {
        self != DataReduction::None
    }

    /// Whether the low-gain sum of `pixel` is written.
    ///
    /// Mode 2 with bitmap suppression tests the high-gain sum against
    /// `threshold`; everywhere else the low-gain known bit decides.
    pub fn low_gain_present(self, zero_sup: ZeroSuppression, raw: &AdcData, pixel: usize) -> bool {
        if raw.num_gains < 2 {
            return false;
        }
        match (self, zero_sup) {
            (DataReduction::None, _) => true,
            (DataReduction::NarrowHighGain, ZeroSuppression::Bitmap) => {
                i64::from(raw.adc_sum[HI_GAIN][pixel]) > i64::from(raw.threshold)
            }
            _ => raw.adc_known[LO_GAIN][pixel] & KNOWN_SUM != 0,
        }
    }
}

/// Affine 8-bit form of high-gain sums: `amplitude ≈ v8 * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hg8Quantizer {
    pub offset: i32,
    pub scale: i32,
}

impl Hg8Quantizer {
    pub const MIN_SCALE: i32 = 1;
    pub const MAX_SCALE: i32 = 100;
    /// Quantized values must stay below this.
    pub const NARROW_LIMIT: i64 = 255;

    pub fn new(offset: i32, scale: i32) -> Self {
        Hg8Quantizer {
            offset,
            scale: scale.clamp(Self::MIN_SCALE, Self::MAX_SCALE),
        }
    }

    /// Quantizer for writing `raw`.
    ///
    /// A non-positive `offset_hg8` is replaced by the mean high-gain sum.
    pub fn for_data(raw: &AdcData) -> Self {
        let offset = if raw.offset_hg8 > 0 {
            raw.offset_hg8
        } else {
            let sums = &raw.adc_sum[HI_GAIN][..raw.num_pixels];
            let total: u64 = sums.iter().map(|&a| u64::from(a)).sum();
            total
                .checked_div(sums.len() as u64)
                .map_or(0, |mean| mean.min(i32::MAX as u64) as i32)
        };
        Hg8Quantizer::new(offset, raw.scale_hg8)
    }

    /// The 8-bit value for `amplitude`, if it lies in the narrow range.
    pub fn quantize(self, amplitude: u32) -> Option<u8> {
        let scale = i64::from(self.scale);
        let d = i64::from(amplitude) - i64::from(self.offset);
        let v8 = (d + scale / 2).div_euclid(scale);
        (0..Self::NARROW_LIMIT).contains(&v8).then_some(v8 as u8)
    }

    pub fn restore(self, v8: u8) -> u32 {
        let a = i64::from(v8) * i64::from(self.scale) + i64::from(self.offset);
        a.clamp(0, i64::from(u32::MAX)) as u32
    }
}
