//! In-memory raw camera data of one telescope in one event.

use crate::{AdcError, AdcResult};

/// Largest supported number of pixels per camera.
pub const MAX_PIXELS: usize = 65536;
/// Largest supported number of gain channels per pixel.
pub const MAX_GAINS: usize = 2;
/// Largest supported number of time slices per trace.
pub const MAX_SAMPLES: usize = 256;

/// Index of the high-gain channel.
pub const HI_GAIN: usize = 0;
/// Index of the low-gain channel.
pub const LO_GAIN: usize = 1;

/// `significant` bit: the pixel has a sum value.
pub const SIGNIFICANT_SUM: u8 = 0x01;
/// `significant` bit: the pixel has sample values.
pub const SIGNIFICANT_SAMPLES: u8 = 0x20;

/// `adc_known` bit: sum recorded.
pub const KNOWN_SUM: u8 = 0x01;
/// `adc_known` bit: samples recorded.
pub const KNOWN_SAMPLES: u8 = 0x02;
/// `adc_known` bit: channel was in saturation.
///
/// Set by the caller only. It is not carried in sum or sample records, so
/// decoded data never has it.
pub const KNOWN_SATURATED: u8 = 0x04;

/// Mode bit carrying the sample-mode policy in `zero_sup_mode`/`data_red_mode`.
pub const SAMPLE_MODE_FLAG: u8 = 0x20;
/// Mask of the sum-mode policy in `zero_sup_mode`/`data_red_mode`.
pub const SUM_MODE_MASK: u8 = 0x1F;

/// One entry of the significant-pixel list, with its per-pixel markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListEntry {
    pub pixel: usize,
    /// Low-gain amplitude follows for this pixel.
    pub low_gain: bool,
    /// High-gain amplitude was stored in the narrow 8-bit form.
    pub narrow_hg: bool,
}

impl ListEntry {
    /// Entry without markup, as supplied by callers building a list.
    pub fn pixel(pixel: usize) -> Self {
        ListEntry {
            pixel,
            ..ListEntry::default()
        }
    }
}

/// ADC data of one telescope, either integrated sums, sampled traces, or both.
///
/// Arrays are indexed `[gain][pixel]`; traces are stored flat with
/// `num_samples` values per pixel. Only the first `num_pixels` entries (and
/// `num_gains` gains) are meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdcData {
    /// Set if and only if the data is valid.
    pub known: bool,
    /// Telescope ID; when reading it is the expected ID.
    pub tel_id: i32,
    pub num_pixels: usize,
    pub num_gains: usize,
    pub num_samples: usize,
    /// Low 5 bits: sum-mode zero suppression; [`SAMPLE_MODE_FLAG`]: sample mode.
    pub zero_sup_mode: u8,
    /// Low 5 bits: sum-mode data reduction; [`SAMPLE_MODE_FLAG`]: sample mode.
    pub data_red_mode: u8,
    /// Offset of the 8-bit high-gain form; values `<= 0` are derived on write.
    pub offset_hg8: i32,
    /// Scale of the 8-bit high-gain form, clamped to `1..=100`.
    pub scale_hg8: i32,
    /// High-gain level above which low gain is kept (bitmap mode, reduction 2).
    pub threshold: i32,
    /// Whether `list` holds the significant pixels for list mode.
    pub list_known: bool,
    pub list: Vec<ListEntry>,
    pub significant: Vec<u8>,
    pub adc_known: [Vec<u8>; MAX_GAINS],
    pub adc_sum: [Vec<u32>; MAX_GAINS],
    pub adc_sample: [Vec<u16>; MAX_GAINS],
}

impl AdcData {
    /// Allocates zeroed data for the given camera layout.
    pub fn new(
        tel_id: i32,
        num_pixels: usize,
        num_gains: usize,
        num_samples: usize,
    ) -> AdcResult<Self> {
        let mut raw = AdcData {
            known: false,
            tel_id,
            num_pixels: 0,
            num_gains: 0,
            num_samples: 0,
            zero_sup_mode: 0,
            data_red_mode: 0,
            offset_hg8: 0,
            scale_hg8: 1,
            threshold: 0,
            list_known: false,
            list: Vec::new(),
            significant: Vec::new(),
            adc_known: Default::default(),
            adc_sum: Default::default(),
            adc_sample: Default::default(),
        };
        raw.resize(num_pixels, num_gains, num_samples)?;
        Ok(raw)
    }

    /// Checks a camera layout against the compiled limits.
    pub fn check_limits(num_pixels: usize, num_gains: usize, num_samples: usize) -> AdcResult<()> {
        if num_pixels > MAX_PIXELS {
            return Err(AdcError::PixelLimit {
                pixels: num_pixels,
                max: MAX_PIXELS,
            });
        }
        if num_gains == 0 || num_gains > MAX_GAINS {
            return Err(AdcError::GainLimit {
                gains: num_gains,
                max: MAX_GAINS,
            });
        }
        if num_samples > MAX_SAMPLES {
            return Err(AdcError::SampleLimit {
                samples: num_samples,
                max: MAX_SAMPLES,
            });
        }
        Ok(())
    }

    /// Checks the declared layout against the limits and the allocated arrays.
    ///
    /// Fails when the public counts were changed without [`AdcData::resize`].
    pub fn check_layout(&self) -> AdcResult<()> {
        let (n, s) = (self.num_pixels, self.num_samples);
        Self::check_limits(n, self.num_gains, s)?;
        let pixels = (0..MAX_GAINS)
            .map(|g| self.adc_known[g].len().min(self.adc_sum[g].len()))
            .fold(self.significant.len(), usize::min);
        if n > pixels {
            return Err(AdcError::PixelLimit { pixels: n, max: pixels });
        }
        let values = self.adc_sample.iter().map(Vec::len).min().unwrap_or(0);
        if n * s > values {
            return Err(AdcError::SampleLimit {
                samples: s,
                max: values.checked_div(n).unwrap_or(0),
            });
        }
        Ok(())
    }

    /// Changes the camera layout, growing the arrays where needed.
    ///
    /// A different pixel count resets all data. A different sample count
    /// only drops the traces, and a different gain count keeps everything,
    /// so sums and traces of the same camera can be read in either order.
    pub fn resize(
        &mut self,
        num_pixels: usize,
        num_gains: usize,
        num_samples: usize,
    ) -> AdcResult<()> {
        Self::check_limits(num_pixels, num_gains, num_samples)?;
        let layout_changed = num_pixels != self.num_pixels;
        let samples_changed = layout_changed || num_samples != self.num_samples;
        self.num_pixels = num_pixels;
        self.num_gains = num_gains;
        self.num_samples = num_samples;
        if self.significant.len() < num_pixels {
            self.significant.resize(num_pixels, 0);
        }
        for gain in 0..MAX_GAINS {
            if self.adc_known[gain].len() < num_pixels {
                self.adc_known[gain].resize(num_pixels, 0);
                self.adc_sum[gain].resize(num_pixels, 0);
            }
            if samples_changed {
                self.adc_sample[gain].clear();
                self.adc_sample[gain].resize(num_pixels * num_samples, 0);
            }
        }
        if layout_changed {
            self.reset();
        } else if samples_changed {
            self.clear_samples();
        }
        Ok(())
    }

    /// Prepares for the next event of this telescope.
    ///
    /// Clears the flags, sums and the pixel list. Traces are left in place and
    /// are only meaningful where [`KNOWN_SAMPLES`] is set.
    pub fn reset(&mut self) {
        self.known = false;
        self.list_known = false;
        self.list.clear();
        let n = self.num_pixels;
        self.significant[..n].fill(0);
        for gain in 0..MAX_GAINS {
            self.adc_known[gain][..n].fill(0);
            self.adc_sum[gain][..n].fill(0);
        }
    }

    /// Drops all sum information, keeping traces and their flags.
    pub fn clear_sums(&mut self) {
        self.list_known = false;
        self.list.clear();
        let n = self.num_pixels;
        for s in &mut self.significant[..n] {
            *s &= !SIGNIFICANT_SUM;
        }
        for gain in 0..MAX_GAINS {
            for k in &mut self.adc_known[gain][..n] {
                *k &= !KNOWN_SUM;
            }
            self.adc_sum[gain][..n].fill(0);
        }
    }

    /// Drops all trace flags, keeping sums and their flags.
    pub fn clear_samples(&mut self) {
        let n = self.num_pixels;
        for s in &mut self.significant[..n] {
            *s &= !SIGNIFICANT_SAMPLES;
        }
        for gain in 0..MAX_GAINS {
            for k in &mut self.adc_known[gain][..n] {
                *k &= !KNOWN_SAMPLES;
            }
        }
    }

    /// Whether any channel has a known sum.
    pub fn has_sums(&self) -> bool {
        self.any_known(KNOWN_SUM)
    }

    /// Whether any channel has known samples.
    pub fn has_samples(&self) -> bool {
        self.any_known(KNOWN_SAMPLES)
    }

    fn any_known(&self, flag: u8) -> bool {
        let n = self.num_pixels;
        self.adc_known
            .iter()
            .any(|known| known[..n].iter().any(|&k| k & flag != 0))
    }

    /// Trace of one channel.
    pub fn samples(&self, gain: usize, pixel: usize) -> &[u16] {
        let start = pixel * self.num_samples;
        &self.adc_sample[gain][start..start + self.num_samples]
    }

    pub fn samples_mut(&mut self, gain: usize, pixel: usize) -> &mut [u16] {
        let start = pixel * self.num_samples;
        &mut self.adc_sample[gain][start..start + self.num_samples]
    }

    pub fn list_size(&self) -> usize {
        self.list.len()
    }

    /// Sum-mode zero suppression field.
    pub fn sum_zero_sup_mode(&self) -> u8 {
        self.zero_sup_mode & SUM_MODE_MASK
    }

    /// Sum-mode data reduction field.
    pub fn sum_data_red_mode(&self) -> u8 {
        self.data_red_mode & SUM_MODE_MASK
    }

    /// Whether traces are zero-suppressed.
    pub fn sample_zero_sup(&self) -> bool {
        self.zero_sup_mode & SAMPLE_MODE_FLAG != 0
    }

    /// Whether low-gain traces are suppressed separately.
    pub fn sample_data_red(&self) -> bool {
        self.data_red_mode & SAMPLE_MODE_FLAG != 0
    }

    /// Sets a sum and marks it known and significant.
    pub fn set_sum(&mut self, gain: usize, pixel: usize, value: u32) {
        self.adc_sum[gain][pixel] = value;
        self.adc_known[gain][pixel] |= KNOWN_SUM;
        self.significant[pixel] |= SIGNIFICANT_SUM;
    }

    /// Copies a trace and marks it known and significant.
    pub fn set_samples(&mut self, gain: usize, pixel: usize, trace: &[u16]) {
        self.samples_mut(gain, pixel).copy_from_slice(trace);
        self.adc_known[gain][pixel] |= KNOWN_SAMPLES;
        self.significant[pixel] |= SIGNIFICANT_SAMPLES;
    }
}
