//! Sampled ADC traces (item type 2013).

use tracing::debug;

use crate::adc_compression::differential::ValueCoding;
use crate::adc_compression::ident::{IdentFields, IdentLayout, RecordKind};
use crate::adc_compression::sums::get_counts;
use crate::adc_compression::zero_suppression::{get_ranges, put_ranges, ranges_from_pixels, PixelRange};
use crate::item::{Item, ItemWriter, TYPE_ADC_SAMPLES};
use crate::raw_data::{
    AdcData, KNOWN_SAMPLES, KNOWN_SUM, LO_GAIN, SAMPLE_MODE_FLAG, SIGNIFICANT_SAMPLES,
    SUM_MODE_MASK,
};
use crate::{AdcError, AdcResult, ByteBuffer, RawDataCodec};

/// Newest sample record version.
pub const MAX_SAMPLE_VERSION: u32 = 4;
/// Version written when the data does not need a newer one.
pub const DEFAULT_SAMPLE_VERSION: u32 = 3;

/// Writes and reads full traces, optionally zero-suppressed by pixel ranges.
///
/// Reading never invalidates sums decoded before from the same event.
#[derive(Debug, Default)]
pub struct SampleCodec {
    version: Option<u32>,
    derive_sums: bool,
    ranges: Vec<PixelRange>,
}

impl SampleCodec {
    pub fn new() -> Self {
        SampleCodec::default()
    }

    pub fn with_version(version: u32) -> Self {
        SampleCodec {
            version: Some(version),
            ..SampleCodec::default()
        }
    }

    /// When set, channels with a trace but no known sum get the trace total
    /// as their sum after reading.
    #[must_use]
    pub fn derive_sums(mut self, derive: bool) -> Self {
        self.derive_sums = derive;
        self
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    fn required_version(num_pixels: usize, zero_sup: bool) -> u32 {
        let for_pixels = if num_pixels > i16::MAX as usize {
            4
        } else if num_pixels > 4095 {
            2
        } else if num_pixels > 2047 {
            1
        } else {
            0
        };
        if zero_sup {
            for_pixels.max(ValueCoding::DIFFERENTIAL_SINCE)
        } else {
            for_pixels
        }
    }

    fn choose_version(&self, required: u32) -> AdcResult<u32> {
        match self.version {
            None => Ok(required.max(DEFAULT_SAMPLE_VERSION)),
            Some(version) if version > MAX_SAMPLE_VERSION => Err(AdcError::UnsupportedVersion {
                item_type: TYPE_ADC_SAMPLES,
                version,
                max: MAX_SAMPLE_VERSION,
            }),
            Some(version) if version < required => Err(AdcError::VersionTooLow {
                requested: version,
                required,
            }),
            Some(version) => Ok(version),
        }
    }

    /// Pixels whose `gain` trace is transmitted under zero suppression.
    fn transmitted(raw: &AdcData, gain: usize, pixel: usize) -> bool {
        if gain == LO_GAIN && raw.sample_data_red() {
            raw.adc_known[LO_GAIN][pixel] & KNOWN_SAMPLES != 0
        } else {
            raw.significant[pixel] & SIGNIFICANT_SAMPLES != 0
        }
    }

    fn put_suppressed(&mut self, raw: &AdcData, coding: ValueCoding, out: &mut ByteBuffer) {
        for gain in 0..raw.num_gains {
            ranges_from_pixels(
                (0..raw.num_pixels).filter(|&p| Self::transmitted(raw, gain, p)),
                &mut self.ranges,
            );
            put_ranges(&self.ranges, out);
            for range in &self.ranges {
                for pixel in range.pixels() {
                    coding.put(raw.samples(gain, pixel), out);
                }
            }
        }
    }
}

impl RawDataCodec for SampleCodec {
    fn item_type(&self) -> u32 {
        TYPE_ADC_SAMPLES
    }

    fn max_version(&self) -> u32 {
        MAX_SAMPLE_VERSION
    }

    fn write(&mut self, raw: &AdcData, out: &mut ItemWriter) -> AdcResult<()> {
        let (num_pixels, num_gains, num_samples) = (raw.num_pixels, raw.num_gains, raw.num_samples);
        raw.check_layout()?;
        let zero_sup = raw.sample_zero_sup();
        let version = self.choose_version(Self::required_version(num_pixels, zero_sup))?;
        let layout = IdentLayout::for_record(RecordKind::Samples, version);
        let ident = layout.pack(&IdentFields {
            tel_id: raw.tel_id,
            zero_sup_mode: u8::from(zero_sup),
            data_red_mode: u8::from(raw.sample_data_red()),
            list_known: false,
            counts: layout.packs_counts().then_some((num_pixels, num_gains)),
        })?;
        debug!(
            tel_id = raw.tel_id,
            version,
            zero_sup,
            num_pixels,
            num_samples,
            "writing ADC samples"
        );

        let coding = ValueCoding::for_version(version);
        out.begin_item(TYPE_ADC_SAMPLES, version, ident)?;
        if version >= 4 {
            out.put_count(num_samples as u64);
            out.put_count(num_pixels as u64);
            out.put_count(num_gains as u64);
        } else {
            out.put_i16(num_samples as i16);
            if version >= 2 {
                out.put_i16(num_pixels as i16);
                out.put_i16(num_gains as i16);
            }
        }
        if zero_sup {
            self.put_suppressed(raw, coding, out);
        } else {
            for gain in 0..num_gains {
                for pixel in 0..num_pixels {
                    coding.put(raw.samples(gain, pixel), out);
                }
            }
        }
        out.end_item()
    }

    fn decode(
        &mut self,
        item: &Item<'_>,
        raw: &mut AdcData,
        match_telescope: bool,
    ) -> AdcResult<()> {
        let version = item.header.version;
        let mut body = item.body;
        let layout = IdentLayout::for_record(RecordKind::Samples, version);
        let fields = layout.unpack(item.header.ident);
        if match_telescope && !layout.same_telescope(raw.tel_id, fields.tel_id) {
            return Err(AdcError::TelescopeMismatch {
                expected: raw.tel_id,
                found: fields.tel_id,
            });
        }
        let zero_sup = fields.zero_sup_mode == 1;
        if fields.zero_sup_mode > 1
            || fields.data_red_mode > 1
            || (zero_sup && version < ValueCoding::DIFFERENTIAL_SINCE)
        {
            return Err(AdcError::UnsupportedMode {
                zero_sup_mode: fields.zero_sup_mode,
                data_red_mode: fields.data_red_mode,
                version,
            });
        }

        let num_samples = if version >= 4 {
            usize::try_from(body.get_count()?).unwrap_or(usize::MAX)
        } else {
            let n = body.get_i16()?;
            usize::try_from(n).map_err(|_| AdcError::ValueOutOfRange {
                what: "sample count",
                value: i64::from(n),
            })?
        };
        let (num_pixels, num_gains) = match fields.counts {
            Some(counts) => counts,
            None => get_counts(version, &mut body)?,
        };
        let coding = ValueCoding::for_version(version);
        AdcData::check_limits(num_pixels, num_gains, num_samples)?;
        if !zero_sup {
            body.require(num_gains * num_pixels * coding.min_bytes(num_samples))?;
        }

        // sums of the same camera keep their gain channels visible
        let merged_gains = if num_pixels == raw.num_pixels && raw.has_sums() {
            num_gains.max(raw.num_gains)
        } else {
            num_gains
        };
        raw.resize(num_pixels, merged_gains, num_samples)?;
        raw.clear_samples();
        if !match_telescope {
            raw.tel_id = fields.tel_id;
        }
        raw.zero_sup_mode = raw.zero_sup_mode & SUM_MODE_MASK | SAMPLE_MODE_FLAG * u8::from(zero_sup);
        raw.data_red_mode =
            raw.data_red_mode & SUM_MODE_MASK | SAMPLE_MODE_FLAG * fields.data_red_mode;
        for trace in &mut raw.adc_sample {
            trace[..num_pixels * num_samples].fill(0);
        }

        for gain in 0..num_gains {
            if zero_sup {
                get_ranges(&mut body, num_pixels, &mut self.ranges)?;
            } else {
                self.ranges.clear();
                if num_pixels > 0 {
                    self.ranges.push(PixelRange {
                        start: 0,
                        end: num_pixels - 1,
                    });
                }
            }
            for range in &self.ranges {
                for pixel in range.pixels() {
                    coding.get(&mut body, raw.samples_mut(gain, pixel))?;
                    raw.adc_known[gain][pixel] |= KNOWN_SAMPLES;
                    raw.significant[pixel] |= SIGNIFICANT_SAMPLES;
                }
            }
        }

        if self.derive_sums {
            derive_sums(raw);
        }
        Ok(())
    }
}

/// Fills in sums from traces where no sum is known.
fn derive_sums(raw: &mut AdcData) {
    for gain in 0..raw.num_gains {
        for pixel in 0..raw.num_pixels {
            let known = raw.adc_known[gain][pixel];
            if known & KNOWN_SAMPLES != 0 && known & KNOWN_SUM == 0 {
                let total = raw
                    .samples(gain, pixel)
                    .iter()
                    .fold(0u32, |acc, &s| acc.saturating_add(u32::from(s)));
                raw.set_sum(gain, pixel, total);
            }
        }
    }
}
