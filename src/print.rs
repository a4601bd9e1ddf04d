//! Human-readable dumps of raw data.

use std::fmt;

use crate::adc_compression::Codec;
use crate::item::{Item, TYPE_ADC_SUMS};
use crate::raw_data::{AdcData, KNOWN_SAMPLES, KNOWN_SATURATED, KNOWN_SUM};
use crate::{AdcError, AdcResult, RawDataCodec};

/// Limits of what a dump shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintConfig {
    /// Pixels listed before the rest is summarized.
    pub max_pixels: usize,
    /// Time slices shown per trace.
    pub max_samples: usize,
    pub show_samples: bool,
}

impl Default for PrintConfig {
    fn default() -> Self {
        PrintConfig {
            max_pixels: 20,
            max_samples: 32,
            show_samples: true,
        }
    }
}

/// [`fmt::Display`] adapter returned by [`AdcData::display`].
#[derive(Debug, Clone, Copy)]
pub struct AdcDisplay<'a> {
    raw: &'a AdcData,
    config: &'a PrintConfig,
}

impl AdcData {
    pub fn display<'a>(&'a self, config: &'a PrintConfig) -> AdcDisplay<'a> {
        AdcDisplay { raw: self, config }
    }
}

impl fmt::Display for AdcDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.raw;
        let config = self.config;
        writeln!(
            f,
            "Telescope {}: {} pixels, {} gains, {} samples{}",
            raw.tel_id,
            raw.num_pixels,
            raw.num_gains,
            raw.num_samples,
            if raw.known { "" } else { " (not known)" }
        )?;
        writeln!(
            f,
            "  zero suppression {:#04x}, data reduction {:#04x}, list {}",
            raw.zero_sup_mode,
            raw.data_red_mode,
            if raw.list_known { "known" } else { "derived" }
        )?;
        if raw.sum_data_red_mode() == 2 {
            writeln!(f, "  8-bit high gain: offset {}, scale {}", raw.offset_hg8, raw.scale_hg8)?;
        }

        let recorded = |p: &usize| (0..raw.num_gains).any(|g| raw.adc_known[g][*p] != 0);
        let total = (0..raw.num_pixels).filter(recorded).count();
        for pixel in (0..raw.num_pixels).filter(recorded).take(config.max_pixels) {
            write!(f, "  pixel {pixel:5}:")?;
            for gain in 0..raw.num_gains {
                let known = raw.adc_known[gain][pixel];
                if known & KNOWN_SUM != 0 {
                    write!(f, " {:8}", raw.adc_sum[gain][pixel])?;
                } else {
                    write!(f, " {:>8}", "-")?;
                }
                if known & KNOWN_SATURATED != 0 {
                    write!(f, "*")?;
                }
            }
            writeln!(f)?;
            if !config.show_samples {
                continue;
            }
            for gain in 0..raw.num_gains {
                if raw.adc_known[gain][pixel] & KNOWN_SAMPLES == 0 {
                    continue;
                }
                let trace = raw.samples(gain, pixel);
                write!(f, "    gain {gain}:")?;
                for s in trace.iter().take(config.max_samples) {
                    write!(f, " {s}")?;
                }
                if trace.len() > config.max_samples {
                    write!(f, " ...")?;
                }
                writeln!(f)?;
            }
        }
        if total > config.max_pixels {
            writeln!(f, "  ... {} more pixels", total - config.max_pixels)?;
        }
        Ok(())
    }
}

/// Decodes an ADC item of any telescope and renders it.
pub fn print_item(item: &Item<'_>, config: &PrintConfig) -> AdcResult<String> {
    let header = &item.header;
    let mut codec = Codec::for_item_type(header.item_type).ok_or(AdcError::WrongItemType {
        expected: TYPE_ADC_SUMS,
        found: header.item_type,
    })?;
    let raw = codec.read_any(item)?;
    let kind = match codec {
        Codec::Sums(_) => "ADC sums",
        Codec::Samples(_) => "ADC samples",
    };
    Ok(format!(
        "{kind} [{}] version {}, {} bytes\n{}",
        header.item_type,
        header.version,
        header.length,
        raw.display(config)
    ))
}
