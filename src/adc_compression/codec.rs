use crate::adc_compression::{SampleCodec, SumCodec};
use crate::item::{Item, ItemWriter, TYPE_ADC_SAMPLES, TYPE_ADC_SUMS};
use crate::{AdcData, AdcResult, RawDataCodec};

/// Type-erased wrapper for the raw-data codecs.
///
/// Allows picking the codec from an item type read off the wire.
#[derive(Debug)]
pub enum Codec {
    /// [`SumCodec`] for integrated sums
    Sums(SumCodec),
    /// [`SampleCodec`] for sampled traces
    Samples(SampleCodec),
}

impl Codec {
    /// Codec with default settings for `item_type`, if it is a raw-data type.
    pub fn for_item_type(item_type: u32) -> Option<Self> {
        match item_type {
            TYPE_ADC_SUMS => Some(Codec::Sums(SumCodec::new())),
            TYPE_ADC_SAMPLES => Some(Codec::Samples(SampleCodec::new())),
            _ => None,
        }
    }
}

impl RawDataCodec for Codec {
    fn item_type(&self) -> u32 {
        match self {
            Codec::Sums(c) => c.item_type(),
            Codec::Samples(c) => c.item_type(),
        }
    }

    fn max_version(&self) -> u32 {
        match self {
            Codec::Sums(c) => c.max_version(),
            Codec::Samples(c) => c.max_version(),
        }
    }

    fn write(&mut self, raw: &AdcData, out: &mut ItemWriter) -> AdcResult<()> {
        match self {
            Codec::Sums(c) => c.write(raw, out),
            Codec::Samples(c) => c.write(raw, out),
        }
    }

    fn decode(
        &mut self,
        item: &Item<'_>,
        raw: &mut AdcData,
        match_telescope: bool,
    ) -> AdcResult<()> {
        match self {
            Codec::Sums(c) => c.decode(item, raw, match_telescope),
            Codec::Samples(c) => c.decode(item, raw, match_telescope),
        }
    }
}

impl From<SumCodec> for Codec {
    fn from(codec: SumCodec) -> Self {
        Codec::Sums(codec)
    }
}

impl From<SampleCodec> for Codec {
    fn from(codec: SampleCodec) -> Self {
        Codec::Samples(codec)
    }
}
