#![doc = include_str!("../README.md")]

use bytes::Bytes;
use tracing::warn;

mod adc_compression;
mod bytebuffer;
mod cursor;
mod error;
mod item;
mod print;
mod raw_data;
/// The variable-length ("count") integer encoding.
pub mod varint;

pub use adc_compression::*;
pub use bytebuffer::ByteBuffer;
pub use cursor::ByteCursor;
pub use error::{AdcError, AdcResult};
pub use item::{
    Item, ItemHeader, ItemReader, ItemWriter, MAX_ITEM_VERSION, SYNC_MARKER, TYPE_ADC_SAMPLES,
    TYPE_ADC_SUMS,
};
pub use print::{print_item, AdcDisplay, PrintConfig};
pub use raw_data::{
    AdcData, ListEntry, HI_GAIN, KNOWN_SAMPLES, KNOWN_SATURATED, KNOWN_SUM, LO_GAIN, MAX_GAINS,
    MAX_PIXELS, MAX_SAMPLES, SAMPLE_MODE_FLAG, SIGNIFICANT_SAMPLES, SIGNIFICANT_SUM, SUM_MODE_MASK,
};

/// Writes and reads one kind of raw-data item.
///
/// Implementations only provide the record layout in [`RawDataCodec::write`]
/// and [`RawDataCodec::decode`]. The provided methods check the item type and
/// version, maintain [`AdcData::known`], and report rejected records.
///
/// A failed read leaves the surrounding stream intact: the item body was
/// already split off by [`Item::parse`], so the next sibling can still be
/// read unless the error is not [recoverable](AdcError::is_recoverable).
pub trait RawDataCodec {
    /// Item type written and accepted by this codec.
    fn item_type(&self) -> u32;

    /// Newest record version this codec understands.
    fn max_version(&self) -> u32;

    /// Appends one complete item for `raw` to `out`.
    ///
    /// All checks happen before the item is opened, so on error `out` is
    /// left unchanged.
    fn write(&mut self, raw: &AdcData, out: &mut ItemWriter) -> AdcResult<()>;

    /// Decodes the body of an item already checked for type and version.
    ///
    /// With `match_telescope`, the identifier must name `raw.tel_id`;
    /// otherwise `raw.tel_id` is taken from the item.
    fn decode(
        &mut self,
        item: &Item<'_>,
        raw: &mut AdcData,
        match_telescope: bool,
    ) -> AdcResult<()>;

    /// Reads an item for the telescope `raw.tel_id` into `raw`.
    fn read(&mut self, item: &Item<'_>, raw: &mut AdcData) -> AdcResult<()> {
        read_item(self, item, raw, true)
    }

    /// Reads an item of any telescope into fresh data.
    fn read_any(&mut self, item: &Item<'_>) -> AdcResult<AdcData> {
        let mut raw = AdcData::new(0, 0, 1, 0)?;
        read_item(self, item, &mut raw, false)?;
        Ok(raw)
    }

    /// Writes `raw` as a single top-level item.
    fn encode_to_bytes(&mut self, raw: &AdcData) -> AdcResult<Bytes> {
        let mut out = ItemWriter::new();
        self.write(raw, &mut out)?;
        out.finish()
    }

    /// Reads the first top-level item of `data` into `raw`.
    fn decode_from_bytes(&mut self, data: &[u8], raw: &mut AdcData) -> AdcResult<()> {
        raw.known = false;
        let item = Item::parse(&mut ByteCursor::new(data), true)?;
        self.read(&item, raw)
    }
}

fn read_item<C: RawDataCodec + ?Sized>(
    codec: &mut C,
    item: &Item<'_>,
    raw: &mut AdcData,
    match_telescope: bool,
) -> AdcResult<()> {
    raw.known = false;
    let header = &item.header;
    let result = if header.item_type != codec.item_type() {
        item.expect_type(codec.item_type())
    } else if header.version > codec.max_version() {
        Err(AdcError::UnsupportedVersion {
            item_type: header.item_type,
            version: header.version,
            max: codec.max_version(),
        })
    } else {
        codec.decode(item, raw, match_telescope)
    };
    match &result {
        Ok(()) => raw.known = true,
        Err(error) => warn!(
            item_type = header.item_type,
            version = header.version,
            ident = header.ident,
            length = header.length,
            tel_id = raw.tel_id,
            recoverable = error.is_recoverable(),
            %error,
            "raw data item rejected"
        ),
    }
    result
}
