//! Integrated ADC sums (item type 2012).

use tracing::debug;

use crate::adc_compression::differential::ValueCoding;
use crate::adc_compression::helpers::{group_mask, groups, GROUP_SIZE};
use crate::adc_compression::ident::{IdentFields, IdentLayout, RecordKind};
use crate::adc_compression::reduction::{DataReduction, Hg8Quantizer};
use crate::adc_compression::zero_suppression::{check_list, ListLayout, ZeroSuppression};
use crate::item::{Item, ItemWriter, TYPE_ADC_SUMS};
use crate::raw_data::{AdcData, ListEntry, HI_GAIN, LO_GAIN, SAMPLE_MODE_FLAG, SIGNIFICANT_SUM};
use crate::{AdcError, AdcResult, ByteBuffer, ByteCursor, RawDataCodec};

/// Newest sum record version.
pub const MAX_SUM_VERSION: u32 = 4;
/// Version written when the data does not need a newer one.
pub const DEFAULT_SUM_VERSION: u32 = 3;

/// Writes and reads integrated sums with zero suppression and data reduction.
///
/// ```
/// use adcpack::{AdcData, RawDataCodec, SumCodec, HI_GAIN, LO_GAIN};
///
/// let mut raw = AdcData::new(7, 10, 2, 0).unwrap();
/// for p in 0..10 {
///     raw.set_sum(HI_GAIN, p, p as u32);
///     raw.set_sum(LO_GAIN, p, p as u32);
/// }
/// let mut codec = SumCodec::new();
/// let bytes = codec.encode_to_bytes(&raw).unwrap();
///
/// let mut decoded = AdcData::new(7, 0, 1, 0).unwrap();
/// codec.decode_from_bytes(&bytes, &mut decoded).unwrap();
/// assert!(decoded.known);
/// assert_eq!(decoded.adc_sum, raw.adc_sum);
/// ```
#[derive(Debug, Default)]
pub struct SumCodec {
    version: Option<u32>,
    entries: Vec<ListEntry>,
    scratch: Scratch,
}

impl SumCodec {
    /// Codec writing the oldest version at or above the default that fits the data.
    pub fn new() -> Self {
        SumCodec::default()
    }

    /// Codec writing exactly `version`, failing on data that version cannot hold.
    pub fn with_version(version: u32) -> Self {
        SumCodec {
            version: Some(version),
            ..SumCodec::default()
        }
    }

    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Oldest version able to represent the data.
    fn required_version(
        num_pixels: usize,
        zero_sup: ZeroSuppression,
        reduction: DataReduction,
        max_list_index: usize,
    ) -> u32 {
        if num_pixels > i16::MAX as usize
            || reduction == DataReduction::NarrowHighGain
            || (zero_sup == ZeroSuppression::List
                && max_list_index > ListLayout::Short13.max_index())
        {
            4
        } else if num_pixels > 4095 {
            2
        } else if num_pixels > 2047 {
            1
        } else {
            0
        }
    }

    fn choose_version(&self, required: u32) -> AdcResult<u32> {
        match self.version {
            None => Ok(required.max(DEFAULT_SUM_VERSION)),
            Some(version) if version > MAX_SUM_VERSION => Err(AdcError::UnsupportedVersion {
                item_type: TYPE_ADC_SUMS,
                version,
                max: MAX_SUM_VERSION,
            }),
            Some(version) if version < required => Err(AdcError::VersionTooLow {
                requested: version,
                required,
            }),
            Some(version) => Ok(version),
        }
    }

    fn put_groups(
        &mut self,
        raw: &AdcData,
        zero_sup: ZeroSuppression,
        reduction: DataReduction,
        quantizer: Option<Hg8Quantizer>,
        coding: ValueCoding,
        out: &mut ByteBuffer,
    ) {
        for group in groups(raw.num_pixels) {
            self.entries.clear();
            self.entries.extend(
                group
                    .clone()
                    .filter(|&p| {
                        zero_sup == ZeroSuppression::None
                            || raw.significant[p] & SIGNIFICANT_SUM != 0
                    })
                    .map(|p| markup(raw, p, zero_sup, reduction, quantizer)),
            );
            if zero_sup == ZeroSuppression::Bitmap {
                let word = group_word(&self.entries, group.start, |_| true);
                out.put_u16(word);
                if word == 0 {
                    continue;
                }
            }
            if reduction.has_markup() {
                if raw.num_gains == 2 {
                    out.put_u16(group_word(&self.entries, group.start, |e| e.low_gain));
                }
                if reduction == DataReduction::NarrowHighGain {
                    out.put_u16(group_word(&self.entries, group.start, |e| e.narrow_hg));
                }
            }
            self.scratch
                .put_block(raw, &self.entries, quantizer, coding, out);
        }
    }

    fn get_groups(
        &mut self,
        raw: &mut AdcData,
        zero_sup: ZeroSuppression,
        reduction: DataReduction,
        quantizer: Option<Hg8Quantizer>,
        coding: ValueCoding,
        cursor: &mut ByteCursor<'_>,
    ) -> AdcResult<()> {
        let two_gains = raw.num_gains == 2;
        for group in groups(raw.num_pixels) {
            let mask = group_mask(&group);
            let significant = if zero_sup == ZeroSuppression::Bitmap {
                cursor.get_u16()?
            } else {
                mask
            };
            if significant == 0 {
                continue;
            }
            let (low_gain, narrow) = if reduction.has_markup() {
                let low_gain = if two_gains { cursor.get_u16()? } else { 0 };
                let narrow = if reduction == DataReduction::NarrowHighGain {
                    cursor.get_u16()?
                } else {
                    0
                };
                (low_gain, narrow)
            } else if two_gains {
                (significant, 0)
            } else {
                (0, 0)
            };
            if significant & !mask != 0 || (low_gain | narrow) & !significant != 0 {
                return Err(AdcError::ImplausibleList(format!(
                    "group at pixel {}: flags {significant:#06x}/{low_gain:#06x}/{narrow:#06x}",
                    group.start
                )));
            }
            self.entries.clear();
            self.entries.extend(
                (0..GROUP_SIZE)
                    .filter(|i| significant >> i & 1 != 0)
                    .map(|i| ListEntry {
                        pixel: group.start + i,
                        low_gain: low_gain >> i & 1 != 0,
                        narrow_hg: narrow >> i & 1 != 0,
                    }),
            );
            self.scratch
                .get_block(raw, &self.entries, quantizer, coding, cursor)?;
        }
        Ok(())
    }
}

impl RawDataCodec for SumCodec {
    fn item_type(&self) -> u32 {
        TYPE_ADC_SUMS
    }

    fn max_version(&self) -> u32 {
        MAX_SUM_VERSION
    }

    fn write(&mut self, raw: &AdcData, out: &mut ItemWriter) -> AdcResult<()> {
        let num_pixels = raw.num_pixels;
        let num_gains = raw.num_gains;
        raw.check_layout()?;
        let (Some(requested), Some(reduction)) = (
            ZeroSuppression::from_mode(raw.sum_zero_sup_mode()),
            DataReduction::from_mode(raw.sum_data_red_mode()),
        ) else {
            return Err(AdcError::UnsupportedMode {
                zero_sup_mode: raw.sum_zero_sup_mode(),
                data_red_mode: raw.sum_data_red_mode(),
                version: self.version.unwrap_or(DEFAULT_SUM_VERSION),
            });
        };

        let list_known = requested == ZeroSuppression::List && raw.list_known;
        if list_known {
            check_list(&raw.list, num_pixels)?;
        }
        let is_significant = |p: &usize| raw.significant[*p] & SIGNIFICANT_SUM != 0;
        let significant = (0..num_pixels).filter(is_significant).count();
        let zero_sup = requested.select(list_known, significant, num_pixels);

        self.entries.clear();
        if zero_sup == ZeroSuppression::List {
            if list_known {
                self.entries
                    .extend(raw.list.iter().map(|e| ListEntry::pixel(e.pixel)));
            } else {
                self.entries
                    .extend((0..num_pixels).filter(is_significant).map(ListEntry::pixel));
            }
        }
        let max_list_index = self.entries.last().map_or(0, |e| e.pixel);
        let version = self.choose_version(Self::required_version(
            num_pixels,
            zero_sup,
            reduction,
            max_list_index,
        ))?;
        let layout = IdentLayout::for_record(RecordKind::Sums, version);
        let ident = layout.pack(&IdentFields {
            tel_id: raw.tel_id,
            zero_sup_mode: zero_sup.mode(),
            data_red_mode: reduction.mode(),
            list_known,
            counts: layout.packs_counts().then_some((num_pixels, num_gains)),
        })?;
        debug!(
            tel_id = raw.tel_id,
            version,
            zero_sup_mode = zero_sup.mode(),
            data_red_mode = reduction.mode(),
            num_pixels,
            "writing ADC sums"
        );

        let quantizer =
            (reduction == DataReduction::NarrowHighGain).then(|| Hg8Quantizer::for_data(raw));
        let coding = ValueCoding::for_version(version);

        out.begin_item(TYPE_ADC_SUMS, version, ident)?;
        if let Some(q) = quantizer {
            out.put_scount(i64::from(q.offset));
            out.put_scount(i64::from(q.scale));
        }
        put_counts(version, num_pixels, num_gains, out);

        match zero_sup {
            ZeroSuppression::None if reduction == DataReduction::None => {
                self.entries.clear();
                self.entries.extend(
                    (0..num_pixels).map(|p| markup(raw, p, zero_sup, reduction, quantizer)),
                );
                self.scratch
                    .put_block(raw, &self.entries, quantizer, coding, out);
            }
            ZeroSuppression::None | ZeroSuppression::Bitmap => {
                self.put_groups(raw, zero_sup, reduction, quantizer, coding, out);
            }
            ZeroSuppression::List => {
                for e in &mut self.entries {
                    *e = markup(raw, e.pixel, zero_sup, reduction, quantizer);
                }
                ListLayout::for_version(version).put_list(
                    &self.entries,
                    reduction.has_markup(),
                    out,
                )?;
                self.scratch
                    .put_block(raw, &self.entries, quantizer, coding, out);
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
        let layout = IdentLayout::for_record(RecordKind::Sums, version);
        let fields = layout.unpack(item.header.ident);
        if match_telescope && !layout.same_telescope(raw.tel_id, fields.tel_id) {
            return Err(AdcError::TelescopeMismatch {
                expected: raw.tel_id,
                found: fields.tel_id,
            });
        }
        let unsupported = || AdcError::UnsupportedMode {
            zero_sup_mode: fields.zero_sup_mode,
            data_red_mode: fields.data_red_mode,
            version,
        };
        let zero_sup = ZeroSuppression::from_mode(fields.zero_sup_mode).ok_or_else(unsupported)?;
        let reduction = DataReduction::from_mode(fields.data_red_mode).ok_or_else(unsupported)?;
        let quantizer = if reduction == DataReduction::NarrowHighGain {
            if version < 4 {
                return Err(unsupported());
            }
            let offset = body.get_scount32()?;
            let scale = body.get_scount32()?;
            Some(Hg8Quantizer::new(offset, scale))
        } else {
            None
        };
        let (num_pixels, num_gains) = match fields.counts {
            Some(counts) => counts,
            None => get_counts(version, &mut body)?,
        };

        // traces of the same camera keep their gain channels visible
        let trace_gains = if num_pixels == raw.num_pixels && raw.has_samples() {
            raw.num_gains
        } else {
            0
        };
        raw.resize(num_pixels, num_gains, raw.num_samples)?;
        raw.clear_sums();
        if !match_telescope {
            raw.tel_id = fields.tel_id;
        }
        raw.zero_sup_mode = raw.zero_sup_mode & SAMPLE_MODE_FLAG | zero_sup.mode();
        raw.data_red_mode = raw.data_red_mode & SAMPLE_MODE_FLAG | reduction.mode();
        if let Some(q) = quantizer {
            raw.offset_hg8 = q.offset;
            raw.scale_hg8 = q.scale;
        }

        let coding = ValueCoding::for_version(version);
        let two_gains = num_gains == 2;
        match zero_sup {
            ZeroSuppression::None if reduction == DataReduction::None => {
                self.entries.clear();
                self.entries.extend((0..num_pixels).map(|pixel| ListEntry {
                    pixel,
                    low_gain: two_gains,
                    narrow_hg: false,
                }));
                self.scratch
                    .get_block(raw, &self.entries, quantizer, coding, &mut body)?;
            }
            ZeroSuppression::None | ZeroSuppression::Bitmap => {
                self.get_groups(raw, zero_sup, reduction, quantizer, coding, &mut body)?;
            }
            ZeroSuppression::List => {
                let mut entries = ListLayout::for_version(version).get_list(
                    &mut body,
                    num_pixels,
                    reduction.has_markup(),
                )?;
                if !reduction.has_markup() {
                    for e in &mut entries {
                        e.low_gain = two_gains;
                    }
                }
                self.scratch
                    .get_block(raw, &entries, quantizer, coding, &mut body)?;
                raw.list = entries;
                raw.list_known = fields.list_known;
            }
        }
        raw.num_gains = raw.num_gains.max(trace_gains);
        Ok(())
    }
}

/// Markup of one transmitted pixel as the writer decides it.
fn markup(
    raw: &AdcData,
    pixel: usize,
    zero_sup: ZeroSuppression,
    reduction: DataReduction,
    quantizer: Option<Hg8Quantizer>,
) -> ListEntry {
    let low_gain = reduction.low_gain_present(zero_sup, raw, pixel);
    let narrow_hg = !low_gain
        && quantizer.is_some_and(|q| q.quantize(raw.adc_sum[HI_GAIN][pixel]).is_some());
    ListEntry {
        pixel,
        low_gain,
        narrow_hg,
    }
}

fn group_word(entries: &[ListEntry], start: usize, flag: impl Fn(&ListEntry) -> bool) -> u16 {
    entries
        .iter()
        .filter(|e| flag(e))
        .fold(0, |word, e| word | 1 << (e.pixel - start))
}

fn put_counts(version: u32, num_pixels: usize, num_gains: usize, out: &mut ByteBuffer) {
    match version {
        0 | 1 => {}
        2 | 3 => {
            out.put_i16(num_pixels as i16);
            out.put_i16(num_gains as i16);
        }
        _ => {
            out.put_count(num_pixels as u64);
            out.put_count(num_gains as u64);
        }
    }
}

/// Pixel and gain counts from the body of a version 2 or later record.
pub(crate) fn get_counts(version: u32, cursor: &mut ByteCursor<'_>) -> AdcResult<(usize, usize)> {
    let (pixels, gains) = if version >= 4 {
        (cursor.get_count()?, cursor.get_count()?)
    } else {
        let pixels = cursor.get_i16()?;
        let gains = cursor.get_i16()?;
        let non_negative = |what: &'static str, v: i16| {
            u64::try_from(v).map_err(|_| AdcError::ValueOutOfRange {
                what,
                value: i64::from(v),
            })
        };
        (
            non_negative("pixel count", pixels)?,
            non_negative("gain count", gains)?,
        )
    };
    let to_usize = |v: u64| usize::try_from(v).unwrap_or(usize::MAX);
    Ok((to_usize(pixels), to_usize(gains)))
}

/// Reusable per-block value buffers.
#[derive(Debug, Default)]
struct Scratch {
    wide: Vec<u32>,
    narrow: Vec<u8>,
    low: Vec<u32>,
}

impl Scratch {
    /// Writes the high-gain sums at full width, then the narrow ones, then the
    /// low-gain sums of all flagged entries.
    fn put_block(
        &mut self,
        raw: &AdcData,
        entries: &[ListEntry],
        quantizer: Option<Hg8Quantizer>,
        coding: ValueCoding,
        out: &mut ByteBuffer,
    ) {
        self.wide.clear();
        self.narrow.clear();
        self.low.clear();
        for e in entries {
            let hg = raw.adc_sum[HI_GAIN][e.pixel];
            match quantizer.filter(|_| e.narrow_hg).and_then(|q| q.quantize(hg)) {
                Some(v8) => self.narrow.push(v8),
                None => self.wide.push(hg),
            }
            if e.low_gain {
                self.low.push(raw.adc_sum[LO_GAIN][e.pixel]);
            }
        }
        coding.put(&self.wide, out);
        for &v8 in &self.narrow {
            out.put_u8(v8);
        }
        coding.put(&self.low, out);
    }

    fn get_block(
        &mut self,
        raw: &mut AdcData,
        entries: &[ListEntry],
        quantizer: Option<Hg8Quantizer>,
        coding: ValueCoding,
        cursor: &mut ByteCursor<'_>,
    ) -> AdcResult<()> {
        if let Some(e) = entries
            .iter()
            .find(|e| (e.narrow_hg && quantizer.is_none()) || (e.low_gain && raw.num_gains < 2))
        {
            return Err(AdcError::ImplausibleList(format!(
                "markup of pixel {} does not match the record modes",
                e.pixel
            )));
        }
        let num_narrow = entries.iter().filter(|e| e.narrow_hg).count();
        let num_low = entries.iter().filter(|e| e.low_gain).count();

        self.wide.clear();
        self.wide.resize(entries.len() - num_narrow, 0);
        coding.get(cursor, &mut self.wide)?;
        let narrow = cursor.get_bytes(num_narrow)?;
        self.low.clear();
        self.low.resize(num_low, 0);
        coding.get(cursor, &mut self.low)?;

        let (mut wide, mut narrow, mut low) = (self.wide.iter(), narrow.iter(), self.low.iter());
        for e in entries {
            let hg = match (e.narrow_hg, quantizer) {
                (true, Some(q)) => narrow.next().map(|&v8| q.restore(v8)),
                _ => wide.next().copied(),
            };
            raw.set_sum(HI_GAIN, e.pixel, hg.unwrap_or_default());
            if e.low_gain {
                raw.set_sum(LO_GAIN, e.pixel, low.next().copied().unwrap_or_default());
            }
        }
        Ok(())
    }
}
