//! Rejected records must leave the data unknown and the stream readable.

mod common;

use adcpack::{
    AdcData, AdcError, ItemReader, ItemWriter, RawDataCodec, SampleCodec, SumCodec, HI_GAIN,
    SYNC_MARKER, TYPE_ADC_SAMPLES, TYPE_ADC_SUMS,
};
use common::*;

fn good_sums() -> AdcData {
    let mut raw = AdcData::new(TEL_ID, 16, 1, 0).unwrap();
    for p in 0..16 {
        raw.set_sum(HI_GAIN, p, 500 + p as u32);
    }
    raw
}

/// Writes a hand-made sums item followed by a valid one.
fn with_good_sibling(write_bad: impl FnOnce(&mut ItemWriter)) -> Vec<u8> {
    let mut out = ItemWriter::new();
    write_bad(&mut out);
    SumCodec::new().write(&good_sums(), &mut out).unwrap();
    out.finish().unwrap().to_vec()
}

/// Reads all items, returning the first error and whether the sibling decoded.
fn read_stream(bytes: &[u8]) -> (AdcError, bool) {
    let mut raw = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    let mut codec = SumCodec::new();
    let mut first_error = None;
    let mut sibling_ok = false;
    for item in ItemReader::new(bytes) {
        let item = item.unwrap();
        match codec.read(&item, &mut raw) {
            Ok(()) => {
                assert!(raw.known);
                sibling_ok = raw.num_pixels == 16
                    && (0..16).all(|p| raw.adc_sum[HI_GAIN][p] == 500 + p as u32);
            }
            Err(e) => {
                assert!(!raw.known);
                first_error.get_or_insert(e);
            }
        }
    }
    (first_error.expect("bad item was accepted"), sibling_ok)
}

fn sums_v3_ident(zero_sup: i32, data_red: i32) -> i32 {
    TEL_ID | zero_sup << 5 | data_red << 10
}

#[test]
fn unsupported_version_is_skipped() {
    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 5, TEL_ID).unwrap();
        out.put_u32(0xDEAD_BEEF);
        out.end_item().unwrap();
    });
    let (error, sibling_ok) = read_stream(&bytes);
    assert_eq!(
        error,
        AdcError::UnsupportedVersion {
            item_type: TYPE_ADC_SUMS,
            version: 5,
            max: 4
        }
    );
    assert!(error.is_recoverable());
    assert!(sibling_ok);
}

#[test]
fn unsupported_mode_is_skipped() {
    for (zero_sup, data_red) in [(3, 0), (0, 3), (31, 31)] {
        let bytes = with_good_sibling(|out| {
            out.begin_item(TYPE_ADC_SUMS, 3, sums_v3_ident(zero_sup, data_red))
                .unwrap();
            out.put_i16(4);
            out.put_i16(1);
            out.end_item().unwrap();
        });
        let (error, sibling_ok) = read_stream(&bytes);
        assert!(matches!(error, AdcError::UnsupportedMode { version: 3, .. }));
        assert!(sibling_ok);
    }
}

#[test]
fn narrow_reduction_needs_version_4() {
    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 3, sums_v3_ident(0, 2)).unwrap();
        out.put_i16(4);
        out.put_i16(1);
        out.end_item().unwrap();
    });
    let (error, _) = read_stream(&bytes);
    assert!(matches!(error, AdcError::UnsupportedMode { .. }));
}

#[test]
fn telescope_mismatch_is_skipped() {
    let mut other = good_sums();
    other.tel_id = TEL_ID + 1;
    let bytes = with_good_sibling(|out| SumCodec::new().write(&other, out).unwrap());
    let (error, sibling_ok) = read_stream(&bytes);
    assert_eq!(
        error,
        AdcError::TelescopeMismatch {
            expected: TEL_ID,
            found: TEL_ID + 1
        }
    );
    assert!(sibling_ok);
}

#[test]
fn limits_are_enforced() {
    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 4, sums_v3_ident(0, 0)).unwrap();
        out.put_count(70000);
        out.put_count(1);
        out.end_item().unwrap();
    });
    assert!(matches!(read_stream(&bytes).0, AdcError::PixelLimit { .. }));

    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 3, sums_v3_ident(0, 0)).unwrap();
        out.put_i16(10);
        out.put_i16(3);
        out.end_item().unwrap();
    });
    assert!(matches!(read_stream(&bytes).0, AdcError::GainLimit { .. }));

    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 3, sums_v3_ident(0, 0)).unwrap();
        out.put_i16(-1);
        out.put_i16(1);
        out.end_item().unwrap();
    });
    assert!(matches!(
        read_stream(&bytes).0,
        AdcError::ValueOutOfRange { .. }
    ));
}

#[test]
fn implausible_lists_are_skipped() {
    // more entries than pixels
    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 3, sums_v3_ident(2, 0)).unwrap();
        out.put_i16(2);
        out.put_i16(1);
        out.put_i16(3);
        out.end_item().unwrap();
    });
    let (error, sibling_ok) = read_stream(&bytes);
    assert!(matches!(error, AdcError::ImplausibleList(_)));
    assert!(sibling_ok);

    // bitmap flags beyond the last pixel
    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 3, sums_v3_ident(1, 0)).unwrap();
        out.put_i16(4);
        out.put_i16(1);
        out.put_u16(0x0010);
        out.put_scount(1);
        out.end_item().unwrap();
    });
    assert!(matches!(read_stream(&bytes).0, AdcError::ImplausibleList(_)));
}

#[test]
fn short_body_is_truncation() {
    let bytes = with_good_sibling(|out| {
        out.begin_item(TYPE_ADC_SUMS, 3, sums_v3_ident(0, 0)).unwrap();
        out.put_i16(1000);
        out.put_i16(2);
        out.put_scount(1);
        out.end_item().unwrap();
    });
    let (error, sibling_ok) = read_stream(&bytes);
    assert!(matches!(error, AdcError::Truncated { .. }));
    assert!(!error.is_recoverable());
    // the item boundary still holds
    assert!(sibling_ok);
}

#[test]
fn declared_length_beyond_stream() {
    let mut bytes = SumCodec::new().encode_to_bytes(&good_sums()).unwrap().to_vec();
    bytes.truncate(bytes.len() - 3);
    let mut reader = ItemReader::new(&bytes);
    let error = reader.next().unwrap().unwrap_err();
    assert!(matches!(error, AdcError::Truncated { .. }));
    assert!(reader.next().is_none());

    let mut raw = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    raw.known = true;
    assert!(SumCodec::new().decode_from_bytes(&bytes, &mut raw).is_err());
    assert!(!raw.known);
}

#[test]
fn missing_sync_marker() {
    let mut bytes = SumCodec::new().encode_to_bytes(&good_sums()).unwrap().to_vec();
    bytes[0] ^= 0xFF;
    let error = ItemReader::new(&bytes).next().unwrap().unwrap_err();
    assert_eq!(error, AdcError::BadSync(SYNC_MARKER ^ 0xFF));
    assert!(!error.is_recoverable());
}

#[test]
fn wrong_item_type() {
    let mut rng = rng();
    let raw = random_traces(&mut rng, 8, 1, 4, false, false, 0);
    let bytes = SampleCodec::new().encode_to_bytes(&raw).unwrap();
    let mut decoded = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    assert_eq!(
        SumCodec::new().decode_from_bytes(&bytes, &mut decoded),
        Err(AdcError::WrongItemType {
            expected: TYPE_ADC_SUMS,
            found: TYPE_ADC_SAMPLES
        })
    );
}

#[test]
fn sample_suppression_needs_differential_version() {
    let mut out = ItemWriter::new();
    // version 2 sample record claiming range-list suppression
    out.begin_item(TYPE_ADC_SAMPLES, 2, 1 | TEL_ID << 12).unwrap();
    out.put_i16(4);
    out.put_i16(8);
    out.put_i16(1);
    out.end_item().unwrap();
    let bytes = out.finish().unwrap();
    let mut decoded = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    assert!(matches!(
        SampleCodec::new().decode_from_bytes(&bytes, &mut decoded),
        Err(AdcError::UnsupportedMode { version: 2, .. })
    ));
}

#[test]
fn failed_read_then_good_read() {
    let mut raw = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    let mut codec = SumCodec::new();
    let mut bad = good_sums();
    bad.tel_id = 3;
    let bad = codec.encode_to_bytes(&bad).unwrap();
    let good = codec.encode_to_bytes(&good_sums()).unwrap();
    assert!(codec.decode_from_bytes(&bad, &mut raw).is_err());
    assert!(!raw.known);
    codec.decode_from_bytes(&good, &mut raw).unwrap();
    assert!(raw.known);
    assert_eq!(raw.adc_sum[HI_GAIN][15], 515);
}
