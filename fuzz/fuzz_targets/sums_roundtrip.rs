#![no_main]

mod common;

use adcpack::{AdcData, RawDataCodec, SumCodec, HI_GAIN, KNOWN_SUM, LO_GAIN};
use libfuzzer_sys::fuzz_target;

use crate::common::FuzzSums;

fuzz_target!(|input: FuzzSums| {
    let raw = input.to_raw();
    let mut codec = SumCodec::new();
    let bytes = codec
        .encode_to_bytes(&raw)
        .expect("Valid sum data must be writable");
    let mut decoded = AdcData::new(raw.tel_id, 0, 1, 0).unwrap();
    codec
        .decode_from_bytes(&bytes, &mut decoded)
        .expect("If we can write it, we can read it");

    assert_eq!(decoded.num_pixels, raw.num_pixels);
    let scale = decoded.scale_hg8 as u32;
    for p in 0..raw.num_pixels {
        for gain in [HI_GAIN, LO_GAIN].into_iter().take(raw.num_gains) {
            if decoded.adc_known[gain][p] & KNOWN_SUM == 0 {
                continue;
            }
            let (a, b) = (raw.adc_sum[gain][p], decoded.adc_sum[gain][p]);
            let tolerance = if gain == HI_GAIN && raw.data_red_mode == 2 { scale } else { 0 };
            assert!(
                a.abs_diff(b) <= tolerance,
                "Mismatch at gain {gain}, pixel {p}: {a} decoded as {b}"
            );
        }
    }
});
