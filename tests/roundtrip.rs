mod common;

use adcpack::{
    AdcData, RawDataCodec, SampleCodec, SumCodec, HI_GAIN, KNOWN_SAMPLES, KNOWN_SUM, LO_GAIN,
    SIGNIFICANT_SUM,
};
use common::*;

#[test]
fn sums_every_mode_combination() {
    let mut rng = rng();
    for zero_sup in 0..3 {
        for data_red in 0..3 {
            for num_gains in 1..=2 {
                let raw = random_sums(
                    &mut rng,
                    SumParams {
                        num_pixels: 1000,
                        num_gains,
                        zero_sup,
                        data_red,
                        significant: 40,
                    },
                );
                let decoded = roundtrip_sums(&mut SumCodec::new(), &raw);
                let tolerance = if data_red == 2 { SCALE_HG8 as u32 } else { 0 };
                assert_sums_match(&raw, &decoded, tolerance);
                assert_eq!(decoded.sum_zero_sup_mode(), zero_sup);
                assert_eq!(decoded.sum_data_red_mode(), data_red);
            }
        }
    }
}

#[test]
fn sums_with_caller_list() {
    let mut rng = rng();
    for data_red in 0..3 {
        let mut raw = random_sums(
            &mut rng,
            SumParams {
                num_pixels: 500,
                num_gains: 2,
                zero_sup: 2,
                data_red,
                significant: 300,
            },
        );
        raw.list = significant_list(&raw);
        raw.list_known = true;
        let decoded = roundtrip_sums(&mut SumCodec::new(), &raw);
        let tolerance = if data_red == 2 { SCALE_HG8 as u32 } else { 0 };
        assert_sums_match(&raw, &decoded, tolerance);
        assert!(decoded.list_known);
        assert_eq!(decoded.sum_zero_sup_mode(), 2);
        let pixels: Vec<usize> = decoded.list.iter().map(|e| e.pixel).collect();
        let expected: Vec<usize> = raw.list.iter().map(|e| e.pixel).collect();
        assert_eq!(pixels, expected);
    }
}

#[test]
fn sums_in_legacy_versions() {
    let mut rng = rng();
    for version in 0..=4 {
        for zero_sup in 0..3 {
            let mut raw = random_sums(
                &mut rng,
                SumParams {
                    num_pixels: 300,
                    num_gains: 2,
                    zero_sup,
                    data_red: 1,
                    significant: 10,
                },
            );
            raw.list = significant_list(&raw);
            raw.list_known = true;
            let decoded = roundtrip_sums(&mut SumCodec::with_version(version), &raw);
            assert_sums_match(&raw, &decoded, 0);
            assert_eq!(decoded.tel_id, TEL_ID);
        }
    }
}

#[test]
fn empty_camera() {
    let mut rng = rng();
    for zero_sup in 0..3 {
        let raw = random_sums(
            &mut rng,
            SumParams {
                num_pixels: 0,
                num_gains: 2,
                zero_sup,
                data_red: 0,
                significant: 0,
            },
        );
        let decoded = roundtrip_sums(&mut SumCodec::new(), &raw);
        assert_eq!(decoded.num_pixels, 0);
    }
}

#[test]
fn no_significant_pixels() {
    let mut rng = rng();
    let raw = random_sums(
        &mut rng,
        SumParams {
            num_pixels: 100,
            num_gains: 2,
            zero_sup: 1,
            data_red: 2,
            significant: 0,
        },
    );
    let decoded = roundtrip_sums(&mut SumCodec::new(), &raw);
    assert!(decoded.significant[..100].iter().all(|s| s & SIGNIFICANT_SUM == 0));
    assert!(decoded.adc_sum[HI_GAIN][..100].iter().all(|&a| a == 0));
}

#[test]
fn samples_every_mode_combination() {
    let mut rng = rng();
    for zero_sup in [false, true] {
        for data_red in [false, true] {
            for num_gains in 1..=2 {
                let raw = random_traces(&mut rng, 200, num_gains, 24, zero_sup, data_red, 30);
                let decoded = roundtrip_samples(&mut SampleCodec::new(), &raw);
                assert_traces_match(&raw, &decoded);
                assert_eq!(decoded.sample_zero_sup(), zero_sup);
                assert_eq!(decoded.sample_data_red(), data_red);
            }
        }
    }
}

#[test]
fn samples_in_legacy_versions() {
    let mut rng = rng();
    for version in 0..=4 {
        let raw = random_traces(&mut rng, 50, 2, 10, false, false, 0);
        let decoded = roundtrip_samples(&mut SampleCodec::with_version(version), &raw);
        assert_traces_match(&raw, &decoded);
    }
    for version in 3..=4 {
        let raw = random_traces(&mut rng, 50, 2, 10, true, true, 7);
        let decoded = roundtrip_samples(&mut SampleCodec::with_version(version), &raw);
        assert_traces_match(&raw, &decoded);
    }
}

#[test]
fn samples_keep_earlier_sums() {
    let mut rng = rng();
    let sums = random_sums(
        &mut rng,
        SumParams {
            num_pixels: 120,
            num_gains: 2,
            zero_sup: 1,
            data_red: 0,
            significant: 20,
        },
    );
    let mut traces = random_traces(&mut rng, 120, 2, 16, true, false, 15);
    traces.zero_sup_mode |= sums.zero_sup_mode;

    let sum_bytes = SumCodec::new().encode_to_bytes(&sums).unwrap();
    let sample_bytes = SampleCodec::new().encode_to_bytes(&traces).unwrap();

    let mut decoded = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    SumCodec::new()
        .decode_from_bytes(&sum_bytes, &mut decoded)
        .unwrap();
    SampleCodec::new()
        .decode_from_bytes(&sample_bytes, &mut decoded)
        .unwrap();
    assert_sums_match(&sums, &decoded, 0);
    assert_traces_match(&traces, &decoded);
    assert_eq!(decoded.zero_sup_mode, traces.zero_sup_mode);
}

#[test]
fn sums_and_samples_with_different_gain_counts() {
    let mut rng = rng();
    let sums = random_sums(
        &mut rng,
        SumParams {
            num_pixels: 64,
            num_gains: 2,
            zero_sup: 0,
            data_red: 0,
            significant: 0,
        },
    );
    let hg_traces = random_traces(&mut rng, 64, 1, 8, false, false, 0);
    let sum_bytes = SumCodec::new().encode_to_bytes(&sums).unwrap();
    let sample_bytes = SampleCodec::new().encode_to_bytes(&hg_traces).unwrap();

    // high-gain traces after two-gain sums
    let mut decoded = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    SumCodec::new()
        .decode_from_bytes(&sum_bytes, &mut decoded)
        .unwrap();
    SampleCodec::new()
        .decode_from_bytes(&sample_bytes, &mut decoded)
        .unwrap();
    assert_sums_match(&sums, &decoded, 0);
    assert_traces_match(&hg_traces, &decoded);
    assert_eq!(decoded.adc_known[LO_GAIN][5] & KNOWN_SAMPLES, 0);

    // high-gain sums after two-gain traces
    let mut hg_sums = AdcData::new(TEL_ID, 64, 1, 0).unwrap();
    for p in 0..64 {
        hg_sums.set_sum(HI_GAIN, p, 100 + p as u32);
    }
    let traces = random_traces(&mut rng, 64, 2, 8, false, false, 0);
    let sum_bytes = SumCodec::new().encode_to_bytes(&hg_sums).unwrap();
    let sample_bytes = SampleCodec::new().encode_to_bytes(&traces).unwrap();

    let mut decoded = AdcData::new(TEL_ID, 0, 1, 0).unwrap();
    SampleCodec::new()
        .decode_from_bytes(&sample_bytes, &mut decoded)
        .unwrap();
    SumCodec::new()
        .decode_from_bytes(&sum_bytes, &mut decoded)
        .unwrap();
    assert_eq!(decoded.num_gains, 2);
    assert_traces_match(&traces, &decoded);
    for p in 0..64 {
        assert_eq!(decoded.adc_sum[HI_GAIN][p], 100 + p as u32);
        assert_eq!(decoded.adc_known[HI_GAIN][p], KNOWN_SUM | KNOWN_SAMPLES);
        assert_eq!(decoded.adc_known[LO_GAIN][p] & KNOWN_SUM, 0);
    }
}
