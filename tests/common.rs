#![allow(dead_code)]

use adcpack::{
    AdcData, ListEntry, RawDataCodec, SampleCodec, SumCodec, HI_GAIN, KNOWN_SAMPLES, KNOWN_SUM,
    LO_GAIN, SAMPLE_MODE_FLAG, SIGNIFICANT_SAMPLES, SIGNIFICANT_SUM,
};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng as _, SeedableRng as _};

pub const TEL_ID: i32 = 14;

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(14)
}

/// Sum data consistent with what the given modes preserve.
#[derive(Debug, Clone, Copy)]
pub struct SumParams {
    pub num_pixels: usize,
    pub num_gains: usize,
    pub zero_sup: u8,
    pub data_red: u8,
    /// Number of significant pixels; ignored without zero suppression.
    pub significant: usize,
}

pub const THRESHOLD: i32 = 900;
pub const SCALE_HG8: i32 = 4;

pub fn random_sums(rng: &mut StdRng, params: SumParams) -> AdcData {
    let SumParams {
        num_pixels,
        num_gains,
        zero_sup,
        data_red,
        significant,
    } = params;
    let mut raw = AdcData::new(TEL_ID, num_pixels, num_gains, 0).unwrap();
    raw.zero_sup_mode = zero_sup;
    raw.data_red_mode = data_red;
    raw.threshold = THRESHOLD;
    raw.scale_hg8 = SCALE_HG8;

    let mut pixels: Vec<usize> = if zero_sup == 0 {
        (0..num_pixels).collect()
    } else {
        sample(rng, num_pixels, significant).into_vec()
    };
    pixels.sort_unstable();

    for &p in &pixels {
        // pedestal-like values, so that some fit the 8-bit form
        let hg = rng.random_range(200..1200);
        raw.set_sum(HI_GAIN, p, hg);
        if num_gains < 2 {
            continue;
        }
        let with_low_gain = match (data_red, zero_sup) {
            (0, _) => true,
            (2, 1) => i64::from(hg) > i64::from(THRESHOLD),
            _ => rng.random_bool(0.5),
        };
        if with_low_gain {
            raw.set_sum(LO_GAIN, p, rng.random_range(0..5000));
        }
    }
    raw
}

/// Traces consistent with what the given sample modes preserve.
pub fn random_traces(
    rng: &mut StdRng,
    num_pixels: usize,
    num_gains: usize,
    num_samples: usize,
    zero_sup: bool,
    data_red: bool,
    significant: usize,
) -> AdcData {
    let mut raw = AdcData::new(TEL_ID, num_pixels, num_gains, num_samples).unwrap();
    raw.zero_sup_mode = if zero_sup { SAMPLE_MODE_FLAG } else { 0 };
    raw.data_red_mode = if data_red { SAMPLE_MODE_FLAG } else { 0 };

    let pixels: Vec<usize> = if zero_sup {
        sample(rng, num_pixels, significant).into_vec()
    } else {
        (0..num_pixels).collect()
    };
    let mut trace = vec![0u16; num_samples];
    for &p in &pixels {
        for gain in 0..num_gains {
            if gain == LO_GAIN && zero_sup && data_red && rng.random_bool(0.5) {
                continue;
            }
            let pedestal = rng.random_range(100..400);
            for (i, s) in trace.iter_mut().enumerate() {
                *s = pedestal + rng.random_range(0..20) + if i == num_samples / 2 { 3000 } else { 0 };
            }
            raw.set_samples(gain, p, &trace);
        }
    }
    raw
}

/// Significant sum pixels as a caller-supplied list.
pub fn significant_list(raw: &AdcData) -> Vec<ListEntry> {
    (0..raw.num_pixels)
        .filter(|&p| raw.significant[p] & SIGNIFICANT_SUM != 0)
        .map(ListEntry::pixel)
        .collect()
}

pub fn roundtrip_sums(codec: &mut SumCodec, raw: &AdcData) -> AdcData {
    let bytes = codec.encode_to_bytes(raw).expect("Failed to encode sums");
    let mut decoded = AdcData::new(raw.tel_id, 0, 1, 0).unwrap();
    codec
        .decode_from_bytes(&bytes, &mut decoded)
        .expect("Failed to decode sums");
    assert!(decoded.known);
    decoded
}

pub fn roundtrip_samples(codec: &mut SampleCodec, raw: &AdcData) -> AdcData {
    let bytes = codec.encode_to_bytes(raw).expect("Failed to encode samples");
    let mut decoded = AdcData::new(raw.tel_id, 0, 1, 0).unwrap();
    codec
        .decode_from_bytes(&bytes, &mut decoded)
        .expect("Failed to decode samples");
    assert!(decoded.known);
    decoded
}

/// Compares sum flags and values; high-gain sums may differ by `hg_tolerance`.
pub fn assert_sums_match(expected: &AdcData, decoded: &AdcData, hg_tolerance: u32) {
    assert_eq!(decoded.num_pixels, expected.num_pixels);
    assert_eq!(decoded.num_gains, expected.num_gains);
    for p in 0..expected.num_pixels {
        assert_eq!(
            decoded.significant[p] & SIGNIFICANT_SUM,
            expected.significant[p] & SIGNIFICANT_SUM,
            "Significance mismatch at pixel {p}"
        );
        for g in 0..expected.num_gains {
            let known = expected.adc_known[g][p] & KNOWN_SUM;
            assert_eq!(
                decoded.adc_known[g][p] & KNOWN_SUM,
                known,
                "Known bit mismatch at gain {g}, pixel {p}"
            );
            let (a, b) = (expected.adc_sum[g][p], decoded.adc_sum[g][p]);
            if known == 0 {
                assert_eq!(b, 0, "Unknown sum not zero at gain {g}, pixel {p}");
            } else if g == HI_GAIN {
                assert!(a.abs_diff(b) <= hg_tolerance, "pixel {p}: {a} decoded as {b}");
            } else {
                assert_eq!(a, b, "Low-gain mismatch at pixel {p}");
            }
        }
    }
}

pub fn assert_traces_match(expected: &AdcData, decoded: &AdcData) {
    assert_eq!(decoded.num_samples, expected.num_samples);
    for p in 0..expected.num_pixels {
        assert_eq!(
            decoded.significant[p] & SIGNIFICANT_SAMPLES,
            expected.significant[p] & SIGNIFICANT_SAMPLES,
            "Significance mismatch at pixel {p}"
        );
        for g in 0..expected.num_gains {
            let known = expected.adc_known[g][p] & KNOWN_SAMPLES;
            assert_eq!(decoded.adc_known[g][p] & KNOWN_SAMPLES, known);
            if known == 0 {
                assert!(decoded.samples(g, p).iter().all(|&s| s == 0));
            } else {
                assert_eq!(decoded.samples(g, p), expected.samples(g, p), "gain {g}, pixel {p}");
            }
        }
    }
}
