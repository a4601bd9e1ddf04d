use adcpack::{AdcData, ListEntry, HI_GAIN, LO_GAIN};

/// Sum data of a small camera in any of the nine sum modes.
#[derive(arbitrary::Arbitrary, Debug)]
pub struct FuzzSums {
    pub zero_sup: u8,
    pub data_red: u8,
    pub two_gains: bool,
    pub use_list: bool,
    pub offset_hg8: i16,
    pub scale_hg8: i8,
    pub threshold: i16,
    /// (pixel, high gain, low gain); pixels wrap at the camera size
    pub pixels: Vec<(u16, u32, Option<u32>)>,
    pub num_pixels: u16,
}

impl FuzzSums {
    pub fn to_raw(&self) -> AdcData {
        let num_pixels = usize::from(self.num_pixels % 4096);
        let num_gains = if self.two_gains { 2 } else { 1 };
        let mut raw = AdcData::new(1, num_pixels, num_gains, 0).unwrap();
        raw.zero_sup_mode = self.zero_sup % 3;
        raw.data_red_mode = self.data_red % 3;
        raw.offset_hg8 = i32::from(self.offset_hg8);
        raw.scale_hg8 = i32::from(self.scale_hg8);
        raw.threshold = i32::from(self.threshold);
        if num_pixels == 0 {
            return raw;
        }
        for &(pixel, hg, lg) in self.pixels.iter().take(num_pixels) {
            let pixel = usize::from(pixel) % num_pixels;
            raw.set_sum(HI_GAIN, pixel, hg);
            if let (Some(lg), true) = (lg, self.two_gains) {
                raw.set_sum(LO_GAIN, pixel, lg);
            }
        }
        if self.use_list {
            raw.list = (0..num_pixels)
                .filter(|&p| raw.significant[p] != 0)
                .map(ListEntry::pixel)
                .collect();
            raw.list_known = true;
        }
        raw
    }
}
