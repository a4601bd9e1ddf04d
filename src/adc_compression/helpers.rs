use std::ops::Range;

/// Pixels per group of the bitmap layouts.
pub const GROUP_SIZE: usize = 16;

/// Splits `0..num_pixels` into consecutive groups of [`GROUP_SIZE`] pixels.
/// The last group may be shorter.
pub fn groups(num_pixels: usize) -> impl Iterator<Item = Range<usize>> {
    (0..num_pixels)
        .step_by(GROUP_SIZE)
        .map(move |start| start..(start + GROUP_SIZE).min(num_pixels))
}

/// Mask with one bit set for every pixel of `group`.
pub fn group_mask(group: &Range<usize>) -> u16 {
    let len = group.len();
    if len >= GROUP_SIZE {
        u16::MAX
    } else {
        (1u16 << len) - 1
    }
}

/// Fits a count into an `i16` field, the limit of the short count layouts.
pub fn fits_i16(n: usize) -> bool {
    n <= i16::MAX as usize
}
