mod codec;
mod differential;
mod helpers;
mod ident;
mod reduction;
mod samples;
mod sums;
mod zero_suppression;

pub use codec::Codec;
pub use differential::{decode_deltas, encode_deltas, Amplitude, ValueCoding};
pub use helpers::GROUP_SIZE;
pub use ident::{IdentFields, IdentLayout, RecordKind};
pub use reduction::{DataReduction, Hg8Quantizer};
pub use samples::{SampleCodec, DEFAULT_SAMPLE_VERSION, MAX_SAMPLE_VERSION};
pub use sums::{SumCodec, DEFAULT_SUM_VERSION, MAX_SUM_VERSION};
pub use zero_suppression::{ListLayout, PixelRange, ZeroSuppression};
