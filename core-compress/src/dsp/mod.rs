//! # Signal Processing Stages
//!
//! The three pure stages between decoding and encoding:
//!
//! ```text
//! DecodedAudio → downmix → resample → quantize → i16 PCM
//! ```
//!
//! All stages are synchronous and allocation-light; none of them can fail.

mod downmix;
mod quantize;
mod resample;

pub use downmix::downmix;
pub use quantize::{count_clipped, quantize, quantize_sample};
pub use resample::resample;
