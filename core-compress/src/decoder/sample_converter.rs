//! # Sample Format Converter
//!
//! Appends Symphonia audio buffers of any sample format to planar `f32`
//! channel vectors.

use crate::error::{CompressError, Result};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;

/// Sample converter that normalizes audio to planar f32.
///
/// Symphonia outputs audio in various formats (i8 through f64). This
/// converter maps every format to f32 in the nominal range [-1.0, 1.0] and
/// keeps the planar layout the pipeline works with.
pub struct SampleConverter;

impl SampleConverter {
    /// Append one decoded buffer to `channels`.
    ///
    /// `channels` is sized on the first call. A later buffer with a different
    /// channel count is an error, since the output must stay rectangular.
    pub fn append_planar(buffer: &AudioBufferRef<'_>, channels: &mut Vec<Vec<f32>>) -> Result<()> {
        match buffer {
            AudioBufferRef::F32(buf) => Self::append_converted(buf, channels, |s: f32| s),
            AudioBufferRef::F64(buf) => {
                Self::append_converted(buf, channels, |s: f64| s.into_sample())
            }
            AudioBufferRef::S32(buf) => {
                Self::append_converted(buf, channels, |s: i32| s.into_sample())
            }
            AudioBufferRef::S24(buf) => {
                Self::append_converted(buf, channels, |s| IntoSample::into_sample(s))
            }
            AudioBufferRef::S16(buf) => {
                Self::append_converted(buf, channels, |s: i16| s.into_sample())
            }
            AudioBufferRef::S8(buf) => {
                Self::append_converted(buf, channels, |s: i8| s.into_sample())
            }
            AudioBufferRef::U32(buf) => {
                Self::append_converted(buf, channels, |s: u32| s.into_sample())
            }
            AudioBufferRef::U24(buf) => {
                Self::append_converted(buf, channels, |s| IntoSample::into_sample(s))
            }
            AudioBufferRef::U16(buf) => {
                Self::append_converted(buf, channels, |s: u16| s.into_sample())
            }
            AudioBufferRef::U8(buf) => {
                Self::append_converted(buf, channels, |s: u8| s.into_sample())
            }
        }
    }

    fn append_converted<T>(
        buf: &AudioBuffer<T>,
        channels: &mut Vec<Vec<f32>>,
        convert: fn(T) -> f32,
    ) -> Result<()>
    where
        T: Sample + Copy,
    {
        let count = buf.spec().channels.count();

        if channels.is_empty() {
            channels.resize_with(count, Vec::new);
        } else if channels.len() != count {
            return Err(CompressError::Decode(format!(
                "Channel count changed mid-stream from {} to {}",
                channels.len(),
                count
            )));
        }

        for (idx, plane) in channels.iter_mut().enumerate() {
            plane.extend(buf.chan(idx).iter().copied().map(convert));
        }

        Ok(())
    }
}
