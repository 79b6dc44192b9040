//! # MP3 Encoder Driver
//!
//! Streams 16-bit mono PCM through a stateful [`FrameEncoder`] in fixed-size
//! blocks, reporting progress after each block and flushing once at the end.
//!
//! ## Progress
//!
//! After block `k` of `n` the driver reports `min(round(100 * k / n), 99)`.
//! `100` is reported exactly once, after the flush. With no samples there
//! are no blocks: the encoder is flushed and `100` is reported.

mod lame;

pub use lame::LameFrameEncoder;

use crate::error::{CompressError, Result};
use crate::traits::ProgressSink;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// A stateful MP3 frame encoder.
///
/// Output bytes are returned in emission order; an empty vector means the
/// encoder buffered the block without emitting a frame yet.
pub trait FrameEncoder {
    /// Encode one block of samples.
    fn encode_block(&mut self, pcm: &[i16]) -> Result<Vec<u8>>;

    /// Emit any buffered frames. Called exactly once, after the last block.
    fn flush(&mut self) -> Result<Vec<u8>>;
}

/// Progress value reported after `done` of `total` blocks.
pub fn block_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = (100.0 * done as f64 / total as f64).round() as u64;
    percent.min(99) as u8
}

/// Drives a [`FrameEncoder`] over a whole PCM buffer.
#[derive(Debug, Clone, Copy)]
pub struct EncodeDriver {
    block_size: usize,
}

impl EncodeDriver {
    /// `block_size` is validated by [`crate::EncoderConfig::validate`]; zero
    /// is treated as one sample per block.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks `samples` splits into.
    pub fn block_count(&self, samples: usize) -> usize {
        samples.div_ceil(self.block_size)
    }

    /// Encode `pcm` and return the concatenated MP3 stream.
    ///
    /// The token is checked before every block; once it is cancelled no
    /// further blocks are encoded, the encoder is not flushed and
    /// [`CompressError::Cancelled`] is returned.
    pub fn run(
        &self,
        pcm: &[i16],
        encoder: &mut dyn FrameEncoder,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let total = self.block_count(pcm.len());
        let mut output = Vec::new();

        debug!(
            samples = pcm.len(),
            blocks = total,
            block_size = self.block_size,
            "Encoding PCM"
        );

        for (index, block) in pcm.chunks(self.block_size).enumerate() {
            if cancel.is_cancelled() {
                debug!(block = index, "Encoding cancelled");
                return Err(CompressError::Cancelled);
            }

            let chunk = encoder.encode_block(block)?;
            trace!(block = index, bytes = chunk.len(), "Encoded block");
            if !chunk.is_empty() {
                output.extend_from_slice(&chunk);
            }

            progress.report(block_progress(index + 1, total));
        }

        let tail = encoder.flush()?;
        if !tail.is_empty() {
            output.extend_from_slice(&tail);
        }
        progress.report(100);

        debug!(bytes = output.len(), "Encoder flushed");
        Ok(output)
    }
}
