//! # Core Compression Traits
//!
//! This module defines the data carried through one compression call and the
//! [`AudioCompressor`] abstraction both backends implement.
//!
//! ## Architecture
//!
//! ```text
//! SourceAudio → decode → DecodedAudio → downmix → resample → quantize → encode → CompressionResult
//! ```
//!
//! The in-process backend runs every stage itself; the external backend hands
//! the whole recording to a transcoder tool. Callers only see
//! [`AudioCompressor`], a synchronous [`ProgressSink`] and a
//! [`CompressionResult`] labelled `audio/mpeg`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_compress::{AudioCompressor, SourceAudio};
//!
//! async fn upload_answer(compressor: &dyn AudioCompressor, recording: SourceAudio) {
//!     let mut last = 0u8;
//!     let mut progress = |percent: u8| last = percent;
//!     match compressor.compress(recording, &mut progress).await {
//!         Ok(result) => println!("{} ({} bytes)", result.file_name, result.data.len()),
//!         Err(e) => println!("uploading original instead: {}", e),
//!     }
//! }
//! ```

use crate::error::CompressionFailure;
use crate::sizing::MP3_MEDIA_TYPE;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Audio Format Types
// ============================================================================

/// Source codecs recognised by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// MPEG-1 Audio Layer 3
    Mp3,
    /// Advanced Audio Coding (AAC/M4A)
    Aac,
    /// Free Lossless Audio Codec
    Flac,
    /// Ogg Vorbis
    Vorbis,
    /// Opus (browser recordings in WebM/Ogg)
    Opus,
    /// Uncompressed PCM (WAV/AIFF)
    Pcm,
    /// Apple Lossless Audio Codec
    Alac,
    /// Codec not recognized
    Unknown,
}

// ============================================================================
// Pipeline Data
// ============================================================================

/// A recording handed to a compressor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAudio {
    /// Encoded container bytes.
    pub data: Bytes,
    /// Original file name, used for the output name and as a format hint.
    pub file_name: String,
    /// Declared media type (e.g. `audio/webm`), if the host knows it.
    pub media_type: Option<String>,
}

impl SourceAudio {
    pub fn new(data: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            file_name: file_name.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Size of the encoded input in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extension of `file_name` (without the dot), if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name.rsplit(['/', '\\']).next()?;
        match name.rfind('.') {
            Some(dot) if dot > 0 && dot + 1 < name.len() => Some(&name[dot + 1..]),
            _ => None,
        }
    }
}

/// Decoded planar audio.
///
/// Every channel holds the same number of samples; values are nominally in
/// `[-1.0, 1.0]` but are not clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// A compressed recording ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    /// MP3 bytes.
    pub data: Bytes,
    /// Original base name with an `.mp3` extension.
    pub file_name: String,
    /// Always `audio/mpeg`.
    pub media_type: &'static str,
}

impl CompressionResult {
    pub fn mp3(data: impl Into<Bytes>, file_name: String) -> Self {
        Self {
            data: data.into(),
            file_name,
            media_type: MP3_MEDIA_TYPE,
        }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Receives integer completion percentages in `0..=100`.
///
/// Values are non-decreasing and `100` is reported exactly once, after the
/// encoder has been flushed. Calls happen on the compressing task.
pub trait ProgressSink: Send {
    fn report(&mut self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: FnMut(u8) + Send,
{
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// A sink that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

// ============================================================================
// Compressor
// ============================================================================

/// Which backend a compressor uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Decode, resample and encode inside this process.
    InProcess,
    /// Delegate to an external transcoder tool.
    ExternalTool,
}

/// Turns a recording into a mono MP3.
///
/// Compression is an optimisation: on any error the caller is expected to
/// upload the original recording instead.
#[async_trait]
pub trait AudioCompressor: Send + Sync {
    /// Compress with cooperative cancellation. The token is checked between
    /// stages and between encoder blocks.
    async fn compress_with_cancel(
        &self,
        source: SourceAudio,
        progress: &mut dyn ProgressSink,
        cancel: CancellationToken,
    ) -> std::result::Result<CompressionResult, CompressionFailure>;

    /// Compress `source`, reporting progress to `progress`.
    async fn compress(
        &self,
        source: SourceAudio,
        progress: &mut dyn ProgressSink,
    ) -> std::result::Result<CompressionResult, CompressionFailure> {
        self.compress_with_cancel(source, progress, CancellationToken::new())
            .await
    }

    /// Whether this backend can run in the current environment.
    fn is_supported(&self) -> bool;

    /// Display estimate of the output size for an input of `original_bytes`.
    fn estimate_compressed_size(&self, original_bytes: u64) -> u64;

    fn backend(&self) -> BackendKind;
}
