//! # Audio Compression Core
//!
//! Re-encodes recorded answers into small mono MP3 files before upload.
//!
//! ## Overview
//!
//! This crate handles:
//! - Decoding arbitrary containers with Symphonia
//! - Downmixing, resampling to 22.05 kHz and 16-bit quantisation
//! - Block-wise MP3 encoding with progress reporting
//! - An alternate backend that drives an external transcoder, loaded once
//!   from an ordered list of sources
//! - Size estimates and display helpers for the upload UI
//!
//! Both backends implement [`AudioCompressor`]; pick one with
//! `core_service::CompressionService` or construct it directly.

pub mod config;
pub mod decoder;
pub mod dsp;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod sizing;
pub mod traits;
pub mod transcode;

pub use config::{EncodeQuality, EncoderConfig, TranscoderConfig};
pub use error::{CompressError, CompressionFailure, LoaderError, Result, Stage};
pub use pipeline::InProcessCompressor;
pub use sizing::{estimate_compressed_size, format_file_size, output_file_name, MP3_MEDIA_TYPE};
pub use traits::{
    AudioCodec, AudioCompressor, BackendKind, CompressionResult, DecodedAudio, NoProgress,
    ProgressSink, SourceAudio,
};
pub use transcode::{ExternalToolCompressor, LoaderStatus, ToolLoader};

// Re-export for hosts that cancel uploads
pub use tokio_util::sync::CancellationToken;
