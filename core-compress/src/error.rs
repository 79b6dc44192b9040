//! # Compression Error Types
//!
//! Error types for the re-encoding pipeline and the external transcoder.
//!
//! Every stage error is a [`CompressError`]. At the pipeline boundary it is
//! wrapped exactly once into a [`CompressionFailure`], which is what callers
//! of [`crate::AudioCompressor`] see.

use std::fmt;
use thiserror::Error;

/// Errors raised while loading the external transcoder.
///
/// `Clone` so that a single load outcome can be handed to every caller that
/// waited on the same in-flight attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    /// No transcoder source was configured.
    #[error("No transcoder sources configured")]
    NoSources,

    /// Every configured source was tried and none produced a usable tool.
    #[error("All {attempted} transcoder sources failed (last error: {last_error})")]
    AllSourcesFailed { attempted: usize, last_error: String },

    /// A previous load failed; the loader does not retry until reset.
    #[error("Transcoder failed to load earlier: {0}")]
    FailedPermanently(String),
}

/// Errors that can occur while compressing one recording.
#[derive(Error, Debug)]
pub enum CompressError {
    // ========================================================================
    // Input Errors
    // ========================================================================
    /// The container or codec data could not be decoded.
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// The container or codec is not handled by this build.
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    // ========================================================================
    // Encoding Errors
    // ========================================================================
    /// The MP3 frame encoder rejected its setup or a block.
    #[error("MP3 encoding failed: {0}")]
    Encode(String),

    // ========================================================================
    // External Transcoder Errors
    // ========================================================================
    /// The external transcoder could not be loaded.
    #[error("Transcoder unavailable: {0}")]
    Loader(#[from] LoaderError),

    /// The external transcoder ran but did not produce output.
    #[error("Transcoding failed: {0}")]
    Transcode(String),

    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// The current environment cannot run this backend.
    #[error("Compression not supported: {0}")]
    Unsupported(String),

    /// The caller cancelled the operation.
    #[error("Compression cancelled")]
    Cancelled,

    /// Encoder or transcoder settings are invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Configuration, capability checks, cancellation.
    Setup,
    /// Container probing and packet decoding.
    Decode,
    /// Block encoding and flush.
    Encode,
    /// Loading the external transcoder.
    Load,
    /// Running the external transcoder.
    Transcode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Decode => "decode",
            Stage::Encode => "encode",
            Stage::Load => "load",
            Stage::Transcode => "transcode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CompressError {
    /// Returns the stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            CompressError::Decode(_) | CompressError::UnsupportedFormat(_) => Stage::Decode,
            CompressError::Encode(_) => Stage::Encode,
            CompressError::Loader(_) => Stage::Load,
            CompressError::Transcode(_) | CompressError::Io(_) => Stage::Transcode,
            CompressError::Unsupported(_)
            | CompressError::Cancelled
            | CompressError::InvalidConfig(_) => Stage::Setup,
        }
    }

    /// Returns `true` if the input recording itself is the problem.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CompressError::Decode(_) | CompressError::UnsupportedFormat(_)
        )
    }

    /// Returns `true` if another backend might succeed where this one failed.
    pub fn is_backend_specific(&self) -> bool {
        matches!(
            self,
            CompressError::UnsupportedFormat(_)
                | CompressError::Unsupported(_)
                | CompressError::Loader(_)
        )
    }
}

/// Result type for stage operations.
pub type Result<T> = std::result::Result<T, CompressError>;

/// The single error type surfaced by [`crate::AudioCompressor::compress`].
///
/// Its message always reads `Failed to compress audio: <cause>`.
#[derive(Error, Debug)]
#[error("Failed to compress audio: {source}")]
pub struct CompressionFailure {
    stage: Stage,
    #[source]
    source: CompressError,
}

impl CompressionFailure {
    /// Stage that failed.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The underlying stage error.
    pub fn cause(&self) -> &CompressError {
        &self.source
    }

    pub fn into_cause(self) -> CompressError {
        self.source
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, CompressError::Cancelled)
    }
}

impl From<CompressError> for CompressionFailure {
    fn from(source: CompressError) -> Self {
        Self {
            stage: source.stage(),
            source,
        }
    }
}
