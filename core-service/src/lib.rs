//! # Core Service
//!
//! Host-facing facade over the compression backends.
//!
//! `CompressionService` picks a backend once, at construction, from the
//! host's [`BackendPreference`] and capability probe. Hosts then call
//! [`CompressionService::compress_audio`] before uploading a recording, or
//! [`CompressionService::compress_or_original`] when a failed compression
//! should simply fall back to uploading the original bytes.
//!
//! ```ignore
//! use core_service::{bootstrap_desktop, SourceAudio};
//!
//! let service = bootstrap_desktop()?;
//! let upload = service
//!     .compress_or_original(SourceAudio::new(bytes, "part1.webm"), &mut |p| println!("{p}%"))
//!     .await;
//! ```

pub mod error;
mod upload;

pub use error::{CoreError, Result};
pub use upload::UploadAudio;

pub use core_compress::{
    AudioCompressor, BackendKind, CancellationToken, CompressionFailure, CompressionResult,
    EncoderConfig, NoProgress, ProgressSink, SourceAudio, Stage, TranscoderConfig,
};
pub use core_runtime::config::{BackendPreference, CoreConfig, CoreConfigBuilder};

use core_compress::{ExternalToolCompressor, InProcessCompressor, ToolLoader};
use core_runtime::logging::strip_path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Entry point for hosts that want recordings compressed before upload.
pub struct CompressionService {
    primary: Arc<dyn AudioCompressor>,
    fallback: Option<Arc<dyn AudioCompressor>>,
    loader: Arc<ToolLoader>,
}

impl std::fmt::Debug for CompressionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionService")
            .field("backend", &self.primary.backend())
            .field("fallback", &self.fallback.as_ref().map(|c| c.backend()))
            .field("loader", &self.loader.status())
            .finish()
    }
}

impl CompressionService {
    /// Build the service with the default transcoder settings.
    ///
    /// # Errors
    ///
    /// See [`CompressionService::with_transcoder`].
    pub fn new(config: CoreConfig, encoder: EncoderConfig) -> Result<Self> {
        Self::with_transcoder(config, encoder, TranscoderConfig::default())
    }

    /// Build the service and select its backend.
    ///
    /// Selection rules:
    /// - `InProcess` / `ExternalTool`: that backend, or
    ///   [`CoreError::CapabilityMissing`] if the probe says it cannot run.
    /// - `Auto`: in-process when audio decoding is available, with the
    ///   external transcoder as fallback for formats the decoder rejects;
    ///   otherwise the external transcoder alone. When neither can run the
    ///   service is still built, but [`is_compression_supported`] reports
    ///   `false` and every call fails fast.
    ///
    /// [`is_compression_supported`]: CompressionService::is_compression_supported
    #[instrument(skip_all, fields(preference = ?config.backend))]
    pub fn with_transcoder(
        config: CoreConfig,
        encoder: EncoderConfig,
        transcoder: TranscoderConfig,
    ) -> Result<Self> {
        config.validate()?;

        let probe = Arc::clone(&config.capability_probe);
        let caps = probe.probe();
        let loader = Arc::new(ToolLoader::new(config.tool_sources.clone()));
        let has_sources = !config.tool_sources.is_empty();

        let in_process = || -> Result<Arc<dyn AudioCompressor>> {
            Ok(Arc::new(InProcessCompressor::new(
                encoder.clone(),
                Arc::clone(&probe),
            )?))
        };
        let external = || -> Result<Arc<dyn AudioCompressor>> {
            Ok(Arc::new(ExternalToolCompressor::new(
                transcoder.clone(),
                Arc::clone(&probe),
                Arc::clone(&loader),
            )?))
        };

        let (primary, fallback) = match config.backend {
            BackendPreference::InProcess => {
                if !caps.supports_in_process() {
                    return Err(capability_missing(
                        "AudioDecoding",
                        "In-process backend requested but audio decoding is unavailable",
                    ));
                }
                (in_process()?, None)
            }
            BackendPreference::ExternalTool => {
                if !caps.supports_external_tool() {
                    return Err(capability_missing(
                        "CrossOriginIsolation",
                        "External transcoder requested but shared memory or isolation is unavailable",
                    ));
                }
                (external()?, None)
            }
            BackendPreference::Auto => {
                if caps.supports_in_process() {
                    let fallback = if caps.supports_external_tool() && has_sources {
                        Some(external()?)
                    } else {
                        None
                    };
                    (in_process()?, fallback)
                } else if caps.supports_external_tool() && has_sources {
                    (external()?, None)
                } else {
                    warn!(?caps, "No compression backend can run here; uploads stay uncompressed");
                    (in_process()?, None)
                }
            }
        };

        info!(
            backend = ?primary.backend(),
            fallback = ?fallback.as_ref().map(|c| c.backend()),
            "Compression service ready"
        );

        Ok(Self {
            primary,
            fallback,
            loader,
        })
    }

    /// Build the service around caller-provided compressors.
    pub fn from_compressors(
        primary: Arc<dyn AudioCompressor>,
        fallback: Option<Arc<dyn AudioCompressor>>,
        loader: Arc<ToolLoader>,
    ) -> Self {
        Self {
            primary,
            fallback,
            loader,
        }
    }

    /// Backend used for every request.
    pub fn backend(&self) -> BackendKind {
        self.primary.backend()
    }

    /// Backend tried when the primary rejects the input format.
    pub fn fallback_backend(&self) -> Option<BackendKind> {
        self.fallback.as_ref().map(|c| c.backend())
    }

    /// Shared transcoder loader, for status display or [`ToolLoader::reset`].
    pub fn loader(&self) -> &Arc<ToolLoader> {
        &self.loader
    }

    /// Whether compression can run in the current environment.
    pub fn is_compression_supported(&self) -> bool {
        self.primary.is_supported()
            || self
                .fallback
                .as_ref()
                .map(|c| c.is_supported())
                .unwrap_or(false)
    }

    /// Estimated output size for a recording of `original_bytes`.
    pub fn estimate_compressed_size(&self, original_bytes: u64) -> u64 {
        self.primary.estimate_compressed_size(original_bytes)
    }

    /// Compress a recording to MP3.
    pub async fn compress_audio(
        &self,
        source: SourceAudio,
        progress: &mut dyn ProgressSink,
    ) -> std::result::Result<CompressionResult, CompressionFailure> {
        self.compress_audio_with_cancel(source, progress, CancellationToken::new())
            .await
    }

    /// Compress a recording to MP3, stopping early once `cancel` fires.
    ///
    /// If the primary backend rejects the input for a backend-specific
    /// reason (an unsupported container, say) and a fallback backend is
    /// configured, the fallback gets the same input. Such rejections happen
    /// before any progress is reported, so the progress contract holds.
    #[instrument(skip_all, fields(file = %strip_path(&source.file_name)))]
    pub async fn compress_audio_with_cancel(
        &self,
        source: SourceAudio,
        progress: &mut dyn ProgressSink,
        cancel: CancellationToken,
    ) -> std::result::Result<CompressionResult, CompressionFailure> {
        let fallback = match &self.fallback {
            Some(fallback) => fallback,
            None => {
                return self
                    .primary
                    .compress_with_cancel(source, progress, cancel)
                    .await
            }
        };

        let retry = source.clone();
        let mut tracker = TrackingSink {
            inner: progress,
            reported: false,
        };

        let outcome = self
            .primary
            .compress_with_cancel(source, &mut tracker, cancel.clone())
            .await;

        match outcome {
            Err(failure)
                if failure.cause().is_backend_specific()
                    && !tracker.reported
                    && fallback.is_supported() =>
            {
                info!(
                    error = %failure,
                    fallback = ?fallback.backend(),
                    "Primary backend rejected input, trying fallback"
                );
                fallback
                    .compress_with_cancel(retry, tracker.inner, cancel)
                    .await
            }
            outcome => outcome,
        }
    }

    /// Compress a recording, or hand back the original on any failure.
    ///
    /// Uploading must never be blocked by compression, so failures are only
    /// logged. A cancelled run also yields the original.
    pub async fn compress_or_original(
        &self,
        source: SourceAudio,
        progress: &mut dyn ProgressSink,
    ) -> UploadAudio {
        if !self.is_compression_supported() {
            debug!(file = %strip_path(&source.file_name), "Compression unsupported, uploading original");
            return UploadAudio::original(source, None);
        }

        let original = source.clone();
        match self.compress_audio(source, progress).await {
            Ok(result) => UploadAudio::Compressed(result),
            Err(failure) => {
                warn!(
                    file = %strip_path(&original.file_name),
                    stage = %failure.stage(),
                    error = %failure,
                    "Compression failed, uploading original"
                );
                UploadAudio::original(original, Some(failure))
            }
        }
    }
}

/// Progress sink wrapper that remembers whether anything was reported.
struct TrackingSink<'a> {
    inner: &'a mut dyn ProgressSink,
    reported: bool,
}

impl ProgressSink for TrackingSink<'_> {
    fn report(&mut self, percent: u8) {
        self.reported = true;
        self.inner.report(percent);
    }
}

fn capability_missing(capability: &str, message: &str) -> CoreError {
    CoreError::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Build a service with the desktop probe, the default ffmpeg sources and
/// the standard encoder profile.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<CompressionService> {
    let config = CoreConfig::builder().build()?;
    CompressionService::new(config, EncoderConfig::standard())
}
