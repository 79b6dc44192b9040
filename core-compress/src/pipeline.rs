//! # In-Process Compression Pipeline
//!
//! Runs decode → downmix → resample → quantize → encode on a blocking worker
//! thread. Progress travels back over a small bounded channel and is
//! reported on the caller's task, in order. The worker checks the
//! cancellation token between stages and between encoder blocks, so a run
//! can be cancelled on any runtime flavour.

use crate::config::EncoderConfig;
use crate::decoder;
use crate::dsp::{count_clipped, downmix, quantize, resample};
use crate::encoder::{EncodeDriver, FrameEncoder, LameFrameEncoder};
use crate::error::{CompressError, CompressionFailure, Result};
use crate::sizing::{estimate_compressed_size, output_file_name};
use crate::traits::{AudioCompressor, BackendKind, CompressionResult, ProgressSink, SourceAudio};
use async_trait::async_trait;
use bridge_traits::CapabilityProbe;
use core_runtime::logging::strip_path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

type EncoderFactory = dyn Fn(&EncoderConfig) -> Result<Box<dyn FrameEncoder>> + Send + Sync;

/// Reports the worker may run ahead of the caller.
const PROGRESS_BACKLOG: usize = 4;

/// Compressor that decodes and encodes inside this process.
pub struct InProcessCompressor {
    config: EncoderConfig,
    probe: Arc<dyn CapabilityProbe>,
    encoder_factory: Arc<EncoderFactory>,
}

impl std::fmt::Debug for InProcessCompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessCompressor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl InProcessCompressor {
    /// Create a compressor using the LAME frame encoder.
    ///
    /// # Errors
    ///
    /// Returns [`CompressError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: EncoderConfig, probe: Arc<dyn CapabilityProbe>) -> Result<Self> {
        Self::with_encoder_factory(config, probe, |config| {
            Ok(Box::new(LameFrameEncoder::new(config)?) as Box<dyn FrameEncoder>)
        })
    }

    /// Create a compressor with a custom frame encoder per call.
    ///
    /// The factory is invoked on the worker thread, so the encoder itself
    /// need not be `Send`.
    pub fn with_encoder_factory<F>(
        config: EncoderConfig,
        probe: Arc<dyn CapabilityProbe>,
        factory: F,
    ) -> Result<Self>
    where
        F: Fn(&EncoderConfig) -> Result<Box<dyn FrameEncoder>> + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            probe,
            encoder_factory: Arc::new(factory),
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    async fn run(
        &self,
        source: &SourceAudio,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<CompressionResult> {
        if !self.is_supported() {
            return Err(CompressError::Unsupported(
                "Audio decoding is not available in this environment".to_string(),
            ));
        }
        ensure_not_cancelled(cancel)?;

        // Dropping this future stops the worker at its next check.
        let worker_cancel = cancel.child_token();
        let _stop_worker = worker_cancel.clone().drop_guard();

        let (tx, mut rx) = mpsc::channel(PROGRESS_BACKLOG);
        let job = StageJob {
            config: self.config.clone(),
            encoder_factory: Arc::clone(&self.encoder_factory),
            source: source.clone(),
        };
        let worker = tokio::task::spawn_blocking(move || {
            let mut sink = ChannelProgress {
                tx,
                cancel: worker_cancel.clone(),
            };
            job.run(&mut sink, &worker_cancel)
        });

        while let Some(percent) = rx.recv().await {
            progress.report(percent);
        }

        let mp3 = worker.await.map_err(|e| {
            CompressError::Encode(format!("Compression worker stopped unexpectedly: {}", e))
        })??;

        Ok(CompressionResult::mp3(mp3, output_file_name(&source.file_name)))
    }
}

/// Everything the worker thread needs, owned.
struct StageJob {
    config: EncoderConfig,
    encoder_factory: Arc<EncoderFactory>,
    source: SourceAudio,
}

impl StageJob {
    fn run(self, progress: &mut dyn ProgressSink, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let decoded = decoder::decode(&self.source)?;
        let source_rate = decoded.sample_rate;
        ensure_not_cancelled(cancel)?;

        let mono = downmix(decoded);
        let resampled = resample(&mono, source_rate, self.config.target_sample_rate);
        count_clipped(&resampled);
        let pcm = quantize(&resampled);
        drop(resampled);
        drop(mono);
        ensure_not_cancelled(cancel)?;

        let mut encoder = (self.encoder_factory)(&self.config)?;
        EncodeDriver::new(self.config.block_size).run(&pcm, encoder.as_mut(), progress, cancel)
    }
}

/// Worker-side sink forwarding reports to the caller's task.
///
/// Sending blocks while the backlog is full. A closed channel means the
/// caller went away, which cancels the run.
struct ChannelProgress {
    tx: mpsc::Sender<u8>,
    cancel: CancellationToken,
}

impl ProgressSink for ChannelProgress {
    fn report(&mut self, percent: u8) {
        if self.tx.blocking_send(percent).is_err() {
            debug!("Progress receiver dropped, cancelling");
            self.cancel.cancel();
        }
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(CompressError::Cancelled)
    } else {
        Ok(())
    }
}

#[async_trait]
impl AudioCompressor for InProcessCompressor {
    #[instrument(
        skip_all,
        fields(
            backend = "in-process",
            file = %strip_path(&source.file_name),
            input_bytes = source.data.len()
        )
    )]
    async fn compress_with_cancel(
        &self,
        source: SourceAudio,
        progress: &mut dyn ProgressSink,
        cancel: CancellationToken,
    ) -> std::result::Result<CompressionResult, CompressionFailure> {
        let started = Instant::now();

        match self.run(&source, progress, &cancel).await {
            Ok(result) => {
                info!(
                    output = %result.file_name,
                    input_bytes = source.data.len(),
                    output_bytes = result.data.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Compressed recording"
                );
                Ok(result)
            }
            Err(e) => {
                let failure = CompressionFailure::from(e);
                warn!(stage = %failure.stage(), error = %failure, "Compression failed");
                Err(failure)
            }
        }
    }

    fn is_supported(&self) -> bool {
        self.probe.probe().supports_in_process()
    }

    fn estimate_compressed_size(&self, original_bytes: u64) -> u64 {
        estimate_compressed_size(original_bytes, self.config.bitrate_kbps)
    }

    fn backend(&self) -> BackendKind {
        BackendKind::InProcess
    }
}
