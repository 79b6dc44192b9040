//! # External Transcoder Backend
//!
//! Compresses by handing the recording to an external transcoder tool:
//! write the input entry, run the tool, read the output entry. Both scratch
//! entries are removed afterwards, whatever the outcome.

use super::loader::ToolLoader;
use crate::config::TranscoderConfig;
use crate::error::{CompressError, CompressionFailure, Result};
use crate::sizing::{estimate_compressed_size, output_file_name};
use crate::traits::{AudioCompressor, BackendKind, CompressionResult, ProgressSink, SourceAudio};
use async_trait::async_trait;
use bridge_traits::{CapabilityProbe, TranscoderTool};
use core_runtime::logging::strip_path;
use futures::future::{self, Either};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Progress after the tool is loaded.
const PROGRESS_LOADED: u8 = 10;
/// Progress after the input entry is written.
const PROGRESS_STAGED: u8 = 20;
/// Progress after the tool exits successfully.
const PROGRESS_TRANSCODED: u8 = 90;

const LOG_TAIL_LINES: usize = 5;

/// Compressor backed by an external transcoder.
pub struct ExternalToolCompressor {
    config: TranscoderConfig,
    probe: Arc<dyn CapabilityProbe>,
    loader: Arc<ToolLoader>,
}

/// Scratch entry names for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScratchEntries {
    input: String,
    output: String,
}

impl ScratchEntries {
    fn for_source(source: &SourceAudio) -> Self {
        let id = Uuid::new_v4();
        let extension = source
            .extension()
            .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "bin".to_string());

        Self {
            input: format!("input-{}.{}", id, extension),
            output: format!("output-{}.mp3", id),
        }
    }
}

impl ExternalToolCompressor {
    /// # Errors
    ///
    /// Returns [`CompressError::InvalidConfig`] if `config` fails validation.
    pub fn new(
        config: TranscoderConfig,
        probe: Arc<dyn CapabilityProbe>,
        loader: Arc<ToolLoader>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            probe,
            loader,
        })
    }

    pub fn loader(&self) -> &Arc<ToolLoader> {
        &self.loader
    }

    pub fn config(&self) -> &TranscoderConfig {
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
                "External transcoder needs shared memory and cross-origin isolation".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled);
        }

        let tool = self.loader.load().await?;
        progress.report(PROGRESS_LOADED);

        let entries = ScratchEntries::for_source(source);
        let outcome = self
            .transcode(tool.as_ref(), source, &entries, progress, cancel)
            .await;

        cleanup(tool.as_ref(), &entries).await;

        let data = outcome?;
        progress.report(100);
        Ok(CompressionResult::mp3(data, output_file_name(&source.file_name)))
    }

    async fn transcode(
        &self,
        tool: &dyn TranscoderTool,
        source: &SourceAudio,
        entries: &ScratchEntries,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<bytes::Bytes> {
        tool.write_entry(&entries.input, source.data.clone())
            .await
            .map_err(|e| CompressError::Transcode(format!("Failed to stage input: {}", e)))?;
        progress.report(PROGRESS_STAGED);

        let args = self.config.args(&entries.input, &entries.output);
        debug!(tool = tool.name(), ?args, "Running transcoder");

        let execution = tool.execute(&args);
        let cancelled = cancel.cancelled();
        futures::pin_mut!(execution);
        futures::pin_mut!(cancelled);

        let output = match future::select(execution, cancelled).await {
            Either::Left((result, _)) => result
                .map_err(|e| CompressError::Transcode(format!("Failed to run transcoder: {}", e)))?,
            Either::Right(((), _)) => {
                debug!("Transcoding cancelled");
                return Err(CompressError::Cancelled);
            }
        };

        if !output.is_success() {
            return Err(CompressError::Transcode(format!(
                "{} exited with {}: {}",
                tool.name(),
                output
                    .exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "no exit code".to_string()),
                output.log_tail(LOG_TAIL_LINES)
            )));
        }
        progress.report(PROGRESS_TRANSCODED);

        let data = tool
            .read_entry(&entries.output)
            .await
            .map_err(|e| CompressError::Transcode(format!("Failed to read output: {}", e)))?;

        if data.is_empty() {
            return Err(CompressError::Transcode(
                "Transcoder produced an empty file".to_string(),
            ));
        }

        Ok(data)
    }
}

/// Remove both scratch entries. Failures are logged, never returned.
async fn cleanup(tool: &dyn TranscoderTool, entries: &ScratchEntries) {
    for name in [&entries.input, &entries.output] {
        if let Err(e) = tool.delete_entry(name).await {
            warn!(entry = %name, error = %e, "Failed to delete scratch entry");
        }
    }
}

#[async_trait]
impl AudioCompressor for ExternalToolCompressor {
    #[instrument(
        skip_all,
        fields(
            backend = "external-tool",
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
        self.probe.probe().supports_external_tool()
    }

    fn estimate_compressed_size(&self, original_bytes: u64) -> u64 {
        estimate_compressed_size(original_bytes, self.config.bitrate_kbps)
    }

    fn backend(&self) -> BackendKind {
        BackendKind::ExternalTool
    }
}
