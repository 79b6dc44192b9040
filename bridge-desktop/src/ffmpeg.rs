//! FFmpeg-backed Transcoder
//!
//! Runs a locally installed `ffmpeg` binary as the external transcoder. Each
//! loaded tool gets a private scratch directory under the platform cache
//! directory; entries are plain files inside it.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    transcoder::{validate_entry_name, ToolOutput, ToolSource, TranscoderTool},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Environment variable that points at an explicit ffmpeg binary.
pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";

const WELL_KNOWN_LOCATIONS: &[&str] = &[
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
    "/usr/bin/ffmpeg",
];

/// Ordered list of places to look for ffmpeg on desktop:
/// `$FFMPEG_PATH`, then `ffmpeg` on `PATH`, then well-known install locations.
pub fn default_tool_sources() -> Vec<Arc<dyn ToolSource>> {
    let mut sources: Vec<Arc<dyn ToolSource>> = Vec::new();

    if let Some(path) = std::env::var_os(FFMPEG_PATH_ENV) {
        sources.push(Arc::new(FfmpegBinarySource::new(path)));
    }

    sources.push(Arc::new(FfmpegBinarySource::new("ffmpeg")));

    for location in WELL_KNOWN_LOCATIONS {
        sources.push(Arc::new(FfmpegBinarySource::new(location)));
    }

    sources
}

fn scratch_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("speaking-practice-core")
        .join("transcoder")
}

/// One candidate ffmpeg binary.
///
/// Loading runs `<binary> -version`; a binary that is missing or exits with
/// a failure status counts as a failed source.
#[derive(Debug, Clone)]
pub struct FfmpegBinarySource {
    binary: PathBuf,
}

impl FfmpegBinarySource {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl ToolSource for FfmpegBinarySource {
    fn describe(&self) -> String {
        self.binary.display().to_string()
    }

    async fn load(&self) -> Result<Arc<dyn TranscoderTool>> {
        debug!(binary = %self.binary.display(), "Probing ffmpeg binary");

        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                BridgeError::NotAvailable(format!("{}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(BridgeError::NotAvailable(format!(
                "{} -version exited with {}",
                self.binary.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("ffmpeg")
            .to_string();

        let scratch_dir = scratch_root().join(Uuid::new_v4().to_string());
        fs::create_dir_all(&scratch_dir).await?;

        info!(
            binary = %self.binary.display(),
            version = %version,
            "Loaded ffmpeg transcoder"
        );

        Ok(Arc::new(FfmpegTool::new(self.binary.clone(), scratch_dir, version)))
    }
}

/// A loaded ffmpeg binary with its scratch directory.
///
/// The scratch directory is removed when the tool is dropped.
pub struct FfmpegTool {
    binary: PathBuf,
    scratch_dir: PathBuf,
    label: String,
}

impl FfmpegTool {
    pub(crate) fn new(binary: PathBuf, scratch_dir: PathBuf, label: String) -> Self {
        Self {
            binary,
            scratch_dir,
            label,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf> {
        validate_entry_name(name)?;
        Ok(self.scratch_dir.join(name))
    }
}

impl Drop for FfmpegTool {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.scratch_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = ?self.scratch_dir, error = %e, "Failed to remove scratch directory");
            }
        }
    }
}

#[async_trait]
impl TranscoderTool for FfmpegTool {
    fn name(&self) -> &str {
        &self.label
    }

    async fn write_entry(&self, name: &str, data: Bytes) -> Result<()> {
        let path = self.entry_path(name)?;
        fs::write(&path, data.as_ref()).await?;
        debug!(entry = name, size = data.len(), "Wrote scratch entry");
        Ok(())
    }

    async fn execute(&self, args: &[String]) -> Result<ToolOutput> {
        debug!(binary = %self.binary.display(), ?args, "Running transcoder");

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.scratch_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!(
                    "Failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            log: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn read_entry(&self, name: &str) -> Result<Bytes> {
        let path = self.entry_path(name)?;
        let data = fs::read(&path).await?;
        debug!(entry = name, size = data.len(), "Read scratch entry");
        Ok(Bytes::from(data))
    }

    async fn delete_entry(&self, name: &str) -> Result<()> {
        let path = self.entry_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(entry = name, "Deleted scratch entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}
