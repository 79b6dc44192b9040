//! # Compress a Recording
//!
//! Compresses one audio file to a mono MP3 next to it, using the in-process
//! pipeline and falling back to a locally installed ffmpeg when the input
//! cannot be decoded in-process (e.g. Opus in WebM).
//!
//! Run with: `cargo run --example compress_file --package core-compress -- answer.webm`

use anyhow::{bail, Context, Result};
use bridge_desktop::{default_tool_sources, DesktopCapabilityProbe};
use bridge_traits::CapabilityProbe;
use core_compress::{
    format_file_size, AudioCompressor, EncoderConfig, ExternalToolCompressor, InProcessCompressor,
    SourceAudio, ToolLoader, TranscoderConfig,
};
use core_runtime::logging::{init_logging, LoggingConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::from_env()?)?;

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: compress_file <recording>");
    };

    let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    let source = SourceAudio::new(data, file_name);

    let probe: Arc<dyn CapabilityProbe> = Arc::new(DesktopCapabilityProbe::new());
    let in_process = InProcessCompressor::new(EncoderConfig::standard(), probe.clone())?;

    println!(
        "Input: {} ({}), estimated output {}",
        source.file_name,
        format_file_size(source.len()),
        format_file_size(in_process.estimate_compressed_size(source.len()))
    );

    let mut last = 0u8;
    let mut progress = |percent: u8| {
        if percent >= last + 10 || percent == 100 {
            println!("  {:>3}%", percent);
            last = percent;
        }
    };

    let result = match in_process.compress(source.clone(), &mut progress).await {
        Ok(result) => result,
        Err(failure) if failure.cause().is_backend_specific() => {
            println!("In-process failed ({}), trying ffmpeg", failure);
            let loader = Arc::new(ToolLoader::new(default_tool_sources()));
            let external = ExternalToolCompressor::new(TranscoderConfig::default(), probe, loader)?;
            external.compress(source, &mut progress).await?
        }
        Err(failure) => return Err(failure.into()),
    };

    let output = path.with_file_name(&result.file_name);
    tokio::fs::write(&output, &result.data).await?;
    println!(
        "Wrote {} ({}, {})",
        output.display(),
        format_file_size(result.len()),
        result.media_type
    );

    Ok(())
}
