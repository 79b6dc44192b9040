//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `CapabilityProbe` reporting full native capabilities
//! - `ToolSource` / `TranscoderTool` backed by a locally installed `ffmpeg`
//!   binary running in a per-tool scratch directory
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_tool_sources, DesktopCapabilityProbe};
//! use std::sync::Arc;
//!
//! let probe = Arc::new(DesktopCapabilityProbe::new());
//! let sources = default_tool_sources();
//! // Hand both to `core_runtime::config::CoreConfig::builder()`
//! ```

mod capability;
mod ffmpeg;

pub use capability::DesktopCapabilityProbe;
pub use ffmpeg::{default_tool_sources, FfmpegBinarySource, FfmpegTool, FFMPEG_PATH_ENV};
