//! # External Transcoder
//!
//! The alternate backend: a sandboxed command-line transcoder loaded once
//! from an ordered list of sources and driven through the
//! [`bridge_traits::TranscoderTool`] bridge.

mod compressor;
mod loader;

pub use compressor::ExternalToolCompressor;
pub use loader::{LoaderStatus, ToolLoader};
