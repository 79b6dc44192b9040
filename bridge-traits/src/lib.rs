//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the audio compression core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that must be implemented differently per platform
//! (desktop, web).
//!
//! ## Traits
//!
//! - [`CapabilityProbe`](capability::CapabilityProbe) - Which compression paths the host can run
//! - [`ToolSource`](transcoder::ToolSource) - One location the external transcoder can be loaded from
//! - [`TranscoderTool`](transcoder::TranscoderTool) - A loaded transcoder with a scratch filesystem
//! - [`LoggerSink`](log_sink::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and include context (binary path, entry name) in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind an `Arc`.

pub mod capability;
pub mod error;
pub mod log_sink;
pub mod transcoder;

pub use error::{BridgeError, Result};

// Re-export commonly used types
pub use capability::{CapabilityProbe, ExecutionCapabilities, StaticCapabilityProbe};
pub use log_sink::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use transcoder::{validate_entry_name, ToolOutput, ToolSource, TranscoderTool};
