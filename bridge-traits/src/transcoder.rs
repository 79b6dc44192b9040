//! Sandboxed Transcoder Abstractions
//!
//! Some hosts cannot (or prefer not to) run the in-process encoder. They can
//! instead expose an external command-line transcoder that works on a private
//! scratch filesystem: the core writes an input entry, executes the tool with
//! a fixed argument list and reads back the output entry.
//!
//! The tool's runtime artifacts may live in several places (bundled binary,
//! `PATH`, CDN mirror on the web). Each place is a [`ToolSource`]; the core
//! tries them in order until one loads.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{BridgeError, Result};

/// Outcome of a single tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code reported by the tool, if any
    pub exit_code: Option<i32>,
    /// Diagnostic output (stderr or the tool's log stream)
    pub log: String,
}

impl ToolOutput {
    pub fn success(log: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            log: log.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last few lines of the log, for error messages.
    pub fn log_tail(&self, lines: usize) -> String {
        let collected: Vec<&str> = self.log.lines().rev().take(lines).collect();
        collected.into_iter().rev().collect::<Vec<_>>().join("\n")
    }
}

/// A loaded transcoder with its own scratch filesystem.
///
/// Entry names are flat: implementations must reject anything that could
/// escape the scratch area (see [`validate_entry_name`]).
#[async_trait]
pub trait TranscoderTool: Send + Sync {
    /// Human-readable identifier used in logs.
    fn name(&self) -> &str;

    /// Store `data` under `name` in the scratch filesystem.
    async fn write_entry(&self, name: &str, data: Bytes) -> Result<()>;

    /// Run the tool with the given argument list.
    async fn execute(&self, args: &[String]) -> Result<ToolOutput>;

    /// Read back an entry produced by the tool.
    async fn read_entry(&self, name: &str) -> Result<Bytes>;

    /// Remove an entry. Removing a missing entry is not an error.
    async fn delete_entry(&self, name: &str) -> Result<()>;
}

/// One place the transcoder runtime can be loaded from.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Short description for logs (path, URL, ...).
    fn describe(&self) -> String;

    /// Load the tool. Expensive; the core caches the first success.
    async fn load(&self) -> Result<Arc<dyn TranscoderTool>>;
}

/// Reject scratch entry names that are empty or could address anything
/// outside the scratch area.
pub fn validate_entry_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');

    if invalid {
        return Err(BridgeError::InvalidEntryName(name.to_string()));
    }
    Ok(())
}
