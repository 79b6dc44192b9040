//! Execution Capability Probing
//!
//! Lets the core ask the host which audio-processing paths it can run before
//! committing to one.

use serde::{Deserialize, Serialize};

/// Snapshot of what the current execution context can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionCapabilities {
    /// Host can decode compressed audio containers in-process.
    pub audio_decoding: bool,
    /// Shared-memory primitive required by the sandboxed transcoder is present.
    pub shared_memory: bool,
    /// Context is isolated from other origins/processes.
    pub cross_origin_isolated: bool,
}

impl ExecutionCapabilities {
    /// Everything available (native processes).
    pub fn full() -> Self {
        Self {
            audio_decoding: true,
            shared_memory: true,
            cross_origin_isolated: true,
        }
    }

    /// Nothing available.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns `true` if the in-process decode → encode pipeline can run.
    pub fn supports_in_process(&self) -> bool {
        self.audio_decoding
    }

    /// Returns `true` if the sandboxed external transcoder may be loaded.
    pub fn supports_external_tool(&self) -> bool {
        self.shared_memory && self.cross_origin_isolated
    }
}

/// Capability probe trait
///
/// Implemented per host:
/// - **Desktop**: every capability is present
/// - **Web**: reads `crossOriginIsolated` and checks for `SharedArrayBuffer`
///
/// Probes must be cheap and side-effect free; the core may call them on every
/// compression request.
pub trait CapabilityProbe: Send + Sync {
    /// Report the capabilities of the current execution context.
    fn probe(&self) -> ExecutionCapabilities;
}

/// Probe that always returns a fixed answer. Useful for tests and for hosts
/// that know their capabilities up front.
#[derive(Debug, Clone, Copy)]
pub struct StaticCapabilityProbe(pub ExecutionCapabilities);

impl CapabilityProbe for StaticCapabilityProbe {
    fn probe(&self) -> ExecutionCapabilities {
        self.0
    }
}
