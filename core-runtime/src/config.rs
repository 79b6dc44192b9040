//! # Core Configuration Module
//!
//! Provides configuration management for the audio compression core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the bridges the core needs and the backend preference.
//! It enforces fail-fast validation so a host learns about a missing
//! capability at startup rather than on the first upload.
//!
//! ## Required Dependencies
//!
//! - `CapabilityProbe` - Decides which compression backend can run
//!
//! ## Optional Dependencies
//!
//! - `ToolSource`s - Ordered locations of the external transcoder (required
//!   only when the external backend is forced)
//!
//! When the `desktop-shims` feature is enabled, the desktop probe and the
//! default ffmpeg sources are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{BackendPreference, CoreConfig};
//!
//! let config = CoreConfig::builder()
//!     .backend(BackendPreference::Auto)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{CapabilityProbe, ToolSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which compression backend the host wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendPreference {
    /// Pick from the capability probe at startup: in-process when audio
    /// decoding is available, otherwise the external transcoder.
    #[default]
    Auto,
    /// Always use the in-process decode → encode pipeline.
    InProcess,
    /// Always use the external transcoder.
    ExternalTool,
}

/// Core configuration for the audio compression core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Probe used to select and gate compression backends (required)
    pub capability_probe: Arc<dyn CapabilityProbe>,

    /// Ordered transcoder sources, tried first to last
    pub tool_sources: Vec<Arc<dyn ToolSource>>,

    /// Backend selection policy
    pub backend: BackendPreference,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("capability_probe", &"CapabilityProbe { ... }")
            .field(
                "tool_sources",
                &self
                    .tool_sources
                    .iter()
                    .map(|s| s.describe())
                    .collect::<Vec<_>>(),
            )
            .field("backend", &self.backend)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// Forcing the external backend without any tool source can never
    /// succeed, so it is rejected here.
    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendPreference::ExternalTool && self.tool_sources.is_empty() {
            return Err(Error::Config(
                "External transcoder backend selected but no ToolSource provided. \
                 Inject at least one ToolSource or use BackendPreference::Auto."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_probe_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "CapabilityProbe".to_string(),
        message: "CapabilityProbe implementation is required to select a compression backend. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use DesktopCapabilityProbe. \
                 Web: inject a probe that reads crossOriginIsolated and SharedArrayBuffer support."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_capability_probe() -> Result<Arc<dyn CapabilityProbe>> {
    use bridge_desktop::DesktopCapabilityProbe;

    let probe: Arc<dyn CapabilityProbe> = Arc::new(DesktopCapabilityProbe::new());
    Ok(probe)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_capability_probe() -> Result<Arc<dyn CapabilityProbe>> {
    Err(capability_probe_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_tool_sources() -> Vec<Arc<dyn ToolSource>> {
    bridge_desktop::default_tool_sources()
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_tool_sources() -> Vec<Arc<dyn ToolSource>> {
    Vec::new()
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    capability_probe: Option<Arc<dyn CapabilityProbe>>,
    tool_sources: Vec<Arc<dyn ToolSource>>,
    backend: BackendPreference,
}

impl CoreConfigBuilder {
    /// Sets the capability probe implementation.
    ///
    /// If not provided, the desktop probe is used when the `desktop-shims`
    /// feature is enabled.
    pub fn capability_probe(mut self, probe: Arc<dyn CapabilityProbe>) -> Self {
        self.capability_probe = Some(probe);
        self
    }

    /// Appends one transcoder source. Sources are tried in insertion order.
    pub fn tool_source(mut self, source: Arc<dyn ToolSource>) -> Self {
        self.tool_sources.push(source);
        self
    }

    /// Replaces the transcoder source list.
    pub fn tool_sources(mut self, sources: Vec<Arc<dyn ToolSource>>) -> Self {
        self.tool_sources = sources;
        self
    }

    /// Sets the backend selection policy. Default: [`BackendPreference::Auto`].
    pub fn backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no probe is provided and no
    ///   platform default is compiled in
    /// - [`Error::Config`] when validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let capability_probe = match self.capability_probe {
            Some(probe) => probe,
            None => provide_default_capability_probe()?,
        };

        let tool_sources = if self.tool_sources.is_empty() {
            provide_default_tool_sources()
        } else {
            self.tool_sources
        };

        let config = CoreConfig {
            capability_probe,
            tool_sources,
            backend: self.backend,
        };

        config.validate()?;
        Ok(config)
    }
}
