//! Desktop Capability Probe

use bridge_traits::capability::{CapabilityProbe, ExecutionCapabilities};

/// Desktop capability probe
///
/// Native processes have their own address space and can spawn child
/// processes, so both the in-process pipeline and the external transcoder are
/// available. The in-process path can be switched off for hosts that ship
/// without the decoder features.
#[derive(Debug, Clone)]
pub struct DesktopCapabilityProbe {
    audio_decoding: bool,
}

impl DesktopCapabilityProbe {
    pub fn new() -> Self {
        Self {
            audio_decoding: true,
        }
    }

    /// Report the in-process decoder as unavailable.
    pub fn without_audio_decoding() -> Self {
        Self {
            audio_decoding: false,
        }
    }
}

impl Default for DesktopCapabilityProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProbe for DesktopCapabilityProbe {
    fn probe(&self) -> ExecutionCapabilities {
        ExecutionCapabilities {
            audio_decoding: self.audio_decoding,
            ..ExecutionCapabilities::full()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_supports_everything() {
        let caps = DesktopCapabilityProbe::new().probe();
        assert!(caps.supports_in_process());
        assert!(caps.supports_external_tool());
    }

    #[test]
    fn test_without_audio_decoding() {
        let caps = DesktopCapabilityProbe::without_audio_decoding().probe();
        assert!(!caps.supports_in_process());
        assert!(caps.supports_external_tool());
    }
}
