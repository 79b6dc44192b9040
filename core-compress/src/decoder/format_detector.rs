//! # Format Detection Module
//!
//! Builds Symphonia probe hints from the recording's name and media type and
//! checks detected codecs against the enabled decoder features.

use crate::error::{CompressError, Result};
use crate::traits::{AudioCodec, SourceAudio};
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Format detector for recordings.
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from the file extension and the declared media
    /// type. Parameters such as `;codecs=opus` are stripped from the media
    /// type before it is handed to the probe.
    pub fn hint_for(source: &SourceAudio) -> Hint {
        let mut hint = Hint::new();

        match source.extension() {
            Some(extension) => {
                debug!(extension, "Setting probe hint extension");
                hint.with_extension(extension);
            }
            None => debug!("No file extension found, probe will auto-detect"),
        }

        if let Some(media_type) = source.media_type.as_deref() {
            let essence = Self::media_type_essence(media_type);
            if !essence.is_empty() {
                debug!(media_type = essence, "Setting probe hint media type");
                hint.mime_type(essence);
            }
        }

        hint
    }

    /// `"audio/webm;codecs=opus"` → `"audio/webm"`.
    pub fn media_type_essence(media_type: &str) -> &str {
        media_type.split(';').next().unwrap_or("").trim()
    }

    /// Detect audio codec from Symphonia codec type.
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_MP3 {
            AudioCodec::Mp3
        } else if codec_type == CODEC_TYPE_AAC {
            AudioCodec::Aac
        } else if codec_type == CODEC_TYPE_FLAC {
            AudioCodec::Flac
        } else if codec_type == CODEC_TYPE_VORBIS {
            AudioCodec::Vorbis
        } else if codec_type == CODEC_TYPE_OPUS {
            AudioCodec::Opus
        } else if codec_type == CODEC_TYPE_ALAC {
            AudioCodec::Alac
        } else if [
            CODEC_TYPE_PCM_S16LE,
            CODEC_TYPE_PCM_S16BE,
            CODEC_TYPE_PCM_S24LE,
            CODEC_TYPE_PCM_S24BE,
            CODEC_TYPE_PCM_S32LE,
            CODEC_TYPE_PCM_S32BE,
            CODEC_TYPE_PCM_U8,
            CODEC_TYPE_PCM_F32LE,
            CODEC_TYPE_PCM_F32BE,
            CODEC_TYPE_PCM_F64LE,
            CODEC_TYPE_PCM_F64BE,
        ]
        .contains(&codec_type)
        {
            AudioCodec::Pcm
        } else {
            warn!("Unknown codec type: {:?}", codec_type);
            AudioCodec::Unknown
        }
    }

    /// Validate if a codec is supported by current feature flags.
    pub fn validate_codec_support(codec: &AudioCodec) -> Result<()> {
        let (enabled, feature) = match codec {
            AudioCodec::Mp3 => (cfg!(feature = "decoder-mp3"), "decoder-mp3"),
            AudioCodec::Flac => (cfg!(feature = "decoder-flac"), "decoder-flac"),
            AudioCodec::Vorbis => (cfg!(feature = "decoder-vorbis"), "decoder-vorbis"),
            AudioCodec::Aac => (cfg!(feature = "decoder-aac"), "decoder-aac"),
            AudioCodec::Alac => (cfg!(feature = "decoder-alac"), "decoder-alac"),
            AudioCodec::Pcm => (
                cfg!(any(feature = "decoder-wav", feature = "decoder-aiff")),
                "decoder-wav",
            ),
            AudioCodec::Opus => {
                return Err(CompressError::UnsupportedFormat(
                    "Opus cannot be decoded in-process; use the external transcoder".to_string(),
                ))
            }
            AudioCodec::Unknown => {
                return Err(CompressError::UnsupportedFormat(
                    "Unknown audio codec".to_string(),
                ))
            }
        };

        if enabled {
            Ok(())
        } else {
            Err(CompressError::UnsupportedFormat(format!(
                "{:?} decoder not enabled. Enable '{}' feature",
                codec, feature
            )))
        }
    }
}
