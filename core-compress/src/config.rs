//! # Compression Configuration
//!
//! Configuration types for the in-process encoder and the external
//! transcoder backend.

use crate::error::{CompressError, Result};
use crate::sizing::size_ratio_percent;
use serde::{Deserialize, Serialize};

/// Samples per MPEG-1 Layer III granule pair; block sizes must be a
/// multiple of half of this.
pub const MP3_FRAME_SAMPLES: usize = 1152;

const MP3_GRANULE_SAMPLES: usize = 576;

/// Sample rates an MP3 stream can carry (MPEG-1, MPEG-2 and MPEG-2.5).
pub const SUPPORTED_SAMPLE_RATES: &[u32] = &[
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000,
];

/// Constant bitrates the frame encoder accepts, in kbps.
pub const SUPPORTED_BITRATES: &[u32] = &[
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Bitrate range (kbps) an MP3 stream at `sample_rate` can carry.
///
/// MPEG-1 (32 kHz and up) spans 32..=320; MPEG-2 and 2.5 top out at 160.
/// Returns `None` for rates MP3 cannot carry at all.
pub fn bitrate_range_for_sample_rate(sample_rate: u32) -> Option<(u32, u32)> {
    match sample_rate {
        32_000 | 44_100 | 48_000 => Some((32, 320)),
        8_000 | 11_025 | 12_000 | 16_000 | 22_050 | 24_000 => Some((8, 160)),
        _ => None,
    }
}

fn check_bitrate_and_rate(context: &str, bitrate_kbps: u32, sample_rate: u32) -> Result<()> {
    if !SUPPORTED_BITRATES.contains(&bitrate_kbps) {
        return Err(CompressError::InvalidConfig(format!(
            "{}bitrate_kbps {} is not a supported MP3 bitrate",
            context, bitrate_kbps
        )));
    }

    let (min, max) = bitrate_range_for_sample_rate(sample_rate).ok_or_else(|| {
        CompressError::InvalidConfig(format!(
            "{}sample rate {} is not a valid MP3 sample rate",
            context, sample_rate
        ))
    })?;

    if !(min..=max).contains(&bitrate_kbps) {
        return Err(CompressError::InvalidConfig(format!(
            "{}bitrate_kbps {} is outside {}..={} kbps allowed at {} Hz",
            context, bitrate_kbps, min, max, sample_rate
        )));
    }

    Ok(())
}

/// Encoder speed/quality trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeQuality {
    /// Fastest psychoacoustic model.
    Fast,
    /// LAME's recommended default.
    #[default]
    Balanced,
    /// Slowest, best sounding.
    Best,
}

/// In-process encoder configuration.
///
/// Controls output bitrate, output sample rate, the block size fed to the
/// frame encoder, and the encoder quality setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Constant output bitrate in kbps.
    ///
    /// Default: 64 kbps.
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,

    /// Output sample rate in Hz. The decoded signal is resampled to this
    /// rate before encoding.
    ///
    /// Default: 22050 Hz.
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,

    /// Number of mono samples handed to the frame encoder per call.
    ///
    /// Default: 1152 (one MPEG-1 frame).
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Encoder quality setting.
    #[serde(default)]
    pub quality: EncodeQuality,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: default_bitrate_kbps(),
            target_sample_rate: default_target_sample_rate(),
            block_size: default_block_size(),
            quality: EncodeQuality::default(),
        }
    }
}

impl EncoderConfig {
    /// Small files for spoken answers: 32 kbps.
    pub fn speech() -> Self {
        Self {
            bitrate_kbps: 32,
            ..Default::default()
        }
    }

    /// The default profile: 64 kbps.
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn with_bitrate(mut self, bitrate_kbps: u32) -> Self {
        self.bitrate_kbps = bitrate_kbps;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_quality(mut self, quality: EncodeQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Expected compressed size as a percentage of the input size.
    pub fn size_ratio_percent(&self) -> u64 {
        size_ratio_percent(self.bitrate_kbps)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        check_bitrate_and_rate("", self.bitrate_kbps, self.target_sample_rate)?;

        if self.block_size == 0 || self.block_size % MP3_GRANULE_SAMPLES != 0 {
            return Err(CompressError::InvalidConfig(format!(
                "block_size must be a non-zero multiple of {}, got {}",
                MP3_GRANULE_SAMPLES, self.block_size
            )));
        }

        Ok(())
    }
}

fn default_bitrate_kbps() -> u32 {
    64
}

fn default_target_sample_rate() -> u32 {
    22_050
}

fn default_block_size() -> usize {
    MP3_FRAME_SAMPLES
}

/// External transcoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Output sample rate in Hz.
    ///
    /// Default: 24000 Hz.
    #[serde(default = "default_transcoder_sample_rate")]
    pub sample_rate: u32,

    /// Output bitrate in kbps.
    ///
    /// Default: 64 kbps.
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_transcoder_sample_rate(),
            bitrate_kbps: default_bitrate_kbps(),
        }
    }
}

impl TranscoderConfig {
    /// Argument list for one run: drop video, mono, fixed rate and bitrate,
    /// strip metadata, MP3 codec, overwrite output.
    pub fn args(&self, input_entry: &str, output_entry: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            input_entry.to_string(),
            "-vn".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-b:a".to_string(),
            format!("{}k", self.bitrate_kbps),
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-codec:a".to_string(),
            "libmp3lame".to_string(),
            "-y".to_string(),
            output_entry.to_string(),
        ]
    }

    pub fn size_ratio_percent(&self) -> u64 {
        size_ratio_percent(self.bitrate_kbps)
    }

    pub fn validate(&self) -> Result<()> {
        check_bitrate_and_rate("transcoder ", self.bitrate_kbps, self.sample_rate)
    }
}

fn default_transcoder_sample_rate() -> u32 {
    24_000
}
