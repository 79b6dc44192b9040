//! LAME-backed frame encoder.

use super::FrameEncoder;
use crate::config::{EncodeQuality, EncoderConfig};
use crate::error::{CompressError, Result};
use mp3lame_encoder::{max_required_buffer_size, Bitrate, Builder, Encoder, FlushNoGap, MonoPcm, Quality};
use tracing::debug;

/// Mono constant-bitrate MP3 encoder.
pub struct LameFrameEncoder {
    encoder: Encoder,
}

impl LameFrameEncoder {
    /// Build an encoder for mono input at `config.target_sample_rate`.
    pub fn new(config: &EncoderConfig) -> Result<Self> {
        let mut builder = Builder::new()
            .ok_or_else(|| CompressError::Encode("Failed to create LAME encoder".to_string()))?;

        builder
            .set_num_channels(1)
            .map_err(|e| CompressError::Encode(format!("Invalid channel count: {:?}", e)))?;

        builder
            .set_sample_rate(config.target_sample_rate)
            .map_err(|e| CompressError::Encode(format!("Invalid sample rate: {:?}", e)))?;

        builder
            .set_brate(bitrate(config.bitrate_kbps)?)
            .map_err(|e| CompressError::Encode(format!("Failed to set bitrate: {:?}", e)))?;

        builder
            .set_quality(quality(config.quality))
            .map_err(|e| CompressError::Encode(format!("Failed to set quality: {:?}", e)))?;

        let encoder = builder
            .build()
            .map_err(|e| CompressError::Encode(format!("Failed to build encoder: {:?}", e)))?;

        debug!(
            sample_rate = config.target_sample_rate,
            bitrate_kbps = config.bitrate_kbps,
            quality = ?config.quality,
            "LAME encoder ready"
        );

        Ok(Self { encoder })
    }
}

impl FrameEncoder for LameFrameEncoder {
    fn encode_block(&mut self, pcm: &[i16]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(max_required_buffer_size(pcm.len()));
        self.encoder
            .encode_to_vec(MonoPcm(pcm), &mut output)
            .map_err(|e| CompressError::Encode(format!("MP3 encoding failed: {:?}", e)))?;
        Ok(output)
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(max_required_buffer_size(0));
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut output)
            .map_err(|e| CompressError::Encode(format!("MP3 flush failed: {:?}", e)))?;
        Ok(output)
    }
}

fn bitrate(kbps: u32) -> Result<Bitrate> {
    let bitrate = match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(CompressError::InvalidConfig(format!(
                "Unsupported MP3 bitrate: {} kbps",
                other
            )))
        }
    };
    Ok(bitrate)
}

fn quality(quality: EncodeQuality) -> Quality {
    match quality {
        EncodeQuality::Fast => Quality::Worst,
        EncodeQuality::Balanced => Quality::Good,
        EncodeQuality::Best => Quality::Best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(samples: usize) -> Vec<i16> {
        (0..samples)
            .map(|i| {
                let t = i as f32 / 22_050.0;
                (f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 12_000.0) as i16
            })
            .collect()
    }

    #[test]
    fn test_encodes_mono_blocks() {
        let mut encoder = LameFrameEncoder::new(&EncoderConfig::default()).unwrap();
        let pcm = tone(22_050);

        let mut stream = Vec::new();
        for block in pcm.chunks(1152) {
            stream.extend(encoder.encode_block(block).unwrap());
        }
        stream.extend(encoder.flush().unwrap());

        assert!(!stream.is_empty());
        // Frame sync: eleven set bits at the start of the stream
        assert_eq!(stream[0], 0xFF);
        assert_eq!(stream[1] & 0xE0, 0xE0);
    }

    #[test]
    fn test_speech_profile_builds() {
        assert!(LameFrameEncoder::new(&EncoderConfig::speech()).is_ok());
    }

    #[test]
    fn test_unsupported_bitrate() {
        let config = EncoderConfig::default().with_bitrate(33);
        assert!(matches!(
            LameFrameEncoder::new(&config),
            Err(CompressError::InvalidConfig(_))
        ));
    }
}
