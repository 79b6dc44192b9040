//! # Symphonia Decoder Implementation
//!
//! Whole-recording decoder built on the Symphonia library.

use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{CompressError, Result};
use crate::traits::{DecodedAudio, SourceAudio};
use core_runtime::logging::strip_path;
use std::io::Cursor;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use tracing::{debug, error, info, instrument, warn};

/// Consecutive recoverable packet errors tolerated before giving up.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Decode `source` into planar `f32` samples.
///
/// The decoding context is released before this returns, on success and on
/// every error path.
#[instrument(skip(source), fields(file = %strip_path(&source.file_name), bytes = source.data.len()))]
pub fn decode(source: &SourceAudio) -> Result<DecodedAudio> {
    DecodeSession::open(source)?.decode_all()
}

/// An open decoding context for one recording.
///
/// Owns the format reader (demuxer) and the codec decoder. Both are released
/// when the session is dropped.
pub struct DecodeSession {
    /// Format reader - owns the media source stream
    format_reader: Box<dyn FormatReader>,

    /// Codec decoder
    decoder: Box<dyn Decoder>,

    /// Selected track ID
    track_id: u32,

    /// Sample rate from the codec parameters, if declared
    sample_rate: Option<u32>,

    /// Name used in log messages
    label: String,
}

impl DecodeSession {
    /// Probe the container and prepare a codec for the first decodable track.
    ///
    /// # Errors
    ///
    /// - [`CompressError::UnsupportedFormat`] if the container or codec is not
    ///   handled by this build
    /// - [`CompressError::Decode`] if the data cannot be parsed
    pub fn open(source: &SourceAudio) -> Result<Self> {
        let label = strip_path(&source.file_name).to_string();

        if source.is_empty() {
            return Err(CompressError::Decode("Recording is empty".to_string()));
        }

        // Step 1: Wrap the in-memory bytes as a media source
        let cursor = Cursor::new(source.data.clone());
        let media_source = Box::new(cursor) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());
        let hint = FormatDetector::hint_for(source);

        // Step 2: Probe format
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!(file = %label, "Format probe failed: {}", e);
                match e {
                    SymphoniaError::Unsupported(what) => {
                        CompressError::UnsupportedFormat(format!("Unrecognised container: {}", what))
                    }
                    other => CompressError::Decode(format!("Failed to probe format: {}", other)),
                }
            })?;

        let format_reader = probed.format;

        // Step 3: Find first audio track with a codec
        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                error!(file = %label, "No audio tracks found");
                CompressError::UnsupportedFormat("No audio tracks".to_string())
            })?;

        let track_id = track.id;

        // Step 4: Detect and validate codec
        let codec = FormatDetector::detect_codec(track.codec_params.codec);
        FormatDetector::validate_codec_support(&codec)?;

        let sample_rate = track.codec_params.sample_rate;
        debug!(
            track_id,
            ?codec,
            ?sample_rate,
            channels = ?track.codec_params.channels.map(|c| c.count()),
            "Selected track"
        );

        // Step 5: Create codec decoder
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                error!(file = %label, "Failed to create decoder: {}", e);
                match e {
                    SymphoniaError::Unsupported(what) => CompressError::UnsupportedFormat(
                        format!("No decoder for {:?}: {}", codec, what),
                    ),
                    other => CompressError::Decode(format!(
                        "Failed to create codec decoder: {}",
                        other
                    )),
                }
            })?;

        Ok(Self {
            format_reader,
            decoder,
            track_id,
            sample_rate,
            label,
        })
    }

    /// Decode every packet of the selected track.
    ///
    /// Packets that fail with recoverable I/O or decode errors are skipped,
    /// up to [`MAX_CONSECUTIVE_ERRORS`] in a row.
    pub fn decode_all(mut self) -> Result<DecodedAudio> {
        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut sample_rate = self.sample_rate;
        let mut consecutive_errors = 0;
        let mut packets = 0usize;

        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    // Normal end of stream
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    // Chained streams: only the first one is the recording
                    warn!(file = %self.label, "Track list changed, stopping at first stream");
                    break;
                }
                Err(SymphoniaError::IoError(e)) => {
                    consecutive_errors += 1;
                    warn!(
                        "I/O error reading packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(CompressError::Decode(format!(
                            "Stream I/O failure after {} attempts: {}",
                            MAX_CONSECUTIVE_ERRORS, e
                        )));
                    }
                    continue;
                }
                Err(e) => {
                    error!(file = %self.label, "Fatal format reader error: {}", e);
                    return Err(CompressError::Decode(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            // Consume any new metadata that was read with this packet
            while !self.format_reader.metadata().is_latest() {
                self.format_reader.metadata().pop();
            }

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    consecutive_errors = 0;
                    packets += 1;

                    if sample_rate.is_none() {
                        sample_rate = Some(decoded.spec().rate);
                    }

                    SampleConverter::append_planar(&decoded, &mut channels)?;
                }
                Err(SymphoniaError::IoError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping corrupted packet (I/O error, attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(CompressError::Decode(format!(
                            "Stream corruption after {} failed packets",
                            MAX_CONSECUTIVE_ERRORS
                        )));
                    }
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping packet with decode error (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(CompressError::Decode(format!(
                            "Decoder failure after {} failed packets: {}",
                            MAX_CONSECUTIVE_ERRORS, err
                        )));
                    }
                }
                Err(e) => {
                    error!(file = %self.label, "Fatal decode error: {}", e);
                    return Err(CompressError::Decode(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }

        let sample_rate = sample_rate.filter(|rate| *rate > 0).ok_or_else(|| {
            CompressError::Decode("Stream does not declare a sample rate".to_string())
        })?;

        let decoded = DecodedAudio::new(channels, sample_rate);
        info!(
            file = %self.label,
            packets,
            channels = decoded.channel_count(),
            frames = decoded.frames(),
            sample_rate,
            "Decoded recording"
        );

        Ok(decoded)
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        debug!(file = %self.label, "Released decoding context");
    }
}
