//! # Audio Decoder Module
//!
//! Decodes a whole recording held in memory into planar `f32` samples using
//! the Symphonia library.
//!
//! ## Supported Formats
//!
//! | Format | Codec | Feature Flag |
//! |--------|-------|--------------|
//! | MP3 | MPEG-1/2 Audio Layer III | `decoder-mp3` |
//! | FLAC | Free Lossless Audio Codec | `decoder-flac` |
//! | Ogg Vorbis | Vorbis | `decoder-vorbis` |
//! | M4A/MP4 | AAC | `decoder-aac` |
//! | M4A | Apple Lossless | `decoder-alac` |
//! | WAV | PCM | `decoder-wav` |
//! | AIFF | PCM | `decoder-aiff` |
//!
//! Opus (the usual codec of browser WebM/Ogg recordings) has no Symphonia
//! decoder; such inputs fail with [`crate::CompressError::UnsupportedFormat`]
//! and need the external transcoder backend.
//!
//! ## Architecture
//!
//! ```text
//! SourceAudio → MediaSourceStream → FormatReader → Decoder → DecodedAudio
//! ```
//!
//! The reader and codec live in a [`DecodeSession`], which releases both
//! when it goes out of scope, whether decoding finished or failed.

mod format_detector;
mod sample_converter;
mod symphonia;

pub use self::symphonia::{decode, DecodeSession};
pub use format_detector::FormatDetector;
pub use sample_converter::SampleConverter;
