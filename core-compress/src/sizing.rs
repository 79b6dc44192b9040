//! # Output Sizing and Naming
//!
//! Helpers the upload UI uses around compression: a size estimate shown
//! before compressing, human-readable byte counts, and the output file name.

/// Media type of every compression result.
pub const MP3_MEDIA_TYPE: &str = "audio/mpeg";

const MP3_EXTENSION: &str = "mp3";
const FALLBACK_BASE_NAME: &str = "audio";

/// Percentage of the original size an MP3 at `bitrate_kbps` is expected to
/// occupy: 10 % at 32 kbps, 15 % at 64 kbps, growing linearly beyond that
/// and capped at 100 %.
pub fn size_ratio_percent(bitrate_kbps: u32) -> u64 {
    let percent = 5 + u64::from(bitrate_kbps) * 5 / 32;
    percent.min(100)
}

/// Estimates the compressed size of a recording of `original_bytes` bytes.
///
/// The estimate is a fixed fraction of the input size, rounded to the
/// nearest byte. It ignores the actual duration and is meant for display.
pub fn estimate_compressed_size(original_bytes: u64, bitrate_kbps: u32) -> u64 {
    let percent = size_ratio_percent(bitrate_kbps);
    let scaled = u128::from(original_bytes) * u128::from(percent);
    ((scaled + 50) / 100) as u64
}

/// Formats a byte count as `"<n> B"`, `"<x.y> KB"` or `"<x.y> MB"`.
pub fn format_file_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}

/// Derives the output name: the input name without its trailing extension,
/// followed by `.mp3`.
///
/// A leading dot does not start an extension (`.answer` becomes
/// `.answer.mp3`), and an empty base falls back to `audio.mp3`.
pub fn output_file_name(file_name: &str) -> String {
    let component_start = file_name
        .rfind(['/', '\\'])
        .map(|idx| idx + 1)
        .unwrap_or(0);

    let base = match file_name.rfind('.') {
        Some(dot) if dot > component_start => &file_name[..dot],
        _ => file_name,
    };

    if base.is_empty() || base.ends_with(['/', '\\']) {
        format!("{}{}.{}", base, FALLBACK_BASE_NAME, MP3_EXTENSION)
    } else {
        format!("{}.{}", base, MP3_EXTENSION)
    }
}
