//! Float to 16-bit PCM conversion.

use tracing::warn;

/// Converts one sample to `i16`.
///
/// The sample is clamped to `[-1.0, 1.0]` first; negative values scale by
/// 32768 and non-negative values by 32767, so both rails are reachable.
/// NaN maps to silence.
pub fn quantize_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0).round() as i16
    } else {
        (s * 32767.0).round() as i16
    }
}

pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(quantize_sample).collect()
}

/// Counts samples outside `[-1.0, 1.0]` and warns when there are any.
pub fn count_clipped(samples: &[f32]) -> usize {
    let clipped = samples.iter().filter(|s| s.abs() > 1.0).count();

    if clipped > 0 {
        warn!(
            clipped,
            percent = format_args!("{:.2}", clipped as f64 / samples.len() as f64 * 100.0),
            "Samples outside [-1, 1] will be clipped"
        );
    }

    clipped
}
