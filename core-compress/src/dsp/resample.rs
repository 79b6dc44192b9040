//! Linear-interpolation sample-rate conversion.
//!
//! No anti-aliasing filter is applied before downsampling. For speech at
//! 22.05 kHz the aliasing is inaudible next to the MP3 quantisation noise.

use std::borrow::Cow;

/// Converts `input` from `from_rate` to `to_rate`.
///
/// With `ratio = from / to`, the output has `round(len / ratio)` samples and
/// output sample `i` interpolates between `input[floor(i * ratio)]` and the
/// following sample (clamped to the last one). Equal rates borrow the input.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Cow<'_, [f32]> {
    if from_rate == to_rate {
        return Cow::Borrowed(input);
    }
    if input.is_empty() || from_rate == 0 || to_rate == 0 {
        return Cow::Owned(Vec::new());
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (input.len() as f64 / ratio).round() as usize;
    let last = input.len() - 1;

    let output = (0..out_len)
        .map(|i| {
            let position = i as f64 * ratio;
            let floor = position.floor();
            let frac = (position - floor) as f32;
            let lo = (floor as usize).min(last);
            let hi = (lo + 1).min(last);
            input[lo] * (1.0 - frac) + input[hi] * frac
        })
        .collect();

    Cow::Owned(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_rates_borrow() {
        let input = vec![0.1, 0.2, 0.3];
        let output = resample(&input, 22_050, 22_050);
        assert!(matches!(output, Cow::Borrowed(_)));
        assert_eq!(&*output, &input[..]);
    }

    #[test]
    fn test_output_length() {
        let input = vec![0.0; 44_100];
        assert_eq!(resample(&input, 44_100, 22_050).len(), 22_050);

        let input = vec![0.0; 48_000];
        assert_eq!(resample(&input, 48_000, 22_050).len(), 22_050);

        // Upsampling: 3 samples at 2:3 -> round(4.5) = 5
        let input = vec![0.0; 3];
        assert_eq!(resample(&input, 16_000, 24_000).len(), 5);
    }

    #[test]
    fn test_constant_signal_stays_constant() {
        let input = vec![0.25; 1_000];
        for &(from, to) in &[(44_100, 22_050), (48_000, 22_050), (8_000, 22_050)] {
            let output = resample(&input, from, to);
            assert!(output.iter().all(|&s| (s - 0.25).abs() < 1e-6));
        }
    }

    #[test]
    fn test_interpolates_between_neighbours() {
        // Upsample by 2: odd outputs sit halfway between inputs
        let input = vec![0.0, 1.0, 0.0];
        let output = resample(&input, 11_025, 22_050);
        assert_eq!(output.len(), 6);
        assert!((output[0] - 0.0).abs() < 1e-6);
        assert!((output[1] - 0.5).abs() < 1e-6);
        assert!((output[2] - 1.0).abs() < 1e-6);
        assert!((output[3] - 0.5).abs() < 1e-6);
        // Past the end the last sample is held
        assert!((output[5] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 44_100, 22_050).is_empty());
    }
}
