//! Channel downmixing.

use crate::traits::DecodedAudio;
use tracing::warn;

/// Collapses all channels into one by per-sample averaging.
///
/// A single channel is moved out unchanged and no channels yield an empty
/// signal. More than two channels are averaged as well.
pub fn downmix(decoded: DecodedAudio) -> Vec<f32> {
    let mut channels = decoded.channels;

    match channels.len() {
        0 => Vec::new(),
        1 => channels.pop().unwrap_or_default(),
        2 => {
            let right = channels.pop().unwrap_or_default();
            let mut left = channels.pop().unwrap_or_default();
            for (l, r) in left.iter_mut().zip(right.iter()) {
                *l = (*l + *r) / 2.0;
            }
            left.truncate(right.len());
            left
        }
        count => {
            warn!(
                channels = count,
                "Averaging more than two channels into mono"
            );
            let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
            let scale = 1.0 / count as f32;
            (0..frames)
                .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() * scale)
                .collect()
        }
    }
}
