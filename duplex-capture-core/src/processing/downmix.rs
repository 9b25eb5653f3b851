/// Downmix interleaved audio to mono.
///
/// - one channel (or a degenerate zero-channel layout): copied unchanged
/// - otherwise: channels are summed per frame and clipped to `[-1.0, 1.0]`
///
/// Summing keeps the perceived loudness of a source that is quiet on each
/// channel; clipping is the only overflow guard. A trailing partial frame is
/// dropped.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    downmix_converted(samples, channels, |s| s)
}

/// [`downmix_to_mono`] over non-f32 samples, converting each one with
/// `to_f32` in the same pass. Allocates only the mono output.
pub fn downmix_converted<T: Copy>(samples: &[T], channels: usize, to_f32: impl Fn(T) -> f32) -> Vec<f32> {
    if channels <= 1 {
        return samples.iter().map(|&s| to_f32(s)).collect();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| to_f32(s)).sum::<f32>().clamp(-1.0, 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn mono_passthrough() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn stereo_sums_and_clips() {
        assert_eq!(downmix_to_mono(&[0.6, 0.6], 2), vec![1.0]);
        assert_eq!(downmix_to_mono(&[-0.7, -0.9], 2), vec![-1.0]);
    }

    #[test]
    fn stereo_sum_within_range() {
        let mono = downmix_to_mono(&[0.2, 0.3, -0.1, 0.4], 2);
        assert_eq!(mono.len(), 2);
        assert_relative_eq!(mono[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(mono[1], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn multichannel_frames() {
        let mono = downmix_to_mono(&[0.1, 0.1, 0.1, 0.2, 0.2, 0.2], 3);
        assert_eq!(mono.len(), 2);
        assert_relative_eq!(mono[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(mono[1], 0.6, epsilon = 1e-6);
    }

    #[test]
    fn partial_frame_dropped() {
        assert_eq!(downmix_to_mono(&[0.1, 0.2, 0.3], 2).len(), 1);
    }

    #[test]
    fn converted_samples_downmix_in_one_pass() {
        let to_f32 = |s: i16| s as f32 / 32768.0;
        let mono = downmix_converted(&[8192i16, 8192, -16384, 0], 2, to_f32);
        assert_eq!(mono.len(), 2);
        assert_relative_eq!(mono[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(mono[1], -0.5, epsilon = 1e-6);

        assert_eq!(downmix_converted(&[16384i16], 1, to_f32), vec![0.5]);
        assert_eq!(downmix_converted(&[i16::MAX, i16::MAX], 2, to_f32), vec![1.0]);
    }

    #[test]
    fn empty_input() {
        assert!(downmix_to_mono(&[], 2).is_empty());
        assert!(downmix_to_mono(&[], 1).is_empty());
    }
}
