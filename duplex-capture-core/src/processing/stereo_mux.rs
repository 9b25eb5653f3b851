/// Two-column recording: column 0 = incoming (left), column 1 = outgoing (right).
///
/// Both columns always have the same length. The shorter source is padded
/// with trailing silence; sample-level clock drift between the two devices
/// is not corrected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoRecording {
    incoming: Vec<f32>,
    outgoing: Vec<f32>,
}

impl StereoRecording {
    /// Concatenate each stream's chunks and pad the shorter one with zeros.
    pub fn align(incoming_chunks: &[Vec<f32>], outgoing_chunks: &[Vec<f32>]) -> Self {
        let mut incoming = concat_chunks(incoming_chunks);
        let mut outgoing = concat_chunks(outgoing_chunks);

        let frame_count = incoming.len().max(outgoing.len());
        incoming.resize(frame_count, 0.0);
        outgoing.resize(frame_count, 0.0);

        Self { incoming, outgoing }
    }

    pub fn frame_count(&self) -> usize {
        self.incoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty()
    }

    /// Left channel.
    pub fn incoming(&self) -> &[f32] {
        &self.incoming
    }

    /// Right channel.
    pub fn outgoing(&self) -> &[f32] {
        &self.outgoing
    }

    /// Channels in output order, for planar encoders.
    pub fn planar(&self) -> [&[f32]; 2] {
        [&self.incoming, &self.outgoing]
    }

    /// Interleaved stereo `[L0, R0, L1, R1, ...]`.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut stereo = Vec::with_capacity(self.frame_count() * 2);
        for (l, r) in self.incoming.iter().zip(&self.outgoing) {
            stereo.push(*l);
            stereo.push(*r);
        }
        stereo
    }

    /// Interleaved signed PCM at `bits_per_sample` (8..=32), clamped.
    pub fn interleaved_pcm(&self, bits_per_sample: u16) -> Vec<i32> {
        self.interleaved()
            .into_iter()
            .map(|s| quantize(s, bits_per_sample))
            .collect()
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / sample_rate as f64
    }
}

/// Join chunks in arrival order.
pub fn concat_chunks(chunks: &[Vec<f32>]) -> Vec<f32> {
    let total = chunks.iter().map(Vec::len).sum();
    let mut joined = Vec::with_capacity(total);
    for chunk in chunks {
        joined.extend_from_slice(chunk);
    }
    joined
}

/// Convert an f32 sample in `[-1.0, 1.0]` to a signed integer of `bits` width.
///
/// Out-of-range input is clamped, so full scale maps to `±(2^(bits-1) - 1)`.
pub fn quantize(sample: f32, bits: u16) -> i32 {
    let max = ((1i64 << (bits - 1)) - 1) as f64;
    let clamped = sample.clamp(-1.0, 1.0) as f64;
    (clamped * max).round() as i32
}

/// Largest absolute error introduced by `quantize` at `bits` width, in f32 units.
pub fn quantization_step(bits: u16) -> f32 {
    1.0 / ((1i64 << (bits - 1)) - 1) as f32
}
