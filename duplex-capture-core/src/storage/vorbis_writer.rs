use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::{NonZeroU32, NonZeroU8};
use std::path::Path;

use vorbis_rs::VorbisEncoderBuilder;

use crate::models::error::RecorderError;
use crate::processing::stereo_mux::StereoRecording;

/// Frames handed to the encoder per call.
const BLOCK_FRAMES: usize = 4096;

/// Encode `recording` as Ogg Vorbis at the encoder's default quality.
pub fn write_vorbis(path: &Path, recording: &StereoRecording, sample_rate: u32) -> Result<(), RecorderError> {
    let sampling_frequency = NonZeroU32::new(sample_rate)
        .ok_or_else(|| RecorderError::Internal("sample rate must be positive".into()))?;
    let channels = NonZeroU8::new(2).ok_or_else(|| RecorderError::Internal("invalid channel count".into()))?;

    let file = File::create(path).map_err(|e| RecorderError::io("failed to create OGG file", e))?;

    let mut encoder = VorbisEncoderBuilder::new(sampling_frequency, channels, BufWriter::new(file))
        .map_err(|e| RecorderError::IoWriteFailed(format!("Vorbis encoder setup failed: {}", e)))?
        .build()
        .map_err(|e| RecorderError::IoWriteFailed(format!("Vorbis encoder setup failed: {}", e)))?;

    let [left, right] = recording.planar();
    for (l, r) in left.chunks(BLOCK_FRAMES).zip(right.chunks(BLOCK_FRAMES)) {
        encoder
            .encode_audio_block([l, r])
            .map_err(|e| RecorderError::IoWriteFailed(format!("Vorbis encoding failed: {}", e)))?;
    }

    let mut sink = encoder
        .finish()
        .map_err(|e| RecorderError::IoWriteFailed(format!("Vorbis encoding failed: {}", e)))?;
    sink.flush().map_err(|e| RecorderError::io("failed to write OGG file", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_ogg_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.ogg");
        let tone: Vec<f32> = (0..20_000).map(|i| (i as f32 * 0.02).sin() * 0.5).collect();
        let rec = StereoRecording::align(&[tone.clone()], &[tone]);

        write_vorbis(&path, &rec, 44_100).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"OggS");
    }
}
