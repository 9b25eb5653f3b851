use std::fs;
use std::path::Path;

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::error::Verify;

use crate::models::error::RecorderError;
use crate::processing::stereo_mux::StereoRecording;

/// Bit depth of exported FLAC files.
pub const FLAC_BIT_DEPTH: u16 = 16;

/// Encode `recording` as a two-channel FLAC file with the encoder's default settings.
pub fn write_flac(path: &Path, recording: &StereoRecording, sample_rate: u32) -> Result<(), RecorderError> {
    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| RecorderError::Internal(format!("invalid FLAC encoder config: {:?}", e)))?;

    let samples = recording.interleaved_pcm(FLAC_BIT_DEPTH);
    let source = flacenc::source::MemSource::from_samples(
        &samples,
        2,
        FLAC_BIT_DEPTH as usize,
        sample_rate as usize,
    );

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| RecorderError::IoWriteFailed(format!("FLAC encoding failed: {:?}", e)))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|_| RecorderError::IoWriteFailed("failed to serialize FLAC stream".into()))?;

    fs::write(path, sink.as_slice()).map_err(|e| RecorderError::io("failed to write FLAC file", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_flac_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.flac");
        let tone: Vec<f32> = (0..9600).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let rec = StereoRecording::align(&[tone], &[vec![0.1; 4800]]);

        write_flac(&path, &rec, 48_000).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"fLaC");
        // Compressed output is smaller than raw 16-bit stereo.
        assert!(bytes.len() < rec.frame_count() * 4);
    }
}
