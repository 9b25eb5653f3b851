use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::models::error::RecorderError;
use crate::processing::stereo_mux::quantize;
use crate::processing::stereo_mux::StereoRecording;

/// Bit depth of exported WAV files.
pub const WAV_BIT_DEPTH: u16 = 24;

/// Bit depth of the intermediate handed to the external encoder.
pub const INTERMEDIATE_BIT_DEPTH: u16 = 16;

/// Write `recording` as a two-channel integer PCM WAV file.
pub fn write_wav(
    path: &Path,
    recording: &StereoRecording,
    sample_rate: u32,
    bits_per_sample: u16,
) -> Result<(), RecorderError> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample,
        sample_format: SampleFormat::Int,
    };

    let mut writer =
        WavWriter::create(path, spec).map_err(|e| RecorderError::io("failed to create WAV file", e))?;

    for (&left, &right) in recording.incoming().iter().zip(recording.outgoing()) {
        writer
            .write_sample(quantize(left, bits_per_sample))
            .map_err(|e| RecorderError::io("failed to write WAV data", e))?;
        writer
            .write_sample(quantize(right, bits_per_sample))
            .map_err(|e| RecorderError::io("failed to write WAV data", e))?;
    }

    writer
        .finalize()
        .map_err(|e| RecorderError::io("failed to finalize WAV file", e))
}
