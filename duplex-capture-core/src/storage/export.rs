use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::audio_models::OutputFormat;
use crate::models::config::EncoderSettings;
use crate::models::error::RecorderError;
use crate::models::recording_result::ExportReport;
use crate::processing::stereo_mux::StereoRecording;
use crate::storage::external_encoder::ExternalEncoder;
use crate::storage::{flac_writer, vorbis_writer, wav_writer};

/// Write `recording` to `path` in `format` and checksum the result.
///
/// If the export fails and `path` did not exist beforehand, any partial
/// output is removed.
pub fn export_recording(
    recording: &StereoRecording,
    path: &Path,
    sample_rate: u32,
    format: OutputFormat,
    encoder: &EncoderSettings,
) -> Result<ExportReport, RecorderError> {
    if recording.is_empty() {
        return Err(RecorderError::NoAudioCaptured);
    }

    let existed = path.exists();
    if let Err(e) = write_format(recording, path, sample_rate, format, encoder) {
        if !existed && path.exists() {
            if let Err(remove_err) = fs::remove_file(path) {
                log::warn!("Could not remove partial output {}: {}", path.display(), remove_err);
            }
        }
        return Err(e);
    }

    let checksum = sha256_file(path)?;
    log::info!(
        "Exported {} frames ({:.1}s) as {} to {}",
        recording.frame_count(),
        recording.duration_secs(sample_rate),
        format,
        path.display()
    );

    Ok(ExportReport {
        file_path: path.to_path_buf(),
        format,
        frame_count: recording.frame_count(),
        duration_secs: recording.duration_secs(sample_rate),
        checksum,
    })
}

fn write_format(
    recording: &StereoRecording,
    path: &Path,
    sample_rate: u32,
    format: OutputFormat,
    encoder: &EncoderSettings,
) -> Result<(), RecorderError> {
    match format {
        OutputFormat::Wav => wav_writer::write_wav(path, recording, sample_rate, wav_writer::WAV_BIT_DEPTH),
        OutputFormat::Flac => flac_writer::write_flac(path, recording, sample_rate),
        OutputFormat::Ogg => vorbis_writer::write_vorbis(path, recording, sample_rate),
        OutputFormat::Mp3 => ExternalEncoder::locate(encoder)?.encode_mp3(recording, sample_rate, path),
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let data = fs::read(path).map_err(|e| RecorderError::io("failed to read file for checksum", e))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
