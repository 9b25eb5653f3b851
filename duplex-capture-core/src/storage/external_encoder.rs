//! MP3 export through an external `ffmpeg`.
//!
//! The recording is written as a 16-bit WAV into a scoped temporary
//! directory, handed to the encoder, and the directory is removed when the
//! `TempDir` guard drops, whichever way `encode_mp3` returns.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::models::config::EncoderSettings;
use crate::models::error::RecorderError;
use crate::processing::stereo_mux::StereoRecording;
use crate::storage::wav_writer::{self, INTERMEDIATE_BIT_DEPTH};

/// Lines of encoder stderr kept in an `EncodeFailed` diagnostic.
const DIAGNOSTIC_LINES: usize = 12;

/// A located encoder executable plus the settings for one run.
#[derive(Debug, Clone)]
pub struct ExternalEncoder {
    program: PathBuf,
    quality: u8,
    timeout: Duration,
    scratch_root: Option<PathBuf>,
}

impl ExternalEncoder {
    /// Find the encoder on `PATH` (or at an explicit path).
    pub fn locate(settings: &EncoderSettings) -> Result<Self, RecorderError> {
        let program =
            which::which(&settings.program).map_err(|_| RecorderError::ToolNotFound(settings.program.clone()))?;
        log::debug!("Using external encoder at {}", program.display());
        Ok(Self {
            program,
            quality: settings.mp3_quality,
            timeout: settings.timeout,
            scratch_root: settings.scratch_dir.clone(),
        })
    }

    /// `-y -i <input> -codec:a libmp3lame -q:a <quality> <output>`
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-codec:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            self.quality.to_string().into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Encode `recording` to MP3 at `output`.
    pub fn encode_mp3(
        &self,
        recording: &StereoRecording,
        sample_rate: u32,
        output: &Path,
    ) -> Result<(), RecorderError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("duplex-capture-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| RecorderError::io("failed to create temporary directory", e))?;

        let temp_wav = scratch.path().join("tmp_audio.wav");
        wav_writer::write_wav(&temp_wav, recording, sample_rate, INTERMEDIATE_BIT_DEPTH)?;

        let log_path = scratch.path().join("encoder.log");
        let log_file = File::create(&log_path).map_err(|e| RecorderError::io("failed to create encoder log", e))?;

        let mut child = Command::new(&self.program)
            .args(self.arguments(&temp_wav, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(log_file)
            .spawn()
            .map_err(|e| RecorderError::EncodeFailed(format!("could not run {}: {}", self.program.display(), e)))?;

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                log::warn!("Encoder exceeded {:?}, killing it", self.timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(RecorderError::EncodeTimeout(self.timeout));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RecorderError::EncodeFailed(format!("failed waiting for encoder: {}", e)));
            }
        };

        if !status.success() {
            let stderr = fs::read(&log_path).unwrap_or_default();
            return Err(RecorderError::EncodeFailed(format!(
                "{} ({}). {}",
                self.program.display(),
                status,
                tail_lines(&String::from_utf8_lossy(&stderr), DIAGNOSTIC_LINES)
            )));
        }

        Ok(())
    }
}

/// Whether the configured encoder can be found, for warning the user early.
pub fn encoder_available(settings: &EncoderSettings) -> bool {
    which::which(&settings.program).is_ok()
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
