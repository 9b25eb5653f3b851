use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::audio_models::OutputFormat;

/// Lowest and highest sample rates accepted by `RecordingConfig::validate`.
pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Settings for the external MP3 encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Program name looked up on `PATH`, or an explicit path.
    pub program: String,

    /// LAME VBR quality passed as `-q:a` (0 = best, 9 = smallest).
    pub mp3_quality: u8,

    /// Upper bound on one encoder run.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Parent of the scratch directory for intermediates (default: system temp dir).
    pub scratch_dir: Option<PathBuf>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".into(),
            mp3_quality: 2,
            timeout: Duration::from_secs(300),
            scratch_dir: None,
        }
    }
}

/// Configuration for one recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Device captured into the right channel (microphone).
    pub outgoing_device_id: String,

    /// Device captured into the left channel (system audio / loopback).
    pub incoming_device_id: String,

    /// Sample rate requested from both devices, in Hz (default: 48000).
    pub sample_rate: u32,

    /// Frames per callback requested from the backend (default: 1024).
    pub block_size: u32,

    /// Final output file.
    pub output_path: PathBuf,

    /// Output format (default: FLAC).
    pub output_format: OutputFormat,

    pub encoder: EncoderSettings,

    /// Write `<output>.metadata.json` next to the recording.
    pub write_metadata: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            outgoing_device_id: String::new(),
            incoming_device_id: String::new(),
            sample_rate: 48_000,
            block_size: 1024,
            output_path: PathBuf::new(),
            output_format: OutputFormat::default(),
            encoder: EncoderSettings::default(),
            write_metadata: false,
        }
    }
}

impl RecordingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.outgoing_device_id.trim().is_empty() {
            return Err("outgoing device is not set".into());
        }
        if self.incoming_device_id.trim().is_empty() {
            return Err("incoming device is not set".into());
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(format!("unsupported sample rate: {}", self.sample_rate));
        }
        if self.block_size == 0 {
            return Err("block size must be positive".into());
        }
        if self.output_path.file_name().is_none() {
            return Err("output file is not set".into());
        }
        let parent = match self.output_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(format!("output folder does not exist: {}", parent.display()));
        }
        if self.encoder.timeout.is_zero() {
            return Err("encoder timeout must be positive".into());
        }
        Ok(())
    }
}

/// `audio_recording_YYYYMMDD_HHMMSS.<ext>` inside `dir`.
pub fn default_output_path(dir: &Path, format: OutputFormat) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("audio_recording_{}.{}", stamp, format.extension()))
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(dir: &Path) -> RecordingConfig {
        RecordingConfig {
            outgoing_device_id: "mic".into(),
            incoming_device_id: "speakers".into(),
            output_path: dir.join("call.flac"),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_match_recorder_defaults() {
        let config = RecordingConfig::default();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.output_format, OutputFormat::Flac);
        assert_eq!(config.encoder.mp3_quality, 2);
        assert_eq!(config.encoder.timeout, Duration::from_secs(300));
    }

    #[test]
    fn validate_accepts_complete_config() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(valid_config(dir.path()).validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = valid_config(dir.path());
        config.incoming_device_id = " ".into();
        assert!(config.validate().unwrap_err().contains("incoming"));

        let mut config = valid_config(dir.path());
        config.sample_rate = 1000;
        assert!(config.validate().unwrap_err().contains("sample rate"));

        let mut config = valid_config(dir.path());
        config.block_size = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config(dir.path());
        config.output_path = dir.path().join("missing").join("call.flac");
        assert!(config.validate().unwrap_err().contains("output folder"));
    }

    #[test]
    fn deserializes_partial_json() {
        let json = r#"{
            "outgoing_device_id": "1",
            "incoming_device_id": "4",
            "output_format": "MP3",
            "encoder": { "timeout": 60 }
        }"#;
        let config: RecordingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.output_format, OutputFormat::Mp3);
        assert_eq!(config.encoder.timeout, Duration::from_secs(60));
        assert_eq!(config.encoder.program, "ffmpeg");
        assert_eq!(config.sample_rate, 48_000);
    }

    #[test]
    fn default_output_path_has_format_extension() {
        let path = default_output_path(Path::new("/recordings"), OutputFormat::Ogg);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("audio_recording_"));
        assert!(name.ends_with(".ogg"));
        assert_eq!(path.parent(), Some(Path::new("/recordings")));
    }
}
