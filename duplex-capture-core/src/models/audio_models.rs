use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RecorderError;

/// Which side of the conversation a capture stream records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamRole {
    /// Microphone / local speaker. Written to the right channel.
    Outgoing,
    /// System / remote audio, usually a loopback or monitor source. Written to the left channel.
    Incoming,
}

impl StreamRole {
    /// Prefix used for status messages raised by this stream.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Outgoing => "Mic",
            Self::Incoming => "Incoming",
        }
    }

    /// Output channel this role occupies in the exported file.
    pub fn channel(&self) -> AudioChannel {
        match self {
            Self::Incoming => AudioChannel::Left,
            Self::Outgoing => AudioChannel::Right,
        }
    }
}

/// Audio channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioChannel {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

/// A track in an exported recording and the channel it was written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub role: StreamRole,
    pub channel: AudioChannel,
    pub device_id: String,
}

/// An audio device as reported by the platform backend.
///
/// The core only reads channel counts from it; enumeration and display
/// belong to the backend and the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    pub host_api: String,
    pub max_input_channels: u16,
    pub max_output_channels: u16,
}

impl DeviceDescriptor {
    pub fn is_input(&self) -> bool {
        self.max_input_channels > 0
    }

    pub fn is_output(&self) -> bool {
        self.max_output_channels > 0
    }

    /// Channel count to request when capturing from this device, clamped to 1..=2.
    ///
    /// An incoming device with no inputs is captured through loopback, so its
    /// output channel count is used instead.
    pub fn capture_channels(&self, role: StreamRole) -> u16 {
        let reported = match role {
            StreamRole::Incoming if !self.is_input() => self.max_output_channels,
            _ => self.max_input_channels,
        };
        reported.clamp(1, 2)
    }

    /// `[id] name (host; in:N, out:M)`
    pub fn display(&self) -> String {
        let mut caps = Vec::new();
        if self.is_input() {
            caps.push(format!("in:{}", self.max_input_channels));
        }
        if self.is_output() {
            caps.push(format!("out:{}", self.max_output_channels));
        }
        format!("[{}] {} ({}; {})", self.id, self.name, self.host_api, caps.join(", "))
    }
}

/// Container/codec of the exported file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    /// Uncompressed PCM, 24-bit.
    Wav,
    /// Lossless compressed.
    #[default]
    Flac,
    /// Ogg Vorbis.
    Ogg,
    /// MPEG layer III, encoded by an external `ffmpeg`.
    Mp3,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Wav, Self::Flac, Self::Ogg, Self::Mp3];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Wav => "WAV",
            Self::Flac => "FLAC",
            Self::Ogg => "OGG",
            Self::Mp3 => "MP3",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
        }
    }

    /// Whether exporting this format shells out to an external encoder.
    pub fn needs_external_encoder(&self) -> bool {
        matches!(self, Self::Mp3)
    }

    /// Rewrite `path` so its extension matches this format.
    ///
    /// Paths without an extension, or with an extension of another known
    /// format, get this format's extension. Any other extension is kept and
    /// this format's extension is appended.
    pub fn apply_extension(&self, path: &Path) -> PathBuf {
        let current = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match current {
            Some(ext) if ext == self.extension() => path.to_path_buf(),
            Some(ext) if !Self::ALL.iter().any(|f| f.extension() == ext) => {
                let mut name = path.as_os_str().to_owned();
                name.push(".");
                name.push(self.extension());
                PathBuf::from(name)
            }
            _ => path.with_extension(self.extension()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RecorderError::UnsupportedFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(inputs: u16, outputs: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            id: "3".into(),
            name: "Speakers".into(),
            host_api: "WASAPI".into(),
            max_input_channels: inputs,
            max_output_channels: outputs,
        }
    }

    #[test]
    fn capture_channels_clamped_to_stereo() {
        assert_eq!(device(8, 0).capture_channels(StreamRole::Outgoing), 2);
        assert_eq!(device(1, 0).capture_channels(StreamRole::Outgoing), 1);
        assert_eq!(device(0, 0).capture_channels(StreamRole::Outgoing), 1);
    }

    #[test]
    fn loopback_device_uses_output_channels() {
        assert_eq!(device(0, 6).capture_channels(StreamRole::Incoming), 2);
        // A monitor input keeps its own input count.
        assert_eq!(device(1, 6).capture_channels(StreamRole::Incoming), 1);
    }

    #[test]
    fn display_lists_capabilities() {
        assert_eq!(device(2, 6).display(), "[3] Speakers (WASAPI; in:2, out:6)");
        assert_eq!(device(0, 2).display(), "[3] Speakers (WASAPI; out:2)");
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("flac".parse::<OutputFormat>().unwrap(), OutputFormat::Flac);
        assert_eq!("Mp3".parse::<OutputFormat>().unwrap(), OutputFormat::Mp3);
        assert_eq!(".wav".parse::<OutputFormat>().unwrap(), OutputFormat::Wav);
        assert_eq!(
            "aiff".parse::<OutputFormat>(),
            Err(RecorderError::UnsupportedFormat("aiff".into()))
        );
    }

    #[test]
    fn apply_extension_swaps_known_extensions() {
        let f = OutputFormat::Mp3;
        assert_eq!(f.apply_extension(Path::new("/tmp/call.flac")), PathBuf::from("/tmp/call.mp3"));
        assert_eq!(f.apply_extension(Path::new("/tmp/call.MP3")), PathBuf::from("/tmp/call.MP3"));
        assert_eq!(f.apply_extension(Path::new("/tmp/call")), PathBuf::from("/tmp/call.mp3"));
        assert_eq!(
            f.apply_extension(Path::new("/tmp/call.2024")),
            PathBuf::from("/tmp/call.2024.mp3")
        );
    }

    #[test]
    fn roles_map_to_channels() {
        assert_eq!(StreamRole::Incoming.channel(), AudioChannel::Left);
        assert_eq!(StreamRole::Outgoing.channel(), AudioChannel::Right);
    }
}
