use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::{AudioTrack, OutputFormat, StreamRole};

/// Outcome of a successful background export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub file_path: PathBuf,
    pub format: OutputFormat,
    pub frame_count: usize,
    pub duration_secs: f64,
    pub checksum: String,
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub started_at: String,
    pub file_path: String,
    pub format: OutputFormat,
    pub sample_rate: u32,
    pub frame_count: usize,
    pub duration_secs: f64,
    pub checksum: String,
    pub tracks: Vec<AudioTrack>,
}

impl RecordingMetadata {
    /// Metadata for an incoming-left / outgoing-right recording.
    pub fn new_duplex(
        session_id: &str,
        started_at: &str,
        report: &ExportReport,
        sample_rate: u32,
        incoming_device_id: &str,
        outgoing_device_id: &str,
    ) -> Self {
        Self {
            id: session_id.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: started_at.to_string(),
            file_path: report.file_path.to_string_lossy().into_owned(),
            format: report.format,
            sample_rate,
            frame_count: report.frame_count,
            duration_secs: report.duration_secs,
            checksum: report.checksum.clone(),
            tracks: vec![
                AudioTrack {
                    role: StreamRole::Incoming,
                    channel: StreamRole::Incoming.channel(),
                    device_id: incoming_device_id.to_string(),
                },
                AudioTrack {
                    role: StreamRole::Outgoing,
                    channel: StreamRole::Outgoing.channel(),
                    device_id: outgoing_device_id.to_string(),
                },
            ],
        }
    }
}
