use std::time::Duration;

use thiserror::Error;

/// Errors raised by the recorder.
///
/// Errors from `start()`/`stop()` are returned to the caller. Errors from
/// the background export are only ever reported through the status channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("already recording")]
    AlreadyRecording,

    #[error("not currently recording")]
    NotRecording,

    #[error("could not open audio device: {0}")]
    DeviceOpenFailed(String),

    #[error("no audio captured")]
    NoAudioCaptured,

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("{0} was not found on PATH; install it or choose WAV/FLAC/OGG")]
    ToolNotFound(String),

    #[error("external encoder timed out after {}s", .0.as_secs())]
    EncodeTimeout(Duration),

    #[error("external encoder failed: {0}")]
    EncodeFailed(String),

    #[error("write failed: {0}")]
    IoWriteFailed(String),

    #[error("invalid configuration: {0}")]
    ConfigurationFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RecorderError {
    /// Wrap an I/O error from the export path.
    pub(crate) fn io(context: &str, err: impl std::fmt::Display) -> Self {
        Self::IoWriteFailed(format!("{}: {}", context, err))
    }
}
