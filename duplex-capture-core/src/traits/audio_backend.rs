use std::sync::Arc;

use crate::models::audio_models::{DeviceDescriptor, StreamRole};
use crate::models::error::RecorderError;
use crate::traits::frame_sink::FrameSink;

/// Parameters for opening one capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub device_id: String,
    pub role: StreamRole,
    pub sample_rate: u32,
    /// Frames per callback.
    pub block_size: u32,
    /// Interleaved channel count, already clamped to 1..=2.
    pub channels: u16,
}

/// A platform audio subsystem able to open capture streams.
///
/// Implemented by:
/// - `CpalBackend` (duplex-capture-cpal): WASAPI loopback on Windows, monitor inputs elsewhere
pub trait AudioBackend: Send + Sync {
    type Port: AudioInputPort;

    /// Look up a device by id.
    fn describe(&self, device_id: &str) -> Result<DeviceDescriptor, RecorderError>;

    /// Open (but do not start) a stream delivering frames to `sink`.
    ///
    /// For `StreamRole::Incoming` the backend decides whether the device is
    /// captured directly or through loopback on its output.
    fn open(&self, request: &StreamRequest, sink: Arc<dyn FrameSink>) -> Result<Self::Port, RecorderError>;
}

/// One open capture stream.
pub trait AudioInputPort: Send {
    /// Begin delivering frames. Errors map to `DeviceOpenFailed`.
    fn start(&mut self) -> Result<(), RecorderError>;

    /// Stop delivering frames.
    fn stop(&mut self) -> Result<(), RecorderError>;

    /// Release the device. Further calls are no-ops.
    fn close(&mut self) -> Result<(), RecorderError>;
}
