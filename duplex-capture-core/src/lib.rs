//! # duplex-capture-core
//!
//! Platform-agnostic core of a two-stream call recorder.
//!
//! Captures an outgoing (microphone) stream and an incoming (system audio /
//! loopback) stream in memory, aligns them at stop time and exports a stereo
//! file: incoming on the left channel, outgoing on the right. Platform
//! backends implement the `AudioBackend` trait and plug into the generic
//! `RecordingSession`.
//!
//! ## Architecture
//!
//! ```text
//! duplex-capture-core (this crate)
//! ├── traits/       ← AudioBackend, AudioInputPort, FrameSink
//! ├── models/       ← RecorderError, SessionState, RecordingConfig, OutputFormat, etc.
//! ├── processing/   ← mono downmix, chunk buffers, stereo alignment
//! ├── session/      ← RecordingSession (coordinator) and export worker
//! ├── status        ← status channel to the UI
//! └── storage/      ← WAV/FLAC/OGG writers, ffmpeg MP3 encoder, metadata
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod status;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioChannel, AudioTrack, DeviceDescriptor, OutputFormat, StreamRole};
pub use models::config::{default_output_path, EncoderSettings, RecordingConfig};
pub use models::error::RecorderError;
pub use models::recording_result::{ExportReport, RecordingMetadata};
pub use models::state::SessionState;
pub use processing::downmix::{downmix_converted, downmix_to_mono};
pub use processing::frame_buffer::MonoFrameBuffer;
pub use processing::stereo_mux::StereoRecording;
pub use session::coordinator::RecordingSession;
pub use status::{status_channel, StatusEvent, StatusReceiver, StatusSender};
pub use storage::export::export_recording;
pub use storage::external_encoder::encoder_available;
pub use traits::audio_backend::{AudioBackend, AudioInputPort, StreamRequest};
pub use traits::frame_sink::FrameSink;
