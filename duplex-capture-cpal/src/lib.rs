//! # duplex-capture-cpal
//!
//! cpal backend for duplex-capture.
//!
//! Provides:
//! - `CpalBackend`: implements `AudioBackend`, opening one `CpalInputPort` per stream
//! - `DeviceCatalog`: device enumeration with channel capabilities
//!
//! ## Platform notes
//! - Windows (WASAPI): an output device chosen as the incoming stream is
//!   captured through loopback.
//! - Linux (ALSA/PulseAudio/PipeWire): pick the sink's monitor source as the
//!   incoming device.
//! - macOS (Core Audio): needs a virtual loopback device (e.g. BlackHole).
//!
//! ## Usage
//! ```ignore
//! use duplex_capture_core::{status_channel, RecordingConfig, RecordingSession};
//! use duplex_capture_cpal::CpalBackend;
//!
//! let (tx, rx) = status_channel();
//! let mut session = RecordingSession::new(CpalBackend::new(), tx);
//! session.start(RecordingConfig { /* devices, output path */ ..Default::default() })?;
//! ```

pub mod cpal_backend;
pub mod device_catalog;

pub use cpal_backend::{CpalBackend, CpalInputPort};
pub use device_catalog::DeviceCatalog;
