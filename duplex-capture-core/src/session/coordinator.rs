use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::models::audio_models::StreamRole;
use crate::models::config::RecordingConfig;
use crate::models::error::RecorderError;
use crate::models::state::SessionState;
use crate::session::capture::{CaptureBuffers, SharedCapture, StreamTap};
use crate::session::worker::{self, SaveJob, SaveTracker};
use crate::status::StatusSender;
use crate::traits::audio_backend::{AudioBackend, AudioInputPort, StreamRequest};
use crate::traits::frame_sink::FrameSink;

/// The session that is currently recording.
struct ActiveSession {
    id: Uuid,
    config: RecordingConfig,
    started_at: DateTime<Local>,
}

/// Duplex recording coordinator.
///
/// Generic over the platform audio backend via the `AudioBackend` trait.
/// Owns both capture streams and the shared buffers, and hands each stopped
/// session to a background export worker:
/// ```text
/// [Outgoing port] → StreamTap ─┐
///                               ├→ Arc<Mutex<CaptureBuffers>> ─stop()→ [export worker] → file
/// [Incoming port] → StreamTap ─┘
/// ```
pub struct RecordingSession<B: AudioBackend> {
    backend: B,
    shared: SharedCapture,
    status: StatusSender,
    ports: Vec<B::Port>,
    active: Option<ActiveSession>,
    saves: Arc<SaveTracker>,
}

impl<B: AudioBackend> RecordingSession<B> {
    pub fn new(backend: B, status: StatusSender) -> Self {
        Self {
            backend,
            shared: CaptureBuffers::new_shared(),
            status,
            ports: Vec::new(),
            active: None,
            saves: Arc::new(SaveTracker::default()),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            return SessionState::Recording;
        }
        if self.saves.in_flight() > 0 {
            return SessionState::Saving;
        }
        match self.saves.last_failure() {
            Some(e) => SessionState::Error(e),
            None => SessionState::Idle,
        }
    }

    /// Samples captured so far for `role` in the current session.
    pub fn captured_samples(&self, role: StreamRole) -> usize {
        self.shared.lock().buffer(role).total_samples()
    }

    /// Number of export workers spawned over this coordinator's lifetime.
    pub fn saves_spawned(&self) -> usize {
        self.saves.spawned()
    }

    /// Block until every export worker spawned so far has finished.
    pub fn join_saves(&self) {
        self.saves.join_all();
    }

    /// Open and start both capture streams. Transitions: idle → recording.
    ///
    /// Either both streams run or neither does: if any step fails, every
    /// stream opened so far is stopped and closed before the error is returned.
    pub fn start(&mut self, config: RecordingConfig) -> Result<(), RecorderError> {
        if self.active.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }
        config.validate().map_err(RecorderError::ConfigurationFailed)?;

        self.status.push("Starting streams...");
        self.shared.lock().reset();

        if let Err(e) = self.open_ports(&config) {
            log::warn!("Stream startup failed: {}", e);
            self.teardown();
            return Err(e);
        }

        self.shared.lock().set_recording(true);
        self.saves.clear_failure();

        let session = ActiveSession {
            id: Uuid::new_v4(),
            config,
            started_at: Local::now(),
        };
        log::info!(
            "Session {} recording {} Hz to {}",
            session.id,
            session.config.sample_rate,
            session.config.output_path.display()
        );
        self.status
            .push(format!("Recording to {}...", session.config.output_format));
        self.active = Some(session);
        Ok(())
    }

    fn open_ports(&mut self, config: &RecordingConfig) -> Result<(), RecorderError> {
        for (role, device_id) in [
            (StreamRole::Outgoing, &config.outgoing_device_id),
            (StreamRole::Incoming, &config.incoming_device_id),
        ] {
            let port = self
                .open_stream(role, device_id, config)
                .map_err(|e| open_failure(role, e))?;
            self.ports.push(port);
        }
        self.ports.iter_mut().try_for_each(|port| {
            port.start().map_err(|e| match e {
                RecorderError::DeviceOpenFailed(_) => e,
                other => RecorderError::DeviceOpenFailed(other.to_string()),
            })
        })
    }

    fn open_stream(
        &self,
        role: StreamRole,
        device_id: &str,
        config: &RecordingConfig,
    ) -> Result<B::Port, RecorderError> {
        let device = self.backend.describe(device_id)?;
        let channels = device.capture_channels(role);
        log::debug!(
            "{} stream on {} using {} channel(s)",
            role.label(),
            device.display(),
            channels
        );

        let request = StreamRequest {
            device_id: device_id.to_string(),
            role,
            sample_rate: config.sample_rate,
            block_size: config.block_size,
            channels,
        };
        let sink: Arc<dyn FrameSink> =
            Arc::new(StreamTap::new(role, Arc::clone(&self.shared), self.status.clone()));
        self.backend.open(&request, sink)
    }

    /// Best-effort stop and close of every open port.
    fn teardown(&mut self) {
        for mut port in self.ports.drain(..) {
            if let Err(e) = port.stop() {
                log::warn!("Failed to stop stream: {}", e);
            }
            if let Err(e) = port.close() {
                log::warn!("Failed to close stream: {}", e);
            }
        }
    }

    /// Stop both streams and hand the captured audio to a background export.
    /// Transitions: recording → idle (+ saving).
    ///
    /// Returns the intended output path as soon as the worker is spawned.
    /// The export outcome arrives later on the status channel.
    pub fn stop(&mut self) -> Result<PathBuf, RecorderError> {
        let Some(session) = self.active.take() else {
            return Err(RecorderError::NotRecording);
        };

        self.shared.lock().set_recording(false);
        self.teardown();
        let snapshot = self.shared.lock().take_snapshot();

        log::info!(
            "Session {} stopped: {} outgoing / {} incoming samples",
            session.id,
            snapshot.sample_count(StreamRole::Outgoing),
            snapshot.sample_count(StreamRole::Incoming)
        );

        if snapshot.is_empty() {
            self.saves.record_failure(RecorderError::NoAudioCaptured);
            return Err(RecorderError::NoAudioCaptured);
        }

        let output_path = session.config.output_path.clone();
        let job = SaveJob {
            session_id: session.id.to_string(),
            started_at: session.started_at.to_rfc3339(),
            config: session.config,
            snapshot,
        };
        worker::spawn_save(job, self.status.clone(), Arc::clone(&self.saves))?;
        Ok(output_path)
    }
}

/// Startup failures surface as `DeviceOpenFailed` naming the stream.
fn open_failure(role: StreamRole, error: RecorderError) -> RecorderError {
    match error {
        RecorderError::DeviceOpenFailed(msg) => RecorderError::DeviceOpenFailed(format!("{}: {}", role.label(), msg)),
        other => RecorderError::DeviceOpenFailed(format!("{}: {}", role.label(), other)),
    }
}

impl<B: AudioBackend> Drop for RecordingSession<B> {
    fn drop(&mut self) {
        if self.active.take().is_some() {
            self.shared.lock().set_recording(false);
            self.teardown();
        }
    }
}
