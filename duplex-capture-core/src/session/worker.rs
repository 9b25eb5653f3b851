use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::RecordingConfig;
use crate::models::error::RecorderError;
use crate::models::recording_result::{ExportReport, RecordingMetadata};
use crate::processing::stereo_mux::StereoRecording;
use crate::session::capture::CaptureSnapshot;
use crate::status::StatusSender;
use crate::storage::{export, metadata};

/// Everything an export worker needs; owned exclusively by the worker.
pub(crate) struct SaveJob {
    pub session_id: String,
    pub started_at: String,
    pub config: RecordingConfig,
    pub snapshot: CaptureSnapshot,
}

/// Book-keeping for export workers shared with the coordinator.
#[derive(Default)]
pub(crate) struct SaveTracker {
    in_flight: AtomicUsize,
    spawned: AtomicUsize,
    last_failure: Mutex<Option<RecorderError>>,
    handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl SaveTracker {
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn last_failure(&self) -> Option<RecorderError> {
        self.last_failure.lock().clone()
    }

    pub fn record_failure(&self, error: RecorderError) {
        *self.last_failure.lock() = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.last_failure.lock() = None;
    }

    /// Block until every worker spawned so far has finished.
    pub fn join_all(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Export worker terminated abnormally");
            }
        }
    }
}

/// Spawn the background export for `job`.
///
/// The outcome is reported only through `status`; failures and panics are
/// caught here and never reach the caller of `stop()`.
pub(crate) fn spawn_save(
    job: SaveJob,
    status: StatusSender,
    tracker: Arc<SaveTracker>,
) -> Result<(), RecorderError> {
    tracker.in_flight.fetch_add(1, Ordering::SeqCst);
    let worker_tracker = Arc::clone(&tracker);

    let spawned = thread::Builder::new()
        .name("recording-export".into())
        .spawn(move || {
            let format = job.config.output_format;
            let path = job.config.output_path.clone();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_save_job(job, &status)))
                .unwrap_or_else(|payload| Err(RecorderError::Internal(panic_message(payload))));

            match outcome {
                Ok(report) => {
                    log::debug!("Export checksum {}", report.checksum);
                    status.push(format!("Saved {}: {}", format, path.display()));
                }
                Err(e) => {
                    log::error!("Export to {} failed: {}", path.display(), e);
                    worker_tracker.record_failure(e.clone());
                    status.push(format!("Error while saving recording: {}", e));
                }
            }
            worker_tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
        });

    match spawned {
        Ok(handle) => {
            tracker.spawned.fetch_add(1, Ordering::SeqCst);
            let mut handles = tracker.handles.lock();
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
            Ok(())
        }
        Err(e) => {
            tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(RecorderError::Internal(format!("failed to spawn export worker: {}", e)))
        }
    }
}

/// Align, export and (optionally) describe one recording.
pub(crate) fn run_save_job(job: SaveJob, status: &StatusSender) -> Result<ExportReport, RecorderError> {
    let SaveJob {
        session_id,
        started_at,
        config,
        snapshot,
    } = job;

    let recording = StereoRecording::align(&snapshot.incoming, &snapshot.outgoing);
    drop(snapshot);
    log::debug!(
        "Session {}: aligned {} frames for export",
        session_id,
        recording.frame_count()
    );

    let report = export::export_recording(
        &recording,
        &config.output_path,
        config.sample_rate,
        config.output_format,
        &config.encoder,
    )?;

    if config.write_metadata {
        let sidecar = RecordingMetadata::new_duplex(
            &session_id,
            &started_at,
            &report,
            config.sample_rate,
            &config.incoming_device_id,
            &config.outgoing_device_id,
        );
        if let Err(e) = metadata::write_metadata(&sidecar, &report.file_path) {
            log::warn!("Session {}: {}", session_id, e);
            status.push(format!("Could not write metadata: {}", e));
        }
    }

    Ok(report)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("export panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("export panicked: {}", s)
    } else {
        "export panicked".into()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::audio_models::OutputFormat;
    use crate::status::status_channel;

    fn job(dir: &std::path::Path, format: OutputFormat) -> SaveJob {
        SaveJob {
            session_id: "test-session".into(),
            started_at: "2026-01-01T00:00:00+00:00".into(),
            config: RecordingConfig {
                outgoing_device_id: "mic".into(),
                incoming_device_id: "speakers".into(),
                output_path: dir.join(format!("call.{}", format.extension())),
                output_format: format,
                write_metadata: true,
                ..Default::default()
            },
            snapshot: CaptureSnapshot {
                outgoing: vec![vec![0.1; 100]],
                incoming: vec![vec![0.2; 60], vec![0.3; 60]],
            },
        }
    }

    #[test]
    fn run_job_exports_and_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = status_channel();

        let report = run_save_job(job(dir.path(), OutputFormat::Wav), &tx).unwrap();

        assert_eq!(report.frame_count, 120);
        let sidecar = metadata::read_metadata(&report.file_path).unwrap();
        assert_eq!(sidecar.id, "test-session");
        assert_eq!(sidecar.frame_count, 120);
        assert_eq!(sidecar.checksum, report.checksum);
    }

    #[test]
    fn worker_failure_becomes_status_event() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = status_channel();
        let tracker = Arc::new(SaveTracker::default());
        let mut failing = job(dir.path(), OutputFormat::Mp3);
        failing.config.encoder.program = "duplex-capture-no-such-encoder".into();

        spawn_save(failing, tx, Arc::clone(&tracker)).unwrap();
        tracker.join_all();

        let events = rx.drain();
        assert_eq!(events.len(), 1);
        assert!(events[0].text.starts_with("Error while saving recording:"));
        assert!(matches!(tracker.last_failure(), Some(RecorderError::ToolNotFound(_))));
        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(tracker.spawned(), 1);
    }

    #[test]
    fn worker_success_reports_saved_path() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = status_channel();
        let tracker = Arc::new(SaveTracker::default());

        spawn_save(job(dir.path(), OutputFormat::Flac), tx, Arc::clone(&tracker)).unwrap();

        let seen = rx.wait_for(Duration::from_secs(10), |t| t.starts_with("Saved"));
        let last = seen.last().unwrap();
        assert_eq!(
            last.text,
            format!("Saved FLAC: {}", dir.path().join("call.flac").display())
        );
        tracker.join_all();
        assert_eq!(tracker.last_failure(), None);
    }

    #[test]
    fn finished_workers_are_released_on_next_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = status_channel();
        let tracker = Arc::new(SaveTracker::default());

        for round in 0..3 {
            let mut next = job(dir.path(), OutputFormat::Wav);
            next.config.output_path = dir.path().join(format!("call-{}.wav", round));
            spawn_save(next, tx.clone(), Arc::clone(&tracker)).unwrap();
            assert_eq!(tracker.handles.lock().len(), 1);

            while tracker.handles.lock().iter().any(|h| !h.is_finished()) {
                thread::sleep(Duration::from_millis(5));
            }
        }

        assert_eq!(tracker.spawned(), 3);
        tracker.join_all();
        assert!(tracker.handles.lock().is_empty());
    }

    #[test]
    fn panic_payloads_are_described() {
        assert_eq!(panic_message(Box::new("boom")), "export panicked: boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "export panicked: bang");
        assert_eq!(panic_message(Box::new(3u8)), "export panicked");
    }
}
