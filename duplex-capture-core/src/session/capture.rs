use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::StreamRole;
use crate::processing::downmix::downmix_to_mono;
use crate::processing::frame_buffer::MonoFrameBuffer;
use crate::status::StatusSender;
use crate::traits::frame_sink::FrameSink;

/// Recording flag and both stream buffers, guarded by one lock.
///
/// The coordinator and both capture callbacks share a single
/// `Arc<Mutex<CaptureBuffers>>`. Callbacks append only while `recording`
/// is set, and the flag is always checked under the same lock, so nothing
/// is appended once `stop()` has cleared it.
#[derive(Debug, Default)]
pub struct CaptureBuffers {
    recording: bool,
    outgoing: MonoFrameBuffer,
    incoming: MonoFrameBuffer,
}

pub type SharedCapture = Arc<Mutex<CaptureBuffers>>;

/// Chunks drained from both buffers at stop time.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CaptureSnapshot {
    pub outgoing: Vec<Vec<f32>>,
    pub incoming: Vec<Vec<f32>>,
}

impl CaptureSnapshot {
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }

    pub fn sample_count(&self, role: StreamRole) -> usize {
        let chunks = match role {
            StreamRole::Outgoing => &self.outgoing,
            StreamRole::Incoming => &self.incoming,
        };
        chunks.iter().map(Vec::len).sum()
    }
}

impl CaptureBuffers {
    pub fn new_shared() -> SharedCapture {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Append `chunk` to the buffer for `role` if recording. Returns whether it was kept.
    pub fn append(&mut self, role: StreamRole, chunk: Vec<f32>) -> bool {
        if !self.recording {
            return false;
        }
        self.buffer_mut(role).push(chunk);
        true
    }

    pub fn buffer(&self, role: StreamRole) -> &MonoFrameBuffer {
        match role {
            StreamRole::Outgoing => &self.outgoing,
            StreamRole::Incoming => &self.incoming,
        }
    }

    fn buffer_mut(&mut self, role: StreamRole) -> &mut MonoFrameBuffer {
        match role {
            StreamRole::Outgoing => &mut self.outgoing,
            StreamRole::Incoming => &mut self.incoming,
        }
    }

    /// Empty both buffers and clear the flag, ready for a new session.
    pub fn reset(&mut self) {
        self.recording = false;
        self.outgoing.clear();
        self.incoming.clear();
    }

    /// Drain both buffers.
    pub fn take_snapshot(&mut self) -> CaptureSnapshot {
        CaptureSnapshot {
            outgoing: self.outgoing.take(),
            incoming: self.incoming.take(),
        }
    }
}

/// Realtime handler for one capture stream.
///
/// Downmixes outside the lock, then holds the lock only for the flag check
/// and the append.
pub struct StreamTap {
    role: StreamRole,
    shared: SharedCapture,
    status: StatusSender,
}

impl StreamTap {
    pub fn new(role: StreamRole, shared: SharedCapture, status: StatusSender) -> Self {
        Self { role, shared, status }
    }
}

impl FrameSink for StreamTap {
    fn on_frame(&self, samples: &[f32], channels: u16) {
        self.on_mono_frame(downmix_to_mono(samples, channels as usize));
    }

    fn on_mono_frame(&self, mono: Vec<f32>) {
        self.shared.lock().append(self.role, mono);
    }

    fn on_stream_error(&self, message: &str) {
        self.status.push_unlogged(format!("{}: {}", self.role.label(), message));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::status::status_channel;

    #[test]
    fn append_only_while_recording() {
        let mut buffers = CaptureBuffers::default();
        assert!(!buffers.append(StreamRole::Outgoing, vec![0.1]));

        buffers.set_recording(true);
        assert!(buffers.append(StreamRole::Outgoing, vec![0.1, 0.2]));
        assert_eq!(buffers.buffer(StreamRole::Outgoing).total_samples(), 2);
        assert!(buffers.buffer(StreamRole::Incoming).is_empty());

        buffers.set_recording(false);
        assert!(!buffers.append(StreamRole::Incoming, vec![0.3]));
        assert!(buffers.buffer(StreamRole::Incoming).is_empty());
    }

    #[test]
    fn snapshot_drains_both_buffers() {
        let mut buffers = CaptureBuffers::default();
        buffers.set_recording(true);
        buffers.append(StreamRole::Outgoing, vec![0.1; 3]);
        buffers.append(StreamRole::Incoming, vec![0.2; 5]);

        let snapshot = buffers.take_snapshot();
        assert_eq!(snapshot.sample_count(StreamRole::Outgoing), 3);
        assert_eq!(snapshot.sample_count(StreamRole::Incoming), 5);
        assert!(buffers.take_snapshot().is_empty());
    }

    #[test]
    fn tap_downmixes_before_append() {
        let shared = CaptureBuffers::new_shared();
        shared.lock().set_recording(true);
        let (tx, _rx) = status_channel();
        let tap = StreamTap::new(StreamRole::Incoming, Arc::clone(&shared), tx);

        tap.on_frame(&[0.6, 0.6, 0.1, 0.2], 2);

        let snapshot = shared.lock().take_snapshot();
        assert_eq!(snapshot.incoming.len(), 1);
        assert_eq!(snapshot.incoming[0][0], 1.0);
        assert!((snapshot.incoming[0][1] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn tap_reports_stream_errors_with_role_prefix() {
        let (tx, rx) = status_channel();
        let tap = StreamTap::new(StreamRole::Outgoing, CaptureBuffers::new_shared(), tx);
        tap.on_stream_error("input overflow");
        assert_eq!(rx.drain()[0].text, "Mic: input overflow");
    }

    #[test]
    fn tap_accepts_premixed_frames() {
        let shared = CaptureBuffers::new_shared();
        let (tx, _rx) = status_channel();
        let tap = StreamTap::new(StreamRole::Outgoing, Arc::clone(&shared), tx);

        tap.on_mono_frame(vec![0.25; 4]);
        assert!(shared.lock().buffer(StreamRole::Outgoing).is_empty());

        shared.lock().set_recording(true);
        tap.on_mono_frame(vec![0.25; 4]);
        assert_eq!(shared.lock().buffer(StreamRole::Outgoing).total_samples(), 4);
    }

    struct CountingLogger;

    static ERROR_CALLBACK_LOGS: AtomicUsize = AtomicUsize::new(0);

    impl log::Log for CountingLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if record.args().to_string().contains("device unplugged mid-call") {
                ERROR_CALLBACK_LOGS.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: CountingLogger = CountingLogger;

    #[test]
    fn stream_errors_are_queued_without_logging() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);

        let (tx, rx) = status_channel();
        let tap = StreamTap::new(StreamRole::Incoming, CaptureBuffers::new_shared(), tx.clone());
        tap.on_stream_error("device unplugged mid-call");
        assert_eq!(rx.drain()[0].text, "Incoming: device unplugged mid-call");
        assert_eq!(ERROR_CALLBACK_LOGS.load(Ordering::SeqCst), 0);

        // The logger is live: the regular push path does reach it.
        tx.push("device unplugged mid-call (coordinator)");
        assert_eq!(ERROR_CALLBACK_LOGS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        const CHUNKS: usize = 500;
        let shared = CaptureBuffers::new_shared();
        shared.lock().set_recording(true);
        let (tx, _rx) = status_channel();

        let producers: Vec<_> = [(StreamRole::Outgoing, 64usize), (StreamRole::Incoming, 97)]
            .into_iter()
            .map(|(role, len)| {
                let tap = StreamTap::new(role, Arc::clone(&shared), tx.clone());
                thread::spawn(move || {
                    for i in 0..CHUNKS {
                        let chunk: Vec<f32> = (0..len).map(|j| (i * len + j) as f32).collect();
                        tap.on_frame(&chunk, 1);
                        if i % 7 == 0 {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        // Contend on the same lock from the coordinator side as well.
        for _ in 0..100 {
            let _ = shared.lock().buffer(StreamRole::Outgoing).total_samples();
        }
        for p in producers {
            p.join().unwrap();
        }

        let snapshot = shared.lock().take_snapshot();
        assert_eq!(snapshot.sample_count(StreamRole::Outgoing), CHUNKS * 64);
        assert_eq!(snapshot.sample_count(StreamRole::Incoming), CHUNKS * 97);

        // Arrival order is preserved within each stream.
        let outgoing: Vec<f32> = snapshot.outgoing.concat();
        assert!(outgoing.windows(2).all(|w| w[0] < w[1]));
    }
}
