/// Receiver for realtime audio delivered by an `AudioInputPort`.
///
/// `on_frame` runs on the platform's audio thread: implementations must not
/// block on I/O or allocate beyond copying the frame.
pub trait FrameSink: Send + Sync {
    /// `samples` is interleaved f32 with `channels` samples per frame.
    fn on_frame(&self, samples: &[f32], channels: u16);

    /// Already-downmixed mono samples, for backends that convert and
    /// downmix in one pass.
    fn on_mono_frame(&self, mono: Vec<f32>) {
        self.on_frame(&mono, 1);
    }

    /// The platform reported a stream problem (overflow, device lost, ...).
    fn on_stream_error(&self, message: &str);
}
