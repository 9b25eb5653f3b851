/// Append-only list of mono sample chunks captured by one stream.
///
/// Unlike a ring buffer nothing is ever dropped: every chunk stays resident
/// until the session is stopped and the buffer is taken. Wrap it (together
/// with the recording flag) in a `parking_lot::Mutex` for cross-thread access.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MonoFrameBuffer {
    chunks: Vec<Vec<f32>>,
    total_samples: usize,
}

impl MonoFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk. Empty chunks are ignored.
    pub fn push(&mut self, chunk: Vec<f32>) {
        if chunk.is_empty() {
            return;
        }
        self.total_samples += chunk.len();
        self.chunks.push(chunk);
    }

    /// Remove and return all chunks in arrival order, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<Vec<f32>> {
        self.total_samples = 0;
        std::mem::take(&mut self.chunks)
    }

    /// Number of samples across all chunks.
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_samples = 0;
    }
}
