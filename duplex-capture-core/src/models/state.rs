use super::error::RecorderError;

/// Recording session state as seen by the caller.
///
/// State transitions:
/// ```text
/// idle → recording → idle (+ background saving)
///                  ↘ error (nothing captured / export failed)
/// ```
///
/// `Saving` is reported while at least one export worker is still running
/// and no new session is recording.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Recording,
    Saving,
    Error(RecorderError),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_saving(&self) -> bool {
        matches!(self, Self::Saving)
    }

    /// Whether a new session may be started from this state.
    pub fn can_start(&self) -> bool {
        !self.is_recording()
    }
}
