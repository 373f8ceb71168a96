use serde::{Deserialize, Serialize};

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// stop → record ↔ pause
///          ↓        ↓
///         stop ← cancel
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Stop,
    Record,
    Pause,
}

impl RecordState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stop)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Record)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Pause)
    }
}
