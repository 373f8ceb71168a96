use serde::{Deserialize, Serialize};

/// An input device as presented to the host for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDevice {
    pub id: String,
    pub label: String,
}

/// A snapshot of the level meter, in decibels relative to full scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amplitude {
    pub current: f32,
    pub max: f32,
}
