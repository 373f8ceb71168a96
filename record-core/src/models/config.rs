use serde::{Deserialize, Serialize};

use super::error::RecordError;

/// Highest channel count a session will accept.
pub const MAX_CHANNELS: u16 = 8;

/// User-supplied recording intent, shipped by the host bridge.
///
/// Immutable once a session starts; owned exclusively by the
/// `RecordingSession` for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordConfig {
    /// Requested encoder name (one of the `AudioEncoder` set).
    pub encoder_name: String,

    /// Target capture device, `None` for the system default.
    pub device_id: Option<String>,

    /// Target bit rate for compressed codecs, in bits per second.
    pub bit_rate: u32,

    /// Requested sample rate in Hz. The negotiated rate may differ.
    pub sample_rate: u32,

    /// Requested channel count (1–8).
    pub num_channels: u16,

    /// Best-effort processing flags, delegated to the OS audio stack
    /// where the backend supports them.
    pub auto_gain: bool,
    pub echo_cancel: bool,
    pub noise_suppress: bool,
}

impl RecordConfig {
    /// Reject configurations before any resource is allocated.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.encoder_name.is_empty() {
            return Err(RecordError::InvalidConfig("encoder name is empty".into()));
        }
        if self.sample_rate == 0 {
            return Err(RecordError::InvalidConfig("sample rate must be positive".into()));
        }
        if self.bit_rate == 0 {
            return Err(RecordError::InvalidConfig("bit rate must be positive".into()));
        }
        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            return Err(RecordError::InvalidConfig(format!(
                "unsupported channel count: {} (expected 1-{})",
                self.num_channels, MAX_CHANNELS
            )));
        }
        Ok(())
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            encoder_name: "wav".into(),
            device_id: None,
            bit_rate: 128_000,
            sample_rate: 44_100,
            num_channels: 2,
            auto_gain: false,
            echo_cancel: false,
            noise_suppress: false,
        }
    }
}
