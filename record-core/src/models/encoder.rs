use serde::{Deserialize, Serialize};

/// The closed set of encoder names the host can request.
///
/// Only the uncompressed PCM containers are implemented in-process;
/// compressed codecs plug in through a `CodecSink` backend. A request
/// for a codec with no registered backend falls back to the WAV
/// container so a recording always succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioEncoder {
    Wav,
    #[serde(rename = "pcm16bits")]
    Pcm16Bits,
    AacLc,
    AacEld,
    AacHe,
    AmrNb,
    AmrWb,
    Opus,
    Flac,
}

impl AudioEncoder {
    /// Parse a host-supplied encoder name. Returns `None` for names
    /// outside the closed set.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wav" => Some(Self::Wav),
            "pcm16bits" => Some(Self::Pcm16Bits),
            "aacLc" => Some(Self::AacLc),
            "aacEld" => Some(Self::AacEld),
            "aacHe" => Some(Self::AacHe),
            "amrNb" => Some(Self::AmrNb),
            "amrWb" => Some(Self::AmrWb),
            "opus" => Some(Self::Opus),
            "flac" => Some(Self::Flac),
            _ => None,
        }
    }

    /// File extension produced by this encoder.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Pcm16Bits => "pcm",
            Self::AacLc | Self::AacEld | Self::AacHe => "m4a",
            Self::AmrNb | Self::AmrWb => "amr",
            Self::Opus => "opus",
            Self::Flac => "flac",
        }
    }

    /// Whether this encoder is implemented in-process (no codec
    /// backend required).
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Wav | Self::Pcm16Bits)
    }

    /// Resolve a requested encoder name to one we can actually write.
    ///
    /// Unknown names and codecs without a backend resolve to the WAV
    /// container; the caller adjusts the output extension to match.
    pub fn resolve(name: &str) -> Self {
        match Self::from_name(name) {
            Some(encoder) if encoder.is_builtin() => encoder,
            _ => Self::Wav,
        }
    }

    /// Whether a recording started with this encoder name can be
    /// honored without falling back.
    pub fn is_supported(name: &str) -> bool {
        Self::from_name(name).map(|e| e.is_builtin()).unwrap_or(false)
    }
}
