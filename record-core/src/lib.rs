//! # record-core
//!
//! Platform-agnostic audio recording pipeline.
//!
//! Captures microphone audio through a pluggable device backend,
//! meters levels, and either encodes to a file or streams raw PCM
//! chunks to the host. Backends implement the `CaptureDevice` /
//! `DeviceProvider` traits and plug into the generic
//! `RecordingSession`.
//!
//! ## Architecture
//!
//! ```text
//! record-core (this crate)
//! ├── traits/       ← CaptureDevice, DeviceProvider, CodecSink, HostDispatcher, RecorderDelegate
//! ├── models/       ← RecordError, RecordState, RecordConfig, DeviceFormat, AudioEncoder
//! ├── processing/   ← RingTransport, LevelMeter, sample conversion, WAV headers
//! ├── engine/       ← format negotiation, CaptureEngine (acquisition thread)
//! ├── encode/       ← StreamEncoder (writer thread), WAV/PCM sinks
//! └── session/      ← RecordingSession (orchestrator), media subsystem guard
//! ```

pub mod encode;
pub mod engine;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use encode::encoder::StreamEncoder;
pub use engine::capture::{CaptureEngine, FrameCallback};
pub use models::config::RecordConfig;
pub use models::device::{Amplitude, InputDevice};
pub use models::encoder::AudioEncoder;
pub use models::error::RecordError;
pub use models::format::{DeviceFormat, SampleRepr};
pub use models::state::RecordState;
pub use processing::meter::LevelMeter;
pub use processing::ring::RingTransport;
pub use session::recording::RecordingSession;
pub use traits::capture_device::{CaptureDevice, DeviceBuffer, DeviceProvider, FormatSupport};
pub use traits::codec_sink::{CodecSink, MediaTime};
pub use traits::host::{HostDispatcher, InlineDispatcher, RecorderDelegate};
