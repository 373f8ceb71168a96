//! # record-cpal
//!
//! Cross-platform capture backend for `record-core` built on
//! [`cpal`]. Implements device enumeration, format probing and input
//! streaming behind the core's `DeviceProvider`/`CaptureDevice`
//! traits.
//!
//! The processing flags in `RecordConfig` (auto gain, echo
//! cancellation, noise suppression) are accepted and ignored: cpal
//! exposes no such toggles, and they are best-effort by contract.

pub mod device;
pub mod provider;

pub use device::CpalCaptureDevice;
pub use provider::CpalDeviceProvider;
