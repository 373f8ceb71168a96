use std::time::Duration;

use crate::models::device::InputDevice;
use crate::models::error::RecordError;
use crate::models::format::DeviceFormat;

/// One raw buffer pulled from the device.
pub struct DeviceBuffer {
    /// Raw interleaved sample bytes in the negotiated format.
    pub bytes: Vec<u8>,
    /// Device flagged the buffer as silence; conversion short-circuits.
    pub silent: bool,
}

/// The device's answer to a format probe during negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSupport {
    /// The requested profile works as-is.
    Exact,
    /// The device proposes its closest supported profile instead.
    Closest(DeviceFormat),
    /// Nothing close to the requested profile.
    Unsupported,
}

/// A capture endpoint, implemented per audio backend.
///
/// `probe_format`/`native_format` are called during negotiation on the
/// control thread, before any stream exists. `open` and everything
/// after it are called from the single acquisition thread that owns the
/// device for the rest of the session; backends may hold
/// thread-affine handles as long as they respect that split.
pub trait CaptureDevice: Send {
    /// Ask whether the device supports the requested profile.
    fn probe_format(&self, requested: &DeviceFormat) -> Result<FormatSupport, RecordError>;

    /// The device's native mix format, used as the negotiation fallback
    /// of last resort.
    fn native_format(&self) -> Result<DeviceFormat, RecordError>;

    /// Open the endpoint with the negotiated format.
    fn open(&mut self, format: &DeviceFormat) -> Result<(), RecordError>;

    /// Begin streaming buffers.
    fn start(&mut self) -> Result<(), RecordError>;

    /// Stop streaming without tearing the endpoint down.
    fn pause(&mut self) -> Result<(), RecordError>;

    /// Restart streaming after `pause`.
    fn resume(&mut self) -> Result<(), RecordError>;

    /// Stop streaming and release the endpoint.
    fn stop(&mut self) -> Result<(), RecordError>;

    /// Wait up to `timeout` for the next buffer.
    ///
    /// `Ok(None)` means the wait timed out with no data, which is not
    /// an error; the caller loops so stop requests stay responsive.
    fn next_buffer(&mut self, timeout: Duration) -> Result<Option<DeviceBuffer>, RecordError>;
}

/// Backend entry point: enumerates input devices and opens endpoints.
pub trait DeviceProvider: Send + Sync {
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, RecordError>;

    /// Open a capture endpoint, `None` for the system default device.
    fn open_device(&self, device_id: Option<&str>) -> Result<Box<dyn CaptureDevice>, RecordError>;
}
