//! Device enumeration and endpoint creation through cpal.

use cpal::traits::{DeviceTrait, HostTrait};

use record_core::{CaptureDevice, DeviceProvider, InputDevice, RecordError};

use crate::device::CpalCaptureDevice;

/// [`DeviceProvider`] backed by the platform's default cpal host.
///
/// Device ids are the cpal device names, which is what hosts display
/// and what `open_device` matches against.
pub struct CpalDeviceProvider;

impl CpalDeviceProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalDeviceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProvider for CpalDeviceProvider {
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, RecordError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| RecordError::DeviceNotAvailable(e.to_string()))?;
        let mut inputs = Vec::new();
        for device in devices {
            match device.name() {
                Ok(name) => inputs.push(InputDevice {
                    id: name.clone(),
                    label: name,
                }),
                Err(e) => log::warn!("skipping unnamed input device: {e}"),
            }
        }
        Ok(inputs)
    }

    fn open_device(&self, device_id: Option<&str>) -> Result<Box<dyn CaptureDevice>, RecordError> {
        let host = cpal::default_host();
        let device = match device_id {
            None => host.default_input_device().ok_or_else(|| {
                RecordError::DeviceNotAvailable("no default input device".into())
            })?,
            Some(id) => host
                .input_devices()
                .map_err(|e| RecordError::DeviceNotAvailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == id).unwrap_or(false))
                .ok_or_else(|| {
                    RecordError::DeviceNotAvailable(format!("no input device named '{id}'"))
                })?,
        };
        Ok(Box::new(CpalCaptureDevice::new(device)))
    }
}
