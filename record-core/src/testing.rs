//! Shared test doubles for the core pipeline.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::device::InputDevice;
use crate::models::error::RecordError;
use crate::models::format::DeviceFormat;
use crate::models::state::RecordState;
use crate::traits::capture_device::{CaptureDevice, DeviceBuffer, DeviceProvider, FormatSupport};
use crate::traits::codec_sink::{CodecSink, MediaTime};
use crate::traits::host::RecorderDelegate;

/// Observable side effects of a [`MockDevice`], shared with the test.
#[derive(Default)]
pub struct DeviceCalls {
    pub opened: AtomicBool,
    pub started: AtomicBool,
    pub stopped: AtomicBool,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
}

/// Scriptable capture device: answers format probes from the builder
/// configuration and serves a queue of pre-canned buffers.
pub struct MockDevice {
    float_support: FormatSupport,
    int_support: FormatSupport,
    native: DeviceFormat,
    buffers: Mutex<VecDeque<DeviceBuffer>>,
    fail_open: bool,
    fail_pause: bool,
    pub calls: Arc<DeviceCalls>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            float_support: FormatSupport::Exact,
            int_support: FormatSupport::Exact,
            native: DeviceFormat::float(44100, 2),
            buffers: Mutex::new(VecDeque::new()),
            fail_open: false,
            fail_pause: false,
            calls: Arc::new(DeviceCalls::default()),
        }
    }

    pub fn float_support(mut self, support: FormatSupport) -> Self {
        self.float_support = support;
        self
    }

    pub fn int_support(mut self, support: FormatSupport) -> Self {
        self.int_support = support;
        self
    }

    pub fn native(mut self, format: DeviceFormat) -> Self {
        self.native = format;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_pause(mut self) -> Self {
        self.fail_pause = true;
        self
    }

    /// Queue a buffer for `next_buffer` to return.
    pub fn push_buffer(&self, bytes: Vec<u8>, silent: bool) {
        self.buffers.lock().push_back(DeviceBuffer { bytes, silent });
    }
}

impl CaptureDevice for MockDevice {
    fn probe_format(&self, requested: &DeviceFormat) -> Result<FormatSupport, RecordError> {
        Ok(match requested.repr {
            crate::models::format::SampleRepr::Float => self.float_support.clone(),
            crate::models::format::SampleRepr::Int => self.int_support.clone(),
        })
    }

    fn native_format(&self) -> Result<DeviceFormat, RecordError> {
        Ok(self.native)
    }

    fn open(&mut self, _format: &DeviceFormat) -> Result<(), RecordError> {
        if self.fail_open {
            return Err(RecordError::DeviceInUse("mock endpoint busy".into()));
        }
        self.calls.opened.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn start(&mut self) -> Result<(), RecordError> {
        self.calls.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RecordError> {
        if self.fail_pause {
            return Err(RecordError::DeviceNotAvailable("mock device gone".into()));
        }
        self.calls.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), RecordError> {
        self.calls.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        self.calls.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn next_buffer(&mut self, timeout: Duration) -> Result<Option<DeviceBuffer>, RecordError> {
        match self.buffers.lock().pop_front() {
            Some(buffer) => Ok(Some(buffer)),
            None => {
                // Simulate the bounded wait without burning a core.
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(None)
            }
        }
    }
}

/// Provider handing out devices from a queue, one per `open_device`.
pub struct MockProvider {
    devices: Mutex<VecDeque<MockDevice>>,
    inputs: Vec<InputDevice>,
}

impl MockProvider {
    pub fn new(device: MockDevice) -> Self {
        let mut devices = VecDeque::new();
        devices.push_back(device);
        Self {
            devices: Mutex::new(devices),
            inputs: vec![InputDevice {
                id: "mock-0".into(),
                label: "Mock Microphone".into(),
            }],
        }
    }
}

impl DeviceProvider for MockProvider {
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, RecordError> {
        Ok(self.inputs.clone())
    }

    fn open_device(&self, _device_id: Option<&str>) -> Result<Box<dyn CaptureDevice>, RecordError> {
        self.devices
            .lock()
            .pop_front()
            .map(|d| Box::new(d) as Box<dyn CaptureDevice>)
            .ok_or_else(|| RecordError::DeviceNotAvailable("no mock device queued".into()))
    }
}

/// Codec sink recording every block it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub blocks: Arc<Mutex<Vec<(Vec<u8>, MediaTime)>>>,
    pub finalized: Arc<AtomicBool>,
    bytes: u64,
}

impl CodecSink for RecordingSink {
    fn open(&mut self) -> Result<(), RecordError> {
        Ok(())
    }

    fn timebase(&self) -> u32 {
        10_000_000
    }

    fn write_block(&mut self, pcm: &[u8], time: MediaTime) -> Result<(), RecordError> {
        self.bytes += pcm.len() as u64;
        self.blocks.lock().push((pcm.to_vec(), time));
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RecordError> {
        self.finalized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

/// Delegate collecting state transitions and streamed chunks.
#[derive(Default)]
pub struct CollectingDelegate {
    pub states: Mutex<Vec<RecordState>>,
    pub chunks: Mutex<Vec<Vec<u8>>>,
}

impl RecorderDelegate for CollectingDelegate {
    fn on_state_changed(&self, state: RecordState) {
        self.states.lock().push(state);
    }

    fn on_audio_chunk(&self, chunk: Vec<u8>) {
        self.chunks.lock().push(chunk);
    }
}

/// Interleaved i16 little-endian bytes for feeding a mock device.
pub fn pcm16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
