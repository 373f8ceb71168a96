//! Capture engine: owns the device lifecycle and the acquisition thread.
//!
//! The device handle is single-thread affine once a stream exists (OS
//! audio APIs require it), so `start` moves the device onto a dedicated
//! `audio-capture` thread and all later device calls (pause, resume,
//! buffer pulls, stop) happen there. Control methods talk to the
//! thread over a command channel and wait for the reply, so device
//! failures surface synchronously to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::engine::negotiator;
use crate::models::error::RecordError;
use crate::models::format::DeviceFormat;
use crate::processing::convert;
use crate::traits::capture_device::CaptureDevice;

/// Interleaved f32 batches tagged with the negotiated rate/channels.
pub type FrameCallback = Arc<dyn Fn(&[f32], u32, u16) + Send + Sync>;

/// Bounded wait per buffer pull, so stop requests stay responsive.
const PULL_TIMEOUT: Duration = Duration::from_millis(100);

/// How long a control call waits for the capture thread to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Duration of the startup gain ramp that masks the device's
/// power-on transient.
const WARMUP_MS: u64 = 50;

enum EngineCommand {
    Pause(Sender<Result<(), RecordError>>),
    Resume(Sender<Result<(), RecordError>>),
}

/// Linear gain ramp applied to the first ~50ms of captured audio.
///
/// Capture endpoints emit a click or DC step right after the stream
/// starts; ramping from silence hides it without dropping samples, so
/// downstream timestamps stay exact.
struct WarmupRamp {
    total: usize,
    consumed: usize,
}

impl WarmupRamp {
    fn new(format: &DeviceFormat) -> Self {
        let total =
            format.sample_rate as usize * format.channels as usize * WARMUP_MS as usize / 1000;
        Self { total, consumed: 0 }
    }

    fn apply(&mut self, samples: &mut [f32]) {
        if self.consumed >= self.total {
            return;
        }
        for sample in samples.iter_mut() {
            if self.consumed >= self.total {
                break;
            }
            *sample *= self.consumed as f32 / self.total as f32;
            self.consumed += 1;
        }
    }
}

/// Pulls buffers from a [`CaptureDevice`] on a dedicated thread,
/// converts them to interleaved f32 and hands batches to a callback.
pub struct CaptureEngine {
    format: DeviceFormat,
    device: Mutex<Option<Box<dyn CaptureDevice>>>,
    running: Arc<AtomicBool>,
    commands: Mutex<Option<Sender<EngineCommand>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CaptureEngine {
    /// Negotiate a capture format with the device and hold it, ready to
    /// start. Negotiation runs on the calling thread; no stream exists
    /// yet.
    pub fn initialize(
        device: Box<dyn CaptureDevice>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, RecordError> {
        let format = negotiator::negotiate(device.as_ref(), sample_rate, channels)?;
        Ok(Self {
            format,
            device: Mutex::new(Some(device)),
            running: Arc::new(AtomicBool::new(false)),
            commands: Mutex::new(None),
            handle: Mutex::new(None),
        })
    }

    /// The negotiated format. Downstream components (meter scaling,
    /// encoder headers, chunk conversion) must be set up from this.
    pub fn format(&self) -> DeviceFormat {
        self.format
    }

    /// Spawn the acquisition thread and begin streaming.
    ///
    /// The device is opened and started on the new thread; its result
    /// comes back over a handshake channel, so a failure here is
    /// reported synchronously and the thread never enters its loop.
    pub fn start(&self, on_frames: FrameCallback) -> Result<(), RecordError> {
        let device = self
            .device
            .lock()
            .take()
            .ok_or_else(|| RecordError::InvalidState("capture already started".into()))?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let format = self.format;
        let (cmd_tx, cmd_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                capture_loop(device, format, running, cmd_rx, ready_tx, on_frames);
            })
            .map_err(|e| RecordError::OutOfMemory(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv_timeout(REPLY_TIMEOUT) {
            Ok(Ok(())) => {
                *self.commands.lock() = Some(cmd_tx);
                *self.handle.lock() = Some(handle);
                Ok(())
            }
            Ok(Err(err)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(RecordError::EndpointCreateFailed(
                    "capture thread did not report startup".into(),
                ))
            }
        }
    }

    /// Stop device streaming without tearing down the thread or format.
    pub fn pause(&self) -> Result<(), RecordError> {
        self.send_command(EngineCommand::Pause)
    }

    /// Restart device streaming after a pause.
    pub fn resume(&self) -> Result<(), RecordError> {
        self.send_command(EngineCommand::Resume)
    }

    /// Signal the acquisition thread to exit and join it. The device
    /// stream is stopped on the thread before it exits. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the sender wakes a thread blocked on the channel.
        *self.commands.lock() = None;
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }

    fn send_command(
        &self,
        make: impl FnOnce(Sender<Result<(), RecordError>>) -> EngineCommand,
    ) -> Result<(), RecordError> {
        let sender = self
            .commands
            .lock()
            .clone()
            .ok_or_else(|| RecordError::InvalidState("capture not running".into()))?;
        let (reply_tx, reply_rx) = bounded(1);
        sender
            .send(make(reply_tx))
            .map_err(|_| RecordError::InvalidState("capture thread exited".into()))?;
        reply_rx
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| RecordError::InvalidState("capture thread unresponsive".into()))?
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    mut device: Box<dyn CaptureDevice>,
    format: DeviceFormat,
    running: Arc<AtomicBool>,
    commands: Receiver<EngineCommand>,
    ready: Sender<Result<(), RecordError>>,
    on_frames: FrameCallback,
) {
    if let Err(err) = device.open(&format).and_then(|_| device.start()) {
        let _ = ready.send(Err(err));
        return;
    }
    let _ = ready.send(Ok(()));

    let mut ramp = WarmupRamp::new(&format);
    let mut paused = false;

    while running.load(Ordering::SeqCst) {
        while let Ok(cmd) = commands.try_recv() {
            handle_command(device.as_mut(), cmd, &mut paused);
        }

        if paused {
            // No buffers arrive while paused; block on the next command
            // instead of spinning on the device.
            if let Ok(cmd) = commands.recv_timeout(PULL_TIMEOUT) {
                handle_command(device.as_mut(), cmd, &mut paused);
            }
            continue;
        }

        match device.next_buffer(PULL_TIMEOUT) {
            Ok(Some(buffer)) => {
                let mut samples = convert::to_float_samples(&buffer.bytes, &format, buffer.silent);
                if samples.is_empty() {
                    continue;
                }
                ramp.apply(&mut samples);
                on_frames(&samples, format.sample_rate, format.channels);
            }
            Ok(None) => {}
            Err(err) => {
                // Transient pull failures must not kill capture.
                log::warn!("buffer pull failed: {err}");
            }
        }
    }

    if let Err(err) = device.stop() {
        log::warn!("device stop failed: {err}");
    }
}

fn handle_command(device: &mut dyn CaptureDevice, cmd: EngineCommand, paused: &mut bool) {
    match cmd {
        EngineCommand::Pause(reply) => {
            let result = device.pause();
            if result.is_ok() {
                *paused = true;
            }
            let _ = reply.send(result);
        }
        EngineCommand::Resume(reply) => {
            let result = device.resume();
            if result.is_ok() {
                *paused = false;
            }
            let _ = reply.send(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pcm16_bytes, MockDevice};
    use approx::assert_relative_eq;
    use std::time::Instant;

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for capture");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn ramp_starts_at_silence_and_reaches_unity() {
        let format = DeviceFormat::float(1000, 1);
        let mut ramp = WarmupRamp::new(&format); // 50 samples
        let mut first = vec![1.0f32; 10];
        ramp.apply(&mut first);
        assert_relative_eq!(first[0], 0.0);
        assert!(first[9] < 0.2);

        let mut rest = vec![1.0f32; 50];
        ramp.apply(&mut rest);
        assert_relative_eq!(rest[45], 1.0);
    }

    #[test]
    fn ramp_preserves_sample_count() {
        let format = DeviceFormat::float(44100, 2);
        let mut ramp = WarmupRamp::new(&format);
        let mut batch = vec![0.5f32; 480];
        ramp.apply(&mut batch);
        assert_eq!(batch.len(), 480);
    }

    #[test]
    fn ramp_is_monotonic_within_warmup() {
        let format = DeviceFormat::float(1000, 1);
        let mut ramp = WarmupRamp::new(&format);
        let mut batch = vec![1.0f32; 50];
        ramp.apply(&mut batch);
        for pair in batch.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn initialize_negotiates_format() {
        let device = MockDevice::new();
        let engine = CaptureEngine::initialize(Box::new(device), 48000, 1).unwrap();
        assert_eq!(engine.format(), DeviceFormat::float(48000, 1));
    }

    #[test]
    fn delivers_converted_frames_to_callback() {
        use crate::traits::capture_device::FormatSupport;

        let device = MockDevice::new()
            .float_support(FormatSupport::Unsupported)
            .int_support(FormatSupport::Exact);
        device.push_buffer(pcm16_bytes(&[16384, -16384, 32767, 0]), false);
        device.push_buffer(pcm16_bytes(&[100, 200]), false);
        let calls = Arc::clone(&device.calls);

        let engine = CaptureEngine::initialize(Box::new(device), 44100, 2).unwrap();
        assert_eq!(engine.format(), DeviceFormat::int16(44100, 2));

        let received = Arc::new(Mutex::new(Vec::<f32>::new()));
        let sink = Arc::clone(&received);
        engine
            .start(Arc::new(move |samples, rate, channels| {
                assert_eq!(rate, 44100);
                assert_eq!(channels, 2);
                sink.lock().extend_from_slice(samples);
            }))
            .unwrap();

        wait_for(|| received.lock().len() == 6);
        engine.stop();

        assert!(calls.opened.load(Ordering::SeqCst));
        assert!(calls.started.load(Ordering::SeqCst));
        assert!(calls.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn start_failure_is_synchronous() {
        let device = MockDevice::new().failing_open();
        let engine = CaptureEngine::initialize(Box::new(device), 44100, 2).unwrap();
        let err = engine.start(Arc::new(|_, _, _| {})).unwrap_err();
        assert_eq!(err, RecordError::DeviceInUse("mock endpoint busy".into()));
    }

    #[test]
    fn second_start_is_rejected() {
        let device = MockDevice::new();
        let engine = CaptureEngine::initialize(Box::new(device), 44100, 2).unwrap();
        engine.start(Arc::new(|_, _, _| {})).unwrap();
        assert!(matches!(
            engine.start(Arc::new(|_, _, _| {})),
            Err(RecordError::InvalidState(_))
        ));
        engine.stop();
    }

    #[test]
    fn pause_and_resume_reach_the_device() {
        let device = MockDevice::new();
        let calls = Arc::clone(&device.calls);
        let engine = CaptureEngine::initialize(Box::new(device), 44100, 2).unwrap();
        engine.start(Arc::new(|_, _, _| {})).unwrap();

        engine.pause().unwrap();
        assert_eq!(calls.pauses.load(Ordering::SeqCst), 1);
        engine.resume().unwrap();
        assert_eq!(calls.resumes.load(Ordering::SeqCst), 1);
        engine.stop();
    }

    #[test]
    fn pause_failure_surfaces_to_caller() {
        let device = MockDevice::new().failing_pause();
        let engine = CaptureEngine::initialize(Box::new(device), 44100, 2).unwrap();
        engine.start(Arc::new(|_, _, _| {})).unwrap();
        assert!(matches!(
            engine.pause(),
            Err(RecordError::DeviceNotAvailable(_))
        ));
        engine.stop();
    }

    #[test]
    fn pause_without_start_is_invalid_state() {
        let device = MockDevice::new();
        let engine = CaptureEngine::initialize(Box::new(device), 44100, 2).unwrap();
        assert!(matches!(engine.pause(), Err(RecordError::InvalidState(_))));
    }
}
