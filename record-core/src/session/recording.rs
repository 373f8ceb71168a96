//! Recording session orchestrator.
//!
//! Wires the capture engine, level meter and stream encoder together
//! and drives the lifecycle state machine:
//!
//! ```text
//! Stop → Record ⇄ Pause → Stop      (cancel: force Stop + delete file)
//! ```
//!
//! Data flow while recording to file:
//! ```text
//! [CaptureDevice] → CaptureEngine ─→ LevelMeter
//!                        │
//!                        └→ RingTransport → StreamEncoder → CodecSink
//! ```
//! In stream mode the encoder is absent and converted PCM chunks go to
//! the delegate through the host dispatcher instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::encode::encoder::{make_sink, resolve_output, StreamEncoder};
use crate::engine::capture::CaptureEngine;
use crate::models::config::RecordConfig;
use crate::models::device::{Amplitude, InputDevice};
use crate::models::encoder::AudioEncoder;
use crate::models::error::RecordError;
use crate::models::state::RecordState;
use crate::processing::convert;
use crate::processing::meter::LevelMeter;
use crate::processing::ring::RingTransport;
use crate::session::media::MediaGuard;
use crate::traits::capture_device::DeviceProvider;
use crate::traits::host::{HostDispatcher, RecorderDelegate};

struct Inner {
    state: RecordState,
    engine: Option<CaptureEngine>,
    encoder: Option<StreamEncoder>,
    output_path: Option<PathBuf>,
    media: Option<MediaGuard>,
}

/// One recorder instance, owned by the host bridge.
///
/// All control methods are called from the host's control thread; the
/// worker threads it spawns never call back into the session.
pub struct RecordingSession {
    provider: Arc<dyn DeviceProvider>,
    delegate: Arc<dyn RecorderDelegate>,
    dispatcher: Arc<dyn HostDispatcher>,
    meter: Arc<LevelMeter>,
    inner: Mutex<Inner>,
}

impl RecordingSession {
    pub fn new(
        provider: Arc<dyn DeviceProvider>,
        delegate: Arc<dyn RecorderDelegate>,
        dispatcher: Arc<dyn HostDispatcher>,
    ) -> Self {
        Self {
            provider,
            delegate,
            dispatcher,
            meter: Arc::new(LevelMeter::new()),
            inner: Mutex::new(Inner {
                state: RecordState::Stop,
                engine: None,
                encoder: None,
                output_path: None,
                media: None,
            }),
        }
    }

    /// Start recording to a file.
    ///
    /// The encoder is wired to the *negotiated* format, which may
    /// differ from the requested one; the resolved output path (the
    /// extension changes when an encoder falls back to WAV) is what
    /// `stop` later returns. Fails without leaving anything running.
    pub fn start(&self, config: &RecordConfig, path: &Path) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        if inner.state != RecordState::Stop {
            return Err(RecordError::InvalidState(
                "recorder is already active".into(),
            ));
        }
        config.validate()?;
        let (codec, output_path) = resolve_output(&config.encoder_name, path);

        // Held locally until everything is running: any `?` below
        // drops it again, so a failed start releases the media
        // runtime instead of leaking a refcount.
        let media = inner.media.take().unwrap_or_else(MediaGuard::acquire);

        let device = self.provider.open_device(config.device_id.as_deref())?;
        let engine = CaptureEngine::initialize(device, config.sample_rate, config.num_channels)?;
        let format = engine.format();

        // One second of audio between capture and disk; disk stalls
        // beyond that drop samples instead of stalling capture.
        let ring = Arc::new(RingTransport::new(
            format.sample_rate as usize * format.channels as usize,
        ));
        let sink = make_sink(codec, &output_path, &format);
        let encoder = StreamEncoder::new(sink, format, Arc::clone(&ring));
        if let Err(err) = encoder.start() {
            // The sink may have created the file before failing.
            let _ = std::fs::remove_file(&output_path);
            return Err(err);
        }

        self.meter.reset();
        let meter = Arc::clone(&self.meter);
        let result = engine.start(Arc::new(move |samples, _, _| {
            meter.process_samples(samples);
            if !ring.write(samples) {
                log::trace!("ring overflow, dropping {} samples", samples.len());
            }
        }));
        if let Err(err) = result {
            // Roll back the already-running writer and its file.
            let _ = encoder.stop();
            let _ = std::fs::remove_file(&output_path);
            return Err(err);
        }

        inner.engine = Some(engine);
        inner.encoder = Some(encoder);
        inner.output_path = Some(output_path);
        inner.media = Some(media);
        inner.state = RecordState::Record;
        drop(inner);
        self.emit_state(RecordState::Record);
        Ok(())
    }

    /// Start capturing without a file: converted 16-bit PCM chunks are
    /// forwarded to the delegate's record stream.
    pub fn start_stream(&self, config: &RecordConfig) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        if inner.state != RecordState::Stop {
            return Err(RecordError::InvalidState(
                "recorder is already active".into(),
            ));
        }
        config.validate()?;

        // Local until the engine is running; failures release it.
        let media = inner.media.take().unwrap_or_else(MediaGuard::acquire);

        let device = self.provider.open_device(config.device_id.as_deref())?;
        let engine = CaptureEngine::initialize(device, config.sample_rate, config.num_channels)?;

        self.meter.reset();
        let meter = Arc::clone(&self.meter);
        let delegate = Arc::clone(&self.delegate);
        let dispatcher = Arc::clone(&self.dispatcher);
        engine.start(Arc::new(move |samples, _, _| {
            meter.process_samples(samples);
            let chunk = convert::to_pcm16(samples);
            let delegate = Arc::clone(&delegate);
            dispatcher.run_on_host(Box::new(move || delegate.on_audio_chunk(chunk)));
        }))?;

        inner.engine = Some(engine);
        inner.output_path = None;
        inner.media = Some(media);
        inner.state = RecordState::Record;
        drop(inner);
        self.emit_state(RecordState::Record);
        Ok(())
    }

    /// Pause capture; the writer thread naturally stalls because no
    /// new frames reach the ring.
    pub fn pause(&self) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        if inner.state != RecordState::Record {
            return Err(RecordError::InvalidState("recorder is not recording".into()));
        }
        inner
            .engine
            .as_ref()
            .ok_or_else(|| RecordError::InvalidState("no active capture".into()))?
            .pause()?;
        inner.state = RecordState::Pause;
        drop(inner);
        self.emit_state(RecordState::Pause);
        Ok(())
    }

    pub fn resume(&self) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        if inner.state != RecordState::Pause {
            return Err(RecordError::InvalidState("recorder is not paused".into()));
        }
        inner
            .engine
            .as_ref()
            .ok_or_else(|| RecordError::InvalidState("no active capture".into()))?
            .resume()?;
        inner.state = RecordState::Record;
        drop(inner);
        self.emit_state(RecordState::Record);
        Ok(())
    }

    /// Stop recording and return the output path (None in stream
    /// mode). Capture stops before the encoder so the sink drains the
    /// tail and finalizes with the true byte counts.
    pub fn stop(&self) -> Result<Option<PathBuf>, RecordError> {
        let mut inner = self.inner.lock();
        let (result, changed) = self.teardown(&mut inner);
        drop(inner);
        if changed {
            self.emit_state(RecordState::Stop);
        }
        result
    }

    /// Stop and delete the partial output file.
    pub fn cancel(&self) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        let (result, changed) = self.teardown(&mut inner);
        drop(inner);
        if changed {
            self.emit_state(RecordState::Stop);
        }
        if let Some(path) = result? {
            std::fs::remove_file(&path).map_err(RecordError::storage)?;
        }
        Ok(())
    }

    /// Release everything the session holds. Safe to call repeatedly
    /// and in any state.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        let (result, changed) = self.teardown(&mut inner);
        inner.media = None;
        drop(inner);
        if changed {
            self.emit_state(RecordState::Stop);
        }
        if let Err(err) = result {
            log::warn!("teardown during dispose failed: {err}");
        }
    }

    pub fn state(&self) -> RecordState {
        self.inner.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.inner.lock().state.is_recording()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().state.is_paused()
    }

    /// Live amplitude, valid in every state (frozen while paused).
    pub fn get_amplitude(&self) -> Amplitude {
        self.meter.amplitude()
    }

    pub fn is_encoder_supported(&self, name: &str) -> bool {
        AudioEncoder::is_supported(name)
    }

    pub fn list_input_devices(&self) -> Result<Vec<InputDevice>, RecordError> {
        self.provider.list_input_devices()
    }

    /// Stop workers and reset to `Stop`. Returns the output path (or
    /// the encoder's failure) and whether the state actually changed;
    /// the caller emits the state event after releasing the lock.
    fn teardown(&self, inner: &mut Inner) -> (Result<Option<PathBuf>, RecordError>, bool) {
        if let Some(engine) = inner.engine.take() {
            engine.stop();
        }
        let mut result = Ok(());
        if let Some(encoder) = inner.encoder.take() {
            result = encoder.stop();
        }
        let changed = inner.state != RecordState::Stop;
        inner.state = RecordState::Stop;
        let path = inner.output_path.take();
        (result.map(|_| path), changed)
    }

    /// Forward a state event to the delegate through the host
    /// dispatcher. Never called with the session lock held, so a
    /// delegate may call back into the session.
    fn emit_state(&self, state: RecordState) {
        let delegate = Arc::clone(&self.delegate);
        self.dispatcher
            .run_on_host(Box::new(move || delegate.on_state_changed(state)));
    }

    #[cfg(test)]
    fn holds_media_guard(&self) -> bool {
        self.inner.lock().media.is_some()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
