//! Streaming encoder: drains the ring transport to a codec sink on a
//! dedicated writer thread.
//!
//! Block timestamps are derived from the running frame total in the
//! sink's time base, never from wall-clock time, so scheduling jitter
//! on the writer thread cannot skew the media timeline.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::encode::sink::{RawPcmSink, WavSink};
use crate::models::encoder::AudioEncoder;
use crate::models::error::RecordError;
use crate::models::format::DeviceFormat;
use crate::processing::convert;
use crate::processing::ring::RingTransport;
use crate::traits::codec_sink::{CodecSink, MediaTime};

/// Largest sample batch pulled from the ring per iteration.
const DRAIN_CHUNK: usize = 4096;

/// Resolve a requested encoder name to a writable output.
///
/// Compressed or unknown encoders fall back to the WAV container, and
/// the output path's extension is rewritten to match; built-in names
/// keep the caller's path untouched.
pub fn resolve_output(encoder_name: &str, path: &Path) -> (AudioEncoder, PathBuf) {
    let requested = AudioEncoder::from_name(encoder_name);
    let resolved = AudioEncoder::resolve(encoder_name);
    if requested == Some(resolved) {
        (resolved, path.to_path_buf())
    } else {
        log::warn!(
            "encoder '{}' has no codec backend, falling back to {}",
            encoder_name,
            resolved.extension()
        );
        (resolved, path.with_extension(resolved.extension()))
    }
}

/// Construct the container sink for a resolved encoder.
pub fn make_sink(encoder: AudioEncoder, path: &Path, format: &DeviceFormat) -> Box<dyn CodecSink> {
    match encoder {
        AudioEncoder::Pcm16Bits => Box::new(RawPcmSink::new(path)),
        _ => Box::new(WavSink::new(path, format)),
    }
}

/// Consumes f32 samples from a [`RingTransport`], converts them to
/// 16-bit PCM and writes timed blocks to a [`CodecSink`].
pub struct StreamEncoder {
    ring: Arc<RingTransport>,
    format: DeviceFormat,
    running: Arc<AtomicBool>,
    bytes: Arc<AtomicU64>,
    sink: Mutex<Option<Box<dyn CodecSink>>>,
    handle: Mutex<Option<thread::JoinHandle<Result<(), RecordError>>>>,
}

impl StreamEncoder {
    pub fn new(sink: Box<dyn CodecSink>, format: DeviceFormat, ring: Arc<RingTransport>) -> Self {
        Self {
            ring,
            format,
            running: Arc::new(AtomicBool::new(false)),
            bytes: Arc::new(AtomicU64::new(0)),
            sink: Mutex::new(Some(sink)),
            handle: Mutex::new(None),
        }
    }

    /// The ring the capture side should write into.
    pub fn ring(&self) -> Arc<RingTransport> {
        Arc::clone(&self.ring)
    }

    /// Open the sink and spawn the `audio-writer` thread.
    ///
    /// Sink open failures (bad path, disk full) surface here, before
    /// any thread exists.
    pub fn start(&self) -> Result<(), RecordError> {
        let mut sink = self
            .sink
            .lock()
            .take()
            .ok_or_else(|| RecordError::InvalidState("encoder already started".into()))?;
        sink.open()?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let ring = Arc::clone(&self.ring);
        let bytes = Arc::clone(&self.bytes);
        let format = self.format;

        let handle = thread::Builder::new()
            .name("audio-writer".into())
            .spawn(move || writer_loop(sink, format, ring, running, bytes))
            .map_err(|e| RecordError::OutOfMemory(format!("failed to spawn writer thread: {e}")))?;
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    /// Signal the writer to finish, wait for the tail drain and the
    /// sink's `finalize`. Idempotent; a second call is a no-op.
    pub fn stop(&self) -> Result<(), RecordError> {
        self.running.store(false, Ordering::SeqCst);
        match self.handle.lock().take() {
            Some(handle) => handle
                .join()
                .map_err(|_| RecordError::Encoding("writer thread panicked".into()))?,
            None => Ok(()),
        }
    }

    /// PCM bytes written to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}

fn writer_loop(
    mut sink: Box<dyn CodecSink>,
    format: DeviceFormat,
    ring: Arc<RingTransport>,
    running: Arc<AtomicBool>,
    bytes: Arc<AtomicU64>,
) -> Result<(), RecordError> {
    let timebase = sink.timebase() as u64;
    let rate = format.sample_rate.max(1) as u64;
    let channels = format.channels.max(1) as u64;
    // Tick math runs on the sample total, not per-chunk frame counts:
    // a drain that ends mid-frame must not floor away the remainder,
    // or the timeline drifts whenever the chunk size is not a multiple
    // of the channel count.
    let samples_per_second = rate * channels;
    let mut total_samples: u64 = 0;
    let mut batch = vec![0.0f32; DRAIN_CHUNK];
    let mut result = Ok(());

    // Keep draining after the stop signal until the ring is empty, so
    // the recording's tail is never truncated.
    loop {
        let read = ring.read(&mut batch);
        if read == 0 {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_millis(1));
            continue;
        }

        let pcm = convert::to_pcm16(&batch[..read]);
        let pts = total_samples * timebase / samples_per_second;
        let end = (total_samples + read as u64) * timebase / samples_per_second;
        if let Err(err) = sink.write_block(&pcm, MediaTime { pts, duration: end - pts }) {
            log::error!("sink write failed: {err}");
            result = Err(err);
            break;
        }
        total_samples += read as u64;
        bytes.store(sink.bytes_written(), Ordering::SeqCst);
    }

    match sink.finalize() {
        Ok(()) => result,
        Err(err) => result.and(Err(err)),
    }
}
