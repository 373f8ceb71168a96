//! cpal-backed capture endpoint.

use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::{bounded, Receiver, Sender};

use record_core::{
    CaptureDevice, DeviceBuffer, DeviceFormat, FormatSupport, RecordError, SampleRepr,
};

/// Buffers queued between the cpal callback and `next_buffer` before
/// the oldest ones are dropped.
const QUEUE_DEPTH: usize = 32;

/// A capture endpoint on top of a [`cpal::Device`].
///
/// The stream is created in `open` and lives until `stop`; both run on
/// the acquisition thread that owns this device after negotiation.
pub struct CpalCaptureDevice {
    device: cpal::Device,
    stream: Option<Stream>,
    rx: Option<Receiver<Vec<u8>>>,
}

// SAFETY: the stream is `None` while the device is handed from the
// control thread to the acquisition thread; it is created, used and
// dropped exclusively on that thread afterwards. The bare device
// handle itself is movable between threads.
unsafe impl Send for CpalCaptureDevice {}

impl CpalCaptureDevice {
    pub(crate) fn new(device: cpal::Device) -> Self {
        Self {
            device,
            stream: None,
            rx: None,
        }
    }

    fn supported_ranges(&self) -> Result<Vec<SupportedStreamConfigRange>, RecordError> {
        self.device
            .supported_input_configs()
            .map(|iter| iter.collect())
            .map_err(|e| RecordError::DeviceNotAvailable(e.to_string()))
    }

    /// Ranges matching the profile's channel count and sample type.
    fn matching_ranges(
        ranges: &[SupportedStreamConfigRange],
        requested: &DeviceFormat,
    ) -> Vec<SupportedStreamConfigRange> {
        let wanted = match requested.repr {
            SampleRepr::Float => cpal::SampleFormat::F32,
            SampleRepr::Int => cpal::SampleFormat::I16,
        };
        ranges
            .iter()
            .filter(|r| r.channels() == requested.channels && r.sample_format() == wanted)
            .cloned()
            .collect()
    }
}

impl CaptureDevice for CpalCaptureDevice {
    fn probe_format(&self, requested: &DeviceFormat) -> Result<FormatSupport, RecordError> {
        let ranges = self.supported_ranges()?;
        let matching = Self::matching_ranges(&ranges, requested);
        if matching.is_empty() {
            return Ok(FormatSupport::Unsupported);
        }

        let rate = requested.sample_rate;
        let mut best: Option<u32> = None;
        for range in &matching {
            let (min, max) = (range.min_sample_rate().0, range.max_sample_rate().0);
            if (min..=max).contains(&rate) {
                return Ok(FormatSupport::Exact);
            }
            let clamped = rate.clamp(min, max);
            let better = match best {
                Some(current) => clamped.abs_diff(rate) < current.abs_diff(rate),
                None => true,
            };
            if better {
                best = Some(clamped);
            }
        }

        let closest = DeviceFormat {
            sample_rate: best.unwrap_or(rate),
            ..*requested
        };
        Ok(FormatSupport::Closest(closest))
    }

    fn native_format(&self) -> Result<DeviceFormat, RecordError> {
        let config = self
            .device
            .default_input_config()
            .map_err(|e| RecordError::FormatUnsupported(e.to_string()))?;
        let rate = config.sample_rate().0;
        let channels = config.channels();
        Ok(match config.sample_format() {
            cpal::SampleFormat::F32 => DeviceFormat::float(rate, channels),
            // Everything else is delivered through the 16-bit callback.
            _ => DeviceFormat::int16(rate, channels),
        })
    }

    fn open(&mut self, format: &DeviceFormat) -> Result<(), RecordError> {
        if self.stream.is_some() {
            return Err(RecordError::InvalidState("stream already open".into()));
        }

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        // Pick the concrete cpal sample type for the negotiated
        // rate/channels, preferring one that matches the negotiated
        // representation so no callback-side conversion is needed.
        let ranges = self.supported_ranges()?;
        let covering: Vec<_> = ranges
            .iter()
            .filter(|r| {
                r.channels() == format.channels
                    && r.min_sample_rate().0 <= format.sample_rate
                    && format.sample_rate <= r.max_sample_rate().0
            })
            .collect();
        let wanted = match format.repr {
            SampleRepr::Float => cpal::SampleFormat::F32,
            SampleRepr::Int => cpal::SampleFormat::I16,
        };
        let sample_format = covering
            .iter()
            .find(|r| r.sample_format() == wanted)
            .or_else(|| {
                covering.iter().find(|r| {
                    matches!(
                        r.sample_format(),
                        cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
                    )
                })
            })
            .map(|r| r.sample_format())
            .ok_or_else(|| {
                RecordError::FormatUnsupported(format!(
                    "no input config for {} Hz, {} ch",
                    format.sample_rate, format.channels
                ))
            })?;

        let (tx, rx) = bounded(QUEUE_DEPTH);
        let stream = build_stream(&self.device, &config, sample_format, format.repr, tx)?;
        self.stream = Some(stream);
        self.rx = Some(rx);
        Ok(())
    }

    fn start(&mut self) -> Result<(), RecordError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| RecordError::InvalidState("stream not open".into()))?;
        stream
            .play()
            .map_err(|e| RecordError::DeviceNotAvailable(e.to_string()))
    }

    fn pause(&mut self) -> Result<(), RecordError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| RecordError::InvalidState("stream not open".into()))?;
        stream
            .pause()
            .map_err(|e| RecordError::DeviceNotAvailable(e.to_string()))
    }

    fn resume(&mut self) -> Result<(), RecordError> {
        self.start()
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            drop(stream);
        }
        self.rx = None;
        Ok(())
    }

    fn next_buffer(&mut self, timeout: Duration) -> Result<Option<DeviceBuffer>, RecordError> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| RecordError::InvalidState("stream not open".into()))?;
        match rx.recv_timeout(timeout) {
            Ok(bytes) => Ok(Some(DeviceBuffer {
                bytes,
                silent: false,
            })),
            Err(_) => Ok(None),
        }
    }
}

// The stream's wire type and the negotiated representation can differ
// when `open` falls back to whatever sample type the device offers.
// These converters always emit bytes in the negotiated representation,
// which is what the consumer decodes with.

fn f32_to_wire(data: &[f32], repr: SampleRepr) -> Vec<u8> {
    match repr {
        SampleRepr::Float => data.iter().flat_map(|s| s.to_le_bytes()).collect(),
        SampleRepr::Int => data
            .iter()
            .flat_map(|s| ((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes())
            .collect(),
    }
}

fn i16_to_wire(data: &[i16], repr: SampleRepr) -> Vec<u8> {
    match repr {
        SampleRepr::Int => data.iter().flat_map(|s| s.to_le_bytes()).collect(),
        SampleRepr::Float => data
            .iter()
            .flat_map(|&s| (s as f32 / 32768.0).to_le_bytes())
            .collect(),
    }
}

fn u16_to_wire(data: &[u16], repr: SampleRepr) -> Vec<u8> {
    match repr {
        SampleRepr::Int => data
            .iter()
            .flat_map(|&s| ((s as i32 - 32768) as i16).to_le_bytes())
            .collect(),
        SampleRepr::Float => data
            .iter()
            .flat_map(|&s| ((s as i32 - 32768) as f32 / 32768.0).to_le_bytes())
            .collect(),
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: cpal::SampleFormat,
    repr: SampleRepr,
    tx: Sender<Vec<u8>>,
) -> Result<Stream, RecordError> {
    let on_error = |err: cpal::StreamError| {
        log::error!("input stream error: {err}");
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // try_send: the callback must never block on a slow consumer.
                let _ = tx.try_send(f32_to_wire(data, repr));
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let _ = tx.try_send(i16_to_wire(data, repr));
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let _ = tx.try_send(u16_to_wire(data, repr));
            },
            on_error,
            None,
        ),
        other => {
            return Err(RecordError::FormatUnsupported(format!(
                "unsupported sample format {other:?}"
            )))
        }
    };

    stream.map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            RecordError::DeviceNotAvailable("device disconnected".into())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            RecordError::FormatUnsupported("stream config not supported".into())
        }
        other => RecordError::EndpointCreateFailed(other.to_string()),
    })
}
