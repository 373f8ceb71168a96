//! Built-in container sinks: RIFF/WAVE and headerless PCM.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::error::RecordError;
use crate::models::format::DeviceFormat;
use crate::processing::wav;
use crate::traits::codec_sink::{CodecSink, MediaTime};

/// Sinks run at 10 MHz ticks, matching common media pipelines.
pub const MEDIA_TIMEBASE: u32 = 10_000_000;

/// WAV file sink.
///
/// `open` writes a provisional 44-byte header with zero sizes;
/// `finalize` seeks back and patches the RIFF and `data` chunk sizes
/// once the final byte count is known.
pub struct WavSink {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    file: Option<File>,
    data_bytes: u64,
}

impl WavSink {
    pub fn new(path: &Path, format: &DeviceFormat) -> Self {
        Self {
            path: path.to_path_buf(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            file: None,
            data_bytes: 0,
        }
    }
}

impl CodecSink for WavSink {
    fn open(&mut self) -> Result<(), RecordError> {
        let mut file = File::create(&self.path).map_err(RecordError::storage)?;
        let header = wav::pcm_header(self.sample_rate, self.channels, 16, 0);
        file.write_all(&header).map_err(RecordError::storage)?;
        self.file = Some(file);
        Ok(())
    }

    fn timebase(&self) -> u32 {
        MEDIA_TIMEBASE
    }

    fn write_block(&mut self, pcm: &[u8], _time: MediaTime) -> Result<(), RecordError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RecordError::InvalidState("wav sink not open".into()))?;
        file.write_all(pcm).map_err(RecordError::storage)?;
        self.data_bytes += pcm.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RecordError> {
        if let Some(mut file) = self.file.take() {
            wav::patch_sizes(&mut file, self.data_bytes).map_err(RecordError::storage)?;
            file.flush().map_err(RecordError::storage)?;
        }
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.data_bytes
    }
}

/// Headerless 16-bit PCM sink, for hosts that do their own framing.
pub struct RawPcmSink {
    path: PathBuf,
    file: Option<File>,
    data_bytes: u64,
}

impl RawPcmSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
            data_bytes: 0,
        }
    }
}

impl CodecSink for RawPcmSink {
    fn open(&mut self) -> Result<(), RecordError> {
        self.file = Some(File::create(&self.path).map_err(RecordError::storage)?);
        Ok(())
    }

    fn timebase(&self) -> u32 {
        MEDIA_TIMEBASE
    }

    fn write_block(&mut self, pcm: &[u8], _time: MediaTime) -> Result<(), RecordError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RecordError::InvalidState("pcm sink not open".into()))?;
        file.write_all(pcm).map_err(RecordError::storage)?;
        self.data_bytes += pcm.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), RecordError> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(RecordError::storage)?;
        }
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.data_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("record-sink-{}-{}", std::process::id(), name))
    }

    #[test]
    fn wav_sink_patches_header_on_finalize() {
        let path = temp_path("patch.wav");
        let format = DeviceFormat::int16(44100, 2);
        let mut sink = WavSink::new(&path, &format);
        sink.open().unwrap();
        let block = vec![0u8; 1000];
        sink.write_block(&block, MediaTime { pts: 0, duration: 0 }).unwrap();
        sink.finalize().unwrap();

        let mut bytes = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes.len(), wav::WAV_HEADER_LEN + 1000);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1036);
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 1000);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn raw_pcm_sink_is_headerless() {
        let path = temp_path("raw.pcm");
        let mut sink = RawPcmSink::new(&path);
        sink.open().unwrap();
        sink.write_block(&[1, 2, 3, 4], MediaTime { pts: 0, duration: 0 })
            .unwrap();
        sink.finalize().unwrap();
        assert_eq!(sink.bytes_written(), 4);

        let mut bytes = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn write_before_open_is_rejected() {
        let format = DeviceFormat::int16(44100, 2);
        let mut sink = WavSink::new(&temp_path("unopened.wav"), &format);
        let err = sink
            .write_block(&[0, 0], MediaTime { pts: 0, duration: 0 })
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidState(_)));
    }
}
