use crate::models::error::RecordError;

/// Presentation timing for one written block, in the sink's time base.
///
/// Derived from running sample totals, never wall-clock time, so output
/// duration is exact regardless of thread scheduling jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTime {
    pub pts: u64,
    pub duration: u64,
}

/// A container/codec backend receiving encoded blocks from the writer
/// thread.
///
/// Built-in implementations cover the uncompressed PCM containers;
/// compressed codecs (OS codec services, external encoders) plug in
/// through the same seam.
pub trait CodecSink: Send {
    /// Open the destination and write any provisional header.
    fn open(&mut self) -> Result<(), RecordError>;

    /// Ticks per second of the `MediaTime` values this sink expects.
    fn timebase(&self) -> u32;

    /// Write one block of 16-bit little-endian PCM with its timing.
    fn write_block(&mut self, pcm: &[u8], time: MediaTime) -> Result<(), RecordError>;

    /// Patch headers with final counts and close the destination.
    fn finalize(&mut self) -> Result<(), RecordError>;

    /// Payload bytes written so far (headers excluded).
    fn bytes_written(&self) -> u64;
}
