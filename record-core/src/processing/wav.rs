//! RIFF/WAVE container header generation and in-place patching.
//!
//! The writer emits a provisional 44-byte header with zeroed size
//! fields when the file opens, then patches the RIFF chunk size and
//! data chunk size once the final byte count is known.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

/// Size of the standard PCM WAV header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// Byte offset of the RIFF chunk size field.
const RIFF_SIZE_OFFSET: u64 = 4;
/// Byte offset of the data chunk size field.
const DATA_SIZE_OFFSET: u64 = 40;

/// Build a 44-byte PCM WAV header.
///
/// Layout:
/// ```text
/// "RIFF" | file size - 8 | "WAVE"
/// "fmt " | 16 | format=1 (PCM) | channels | sample rate
///        | byte rate | block align | bits per sample
/// "data" | data size
/// ```
pub fn pcm_header(sample_rate: u32, channels: u16, bits_per_sample: u16, data_len: u32) -> [u8; WAV_HEADER_LEN] {
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = [0u8; WAV_HEADER_LEN];
    let mut cursor = io::Cursor::new(&mut header[..]);

    // Infallible: the cursor is backed by a fixed array of exactly
    // WAV_HEADER_LEN bytes.
    let _ = cursor.write_all(b"RIFF");
    let _ = cursor.write_all(&(36 + data_len).to_le_bytes());
    let _ = cursor.write_all(b"WAVE");
    let _ = cursor.write_all(b"fmt ");
    let _ = cursor.write_all(&16u32.to_le_bytes());
    let _ = cursor.write_all(&1u16.to_le_bytes());
    let _ = cursor.write_all(&channels.to_le_bytes());
    let _ = cursor.write_all(&sample_rate.to_le_bytes());
    let _ = cursor.write_all(&byte_rate.to_le_bytes());
    let _ = cursor.write_all(&block_align.to_le_bytes());
    let _ = cursor.write_all(&bits_per_sample.to_le_bytes());
    let _ = cursor.write_all(b"data");
    let _ = cursor.write_all(&data_len.to_le_bytes());

    header
}

/// Patch the header size fields of an open WAV file in place.
///
/// Leaves the file cursor at the end of the data so interrupted-write
/// recovery can append if it ever needs to.
pub fn patch_sizes(file: &mut File, data_len: u64) -> io::Result<()> {
    let riff_len = (data_len + 36) as u32;
    let data_len = data_len as u32;

    file.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
    file.write_all(&riff_len.to_le_bytes())?;
    file.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
    file.write_all(&data_len.to_le_bytes())?;
    file.seek(SeekFrom::End(0))?;
    Ok(())
}
