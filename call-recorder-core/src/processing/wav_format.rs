//! RIFF/WAV header layout for PCM output.
//!
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    file size - 8 (36 + data_size)
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
//! [32-33]  block_align = channels * bits_per_sample / 8
//! [34-35]  bits_per_sample
//! [36-39]  "data"
//! [40-43]  data_size
//! ```

use std::io::{self, Seek, SeekFrom, Write};

use crate::traits::codec::MediaFormat;

pub const WAV_HEADER_SIZE: usize = 44;

/// Largest data chunk a RIFF header can describe.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - (WAV_HEADER_SIZE as u64 - 8);

const RIFF_SIZE_OFFSET: u64 = 4;
const DATA_SIZE_OFFSET: u64 = 40;

fn riff_size(data_size: u64) -> u32 {
    (data_size.min(MAX_DATA_SIZE) + WAV_HEADER_SIZE as u64 - 8) as u32
}

/// Build the header for `format`. Sizes beyond the RIFF limit are clamped.
pub fn header(format: &MediaFormat, data_size: u64) -> [u8; WAV_HEADER_SIZE] {
    let block_align = format.channels * format.bits_per_sample / 8;
    let byte_rate = format.sample_rate.saturating_mul(u32::from(block_align));

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size(data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&(data_size.min(MAX_DATA_SIZE) as u32).to_le_bytes());

    header
}

/// Rewrite both size fields of a WAV stream in place and seek back to its end.
pub fn patch_sizes<W: Write + Seek + ?Sized>(out: &mut W, data_size: u64) -> io::Result<()> {
    if data_size > MAX_DATA_SIZE {
        log::warn!("WAV data size {} exceeds the RIFF limit; header will be clamped", data_size);
    }
    out.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
    out.write_all(&riff_size(data_size).to_le_bytes())?;
    out.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
    out.write_all(&(data_size.min(MAX_DATA_SIZE) as u32).to_le_bytes())?;
    out.seek(SeekFrom::End(0))?;
    Ok(())
}
