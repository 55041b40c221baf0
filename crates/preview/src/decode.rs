use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;
use zune_jpeg::zune_core::colorspace::ColorSpace;
use zune_jpeg::zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

use crate::DecodeError;

/// Decoded image in BGRX order, 4 bytes per pixel, rows packed top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub bgrx: Vec<u8>,
}

impl PixelBuffer {
    pub const BYTES_PER_PIXEL: usize = 4;

    pub fn bytes_per_row(&self) -> usize { self.width as usize * Self::BYTES_PER_PIXEL }

    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.bytes_per_row();
        let start = y as usize * stride;
        &self.bgrx[start..start + stride]
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = x as usize * Self::BYTES_PER_PIXEL;
        let row = self.row(y);
        [row[i], row[i + 1], row[i + 2], row[i + 3]]
    }
}

/// Read `path` and decode it as a JPEG.
pub fn decode_jpeg_file(path: &Path) -> Result<PixelBuffer, DecodeError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(DecodeError::FileNotFound(path.to_path_buf())),
        Err(source) => return Err(DecodeError::Io { path: path.to_path_buf(), source }),
    };
    if bytes.is_empty() {
        return Err(DecodeError::EmptyFile(path.to_path_buf()));
    }
    let pixels = decode_jpeg(&bytes)?;
    debug!("decoded {} ({}x{})", path.display(), pixels.width, pixels.height);
    Ok(pixels)
}

/// Decode an in-memory JPEG into BGRX pixels at its native size.
///
/// Decoding is strict: a truncated scan or damaged entropy data is an error
/// instead of a partially filled image.
pub fn decode_jpeg(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    let options = DecoderOptions::default().set_strict_mode(true);
    let mut decoder = JpegDecoder::new_with_options(bytes, options);
    decoder.decode_headers().map_err(|e| DecodeError::Header(format!("{e:?}")))?;
    let (width, height) = decoder.dimensions().ok_or_else(|| DecodeError::Header("no frame header".into()))?;
    let color = decoder.get_output_colorspace().ok_or_else(|| DecodeError::Header("no colour space".into()))?;
    let channels = match color {
        ColorSpace::Luma => 1,
        ColorSpace::RGB => 3,
        ColorSpace::RGBA => 4,
        other => return Err(DecodeError::UnsupportedColor(format!("{other:?}"))),
    };
    let (width, height) = (width as u32, height as u32);

    let pixels = (width as u64).checked_mul(height as u64);
    let bgrx_len = pixels
        .and_then(|px| px.checked_mul(PixelBuffer::BYTES_PER_PIXEL as u64))
        .ok_or(DecodeError::Allocation { width, height, bytes: u64::MAX })?;
    let raw_len = pixels
        .and_then(|px| px.checked_mul(channels as u64))
        .ok_or(DecodeError::Allocation { width, height, bytes: u64::MAX })?;
    let mut raw = alloc_zeroed(raw_len, width, height)?;
    decoder.decode_into(&mut raw).map_err(|e| DecodeError::Corrupt(format!("{e:?}")))?;
    if !has_end_marker(bytes) {
        return Err(DecodeError::Corrupt("missing end of image marker".into()));
    }

    let mut bgrx = alloc_zeroed(bgrx_len, width, height)?;
    for (dst, src) in bgrx.chunks_exact_mut(PixelBuffer::BYTES_PER_PIXEL).zip(raw.chunks_exact(channels)) {
        match *src {
            [l] => dst.copy_from_slice(&[l, l, l, 0xFF]),
            [r, g, b] | [r, g, b, _] => dst.copy_from_slice(&[b, g, r, 0xFF]),
            _ => unreachable!("chunk size is the channel count"),
        }
    }
    Ok(PixelBuffer { width, height, bgrx })
}

/// Scan data never contains 0xFF 0xD9 (0xFF bytes are stuffed), so a file cut
/// short has no EOI marker after its frame.
fn has_end_marker(bytes: &[u8]) -> bool {
    bytes.windows(2).skip(2).any(|w| w == [0xFF, 0xD9])
}

fn alloc_zeroed(bytes: u64, width: u32, height: u32) -> Result<Vec<u8>, DecodeError> {
    let err = || DecodeError::Allocation { width, height, bytes };
    let len = usize::try_from(bytes).map_err(|_| err())?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| err())?;
    buf.resize(len, 0);
    Ok(buf)
}
