//! Streamed BMP loader.
//!
//! Decodes uncompressed 24-bpp and 32-bpp Windows bitmaps bottom-up through
//! a 4 KiB refill buffer, painting clipped pixels straight into the
//! framebuffer. Alpha bytes of 32-bpp files are discarded. Row padding to
//! 4-byte boundaries is not honored: rows are treated as densely packed, so
//! files whose row size is not a multiple of 4 bytes decode skewed.

use enough::Stop;

use crate::framebuf::FrameBuffer;
use crate::info::{ImageInfo, SourceFormat};
use crate::io::ReadSource;
use crate::limits::Limits;
use crate::FramebufError;

/// Refill buffer size for streamed decoding.
const BUF_SIZE: usize = 4096;

/// BITMAPFILEHEADER (14 bytes) + BITMAPINFOHEADER minimum (40 bytes).
const HEADER_SIZE: usize = 54;

struct BmpHeader {
    data_offset: u32,
    bit_count: u16,
    width: u32,
    height: u32,
}

fn le_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn le_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn parse_header(buf: &[u8]) -> Result<BmpHeader, FramebufError> {
    if buf.len() < HEADER_SIZE {
        return Err(FramebufError::InvalidHeader(alloc::format!(
            "BMP header truncated at {} bytes",
            buf.len()
        )));
    }
    if buf[0] != b'B' || buf[1] != b'M' {
        return Err(FramebufError::InvalidHeader("bad BMP magic".into()));
    }
    let width = le_u32(buf, 18) as i32;
    let height = le_u32(buf, 22) as i32;
    if width <= 0 || height == 0 {
        return Err(FramebufError::InvalidHeader(alloc::format!(
            "bad BMP dimensions {width}x{height}"
        )));
    }
    if height < 0 {
        return Err(FramebufError::UnsupportedVariant(
            "top-down BMP not supported".into(),
        ));
    }
    Ok(BmpHeader {
        data_offset: le_u32(buf, 10),
        bit_count: le_u16(buf, 28),
        width: width as u32,
        height: height as u32,
    })
}

/// Probe a BMP header for image metadata without decoding pixels.
pub fn probe<R: ReadSource + ?Sized>(reader: &mut R) -> Result<ImageInfo, FramebufError> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let header = parse_header(&header)?;
    Ok(ImageInfo {
        width: header.width,
        height: header.height,
        format: SourceFormat::Bmp,
    })
}

pub(crate) fn load<R: ReadSource + ?Sized>(
    fb: &mut FrameBuffer<'_>,
    reader: &mut R,
    x0: i32,
    y0: i32,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<(), FramebufError> {
    let mut databuf = [0u8; BUF_SIZE];
    let mut filled = reader.read(&mut databuf)?;
    let header = parse_header(&databuf[..filled])?;

    if header.bit_count != 24 && header.bit_count != 32 {
        return Err(FramebufError::UnsupportedVariant(alloc::format!(
            "only 24/32-bit BMP supported, got {}-bit",
            header.bit_count
        )));
    }
    if let Some(limits) = limits {
        limits.check(header.width, header.height)?;
    }

    let bytes_per_pixel = u32::from(header.bit_count / 8);
    let row_bytes = u64::from(header.width) * u64::from(bytes_per_pixel);

    // Pixel rows are stored bottom-up: the first decoded row lands at the
    // largest y and the counter walks toward the top.
    let mut x = 0u32;
    let mut y = header.height;
    let mut phase = 0u32; // byte within pixel: 0 = B, 1 = G, 2 = R, 3 = discarded A
    let mut color = 0u32;
    let mut row_count = 0u64;
    let mut cursor = header.data_offset as usize;

    'decode: loop {
        while cursor < filled {
            let byte = u32::from(databuf[cursor]);
            match phase {
                0 => color = byte,
                1 => color |= byte << 8,
                2 => color |= byte << 16,
                _ => {} // alpha channel, discarded
            }
            phase += 1;
            cursor += 1;
            if phase == bytes_per_pixel {
                if x < header.width {
                    fb.set_pixel(
                        x0.saturating_add(x as i32),
                        y0.saturating_add(y as i32),
                        color,
                    );
                }
                x += 1;
                color = 0;
                phase = 0;
            }
            row_count += 1;
            if row_count >= row_bytes {
                y -= 1;
                if y == 0 {
                    break 'decode;
                }
                x = 0;
                row_count = 0;
                color = 0;
                phase = 0;
            }
        }
        stop.check()?;
        let n = reader.read(&mut databuf)?;
        if n == 0 {
            break;
        }
        filled = n;
        cursor = 0;
    }
    Ok(())
}
