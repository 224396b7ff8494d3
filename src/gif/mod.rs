//! Animated GIF demuxer, frame compositor, and player.
//!
//! Supports GIF87a/GIF89a with global and local color tables, Graphic
//! Control / Comment / Application / Plain Text extensions, transparency,
//! interlacing, and per-frame disposal. Colors are composited as packed
//! `0xRRGGBB` values through the framebuffer's own format, so the same
//! stream can play into any pixel packing.

mod lzw;

use alloc::boxed::Box;
use enough::Stop;

use crate::framebuf::FrameBuffer;
use crate::info::{ImageInfo, SourceFormat};
use crate::io::ReadSource;
use crate::limits::Limits;
use crate::FramebufError;

use lzw::{read_sub_block, Lzw};

// Block introducers and extension labels.
const INTRO_IMAGE: u8 = 0x2C;
const INTRO_EXTENSION: u8 = 0x21;
const INTRO_TRAILER: u8 = 0x3B;
const EXT_PLAIN_TEXT: u8 = 0x01;
const EXT_GRAPHIC_CONTROL: u8 = 0xF9;
const EXT_COMMENT: u8 = 0xFE;
const EXT_APPLICATION: u8 = 0xFF;

const INTERLACE_STEP: [i32; 4] = [8, 8, 4, 2];
const INTERLACE_START: [i32; 4] = [0, 4, 2, 1];

/// Host hooks for GIF playback: the delay primitive and an optional
/// per-frame callback.
pub trait GifHooks {
    /// Sleep for `ms` milliseconds. Called in 10 ms ticks between frames.
    fn sleep_ms(&mut self, ms: u32);

    /// Invoked after each frame is composited, before the inter-frame sleep.
    fn frame_done(&mut self) {}
}

/// Hooks that skip inter-frame delays entirely (decode as fast as possible).
#[derive(Debug, Default)]
pub struct NoDelay;

impl GifHooks for NoDelay {
    fn sleep_ms(&mut self, _ms: u32) {}
}

/// Hooks that sleep on the current thread.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct ThreadSleep;

#[cfg(feature = "std")]
impl GifHooks for ThreadSleep {
    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(core::time::Duration::from_millis(u64::from(ms)));
    }
}

/// GIF logical screen descriptor.
#[derive(Clone, Copy, Debug, Default)]
struct LogicalScreen {
    width: u16,
    height: u16,
    flags: u8,
    bg_index: u8,
}

/// GIF image (frame) descriptor.
#[derive(Clone, Copy, Debug, Default)]
struct ImageDescriptor {
    xoff: u16,
    yoff: u16,
    width: u16,
    height: u16,
    flags: u8,
}

impl ImageDescriptor {
    fn read<R: ReadSource + ?Sized>(reader: &mut R) -> Result<Self, FramebufError> {
        let mut raw = [0u8; 9];
        reader.read_exact(&mut raw)?;
        Ok(Self {
            xoff: u16::from_le_bytes([raw[0], raw[1]]),
            yoff: u16::from_le_bytes([raw[2], raw[3]]),
            width: u16::from_le_bytes([raw[4], raw[5]]),
            height: u16::from_le_bytes([raw[6], raw[7]]),
            flags: raw[8],
        })
    }

    fn has_local_table(&self) -> bool {
        self.flags & 0x80 != 0
    }

    fn interlaced(&self) -> bool {
        self.flags & 0x40 != 0
    }
}

/// Decode state scoped to one playback.
struct GifState {
    screen: LogicalScreen,
    /// Active color table, packed 0xRRGGBB.
    color_table: Box<[u32; 256]>,
    /// Snapshot of the global table, restored after frames with a local one.
    backup_table: Box<[u32; 256]>,
    /// Entry count of the global table; the palette range check keeps using
    /// it while a local table is loaded.
    num_colors: u16,
    /// Inter-frame delay in centiseconds, from the last Graphic Control.
    delay: u16,
    descriptor: ImageDescriptor,
    /// Disposal method of the most recently rendered frame.
    prev_disposal: u8,
    lzw: Lzw,
}

impl GifState {
    fn read_color_table<R: ReadSource + ?Sized>(
        &mut self,
        reader: &mut R,
        entries: usize,
    ) -> Result<(), FramebufError> {
        let mut rgb = [0u8; 3];
        for entry in self.color_table.iter_mut().take(entries) {
            reader.read_exact(&mut rgb)?;
            *entry = (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2]);
        }
        Ok(())
    }

    fn save_global_table(&mut self) {
        self.backup_table.copy_from_slice(&self.color_table[..]);
    }

    fn restore_global_table(&mut self) {
        self.color_table.copy_from_slice(&self.backup_table[..]);
    }

    fn background_color(&self) -> u32 {
        self.color_table[usize::from(self.screen.bg_index)]
    }
}

/// Check the 6-byte signature: "GIF87a" or "GIF89a".
fn check_header<R: ReadSource + ?Sized>(reader: &mut R) -> Result<(), FramebufError> {
    let mut sig = [0u8; 6];
    reader.read_exact(&mut sig)?;
    if &sig[..4] != b"GIF8" || (sig[4] != b'7' && sig[4] != b'9') || sig[5] != b'a' {
        return Err(FramebufError::InvalidHeader("bad GIF signature".into()));
    }
    Ok(())
}

fn read_logical_screen<R: ReadSource + ?Sized>(
    reader: &mut R,
) -> Result<LogicalScreen, FramebufError> {
    let mut raw = [0u8; 7];
    reader.read_exact(&mut raw)?;
    Ok(LogicalScreen {
        width: u16::from_le_bytes([raw[0], raw[1]]),
        height: u16::from_le_bytes([raw[2], raw[3]]),
        flags: raw[4],
        bg_index: raw[5],
        // raw[6] is the pixel aspect ratio, ignored.
    })
}

/// Probe a GIF header for image metadata without decoding any frame.
pub fn probe<R: ReadSource + ?Sized>(reader: &mut R) -> Result<ImageInfo, FramebufError> {
    check_header(reader)?;
    let screen = read_logical_screen(reader)?;
    Ok(ImageInfo {
        width: u32::from(screen.width),
        height: u32::from(screen.height),
        format: SourceFormat::Gif,
    })
}

/// Skip data sub-blocks up to and including the terminator.
fn skip_sub_blocks<R: ReadSource + ?Sized>(reader: &mut R) -> Result<(), FramebufError> {
    loop {
        let len = reader.read_byte()?;
        if len == 0 {
            return Ok(());
        }
        let pos = reader.tell()?;
        reader.seek(pos + u64::from(len))?;
    }
}

enum FrameOutcome {
    Frame,
    Trailer,
}

pub(crate) fn load<R: ReadSource + ?Sized>(
    fb: &mut FrameBuffer<'_>,
    reader: &mut R,
    x0: i32,
    y0: i32,
    hooks: &mut dyn GifHooks,
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<(), FramebufError> {
    check_header(reader)?;
    let screen = read_logical_screen(reader)?;
    if let Some(limits) = limits {
        limits.check(u32::from(screen.width), u32::from(screen.height))?;
    }

    let mut gif = GifState {
        screen,
        color_table: Box::new([0; 256]),
        backup_table: Box::new([0; 256]),
        num_colors: 0,
        delay: 0,
        descriptor: ImageDescriptor::default(),
        prev_disposal: 0,
        lzw: Lzw::new(0),
    };
    if screen.flags & 0x80 != 0 {
        let entries = 2usize << (screen.flags & 0x07);
        gif.num_colors = entries as u16;
        gif.read_color_table(reader, entries)?;
    }

    let mut frames: u64 = 0;
    loop {
        if stop.check().is_err() {
            return Ok(());
        }
        match draw_frame(fb, reader, &mut gif, x0, y0)? {
            FrameOutcome::Trailer => return Ok(()),
            FrameOutcome::Frame => {
                frames += 1;
                if let Some(limits) = limits {
                    limits.check_frames(frames)?;
                }
                hooks.frame_done();
                if gif.descriptor.has_local_table() {
                    gif.restore_global_table();
                }
                let ticks = if gif.delay != 0 { gif.delay } else { 10 };
                for _ in 0..ticks {
                    if stop.check().is_err() {
                        return Ok(());
                    }
                    hooks.sleep_ms(10);
                }
            }
        }
    }
}

/// Consume blocks until one frame has been rendered or the trailer is
/// reached.
fn draw_frame<R: ReadSource + ?Sized>(
    fb: &mut FrameBuffer<'_>,
    reader: &mut R,
    gif: &mut GifState,
    x0: i32,
    y0: i32,
) -> Result<FrameOutcome, FramebufError> {
    let mut transparent: i32 = -1;
    let mut disposal: u8 = 0;
    loop {
        let introducer = reader.read_byte()?;
        match introducer {
            INTRO_IMAGE => {
                let prev = gif.descriptor;
                gif.descriptor = ImageDescriptor::read(reader)?;
                if gif.descriptor.has_local_table() {
                    gif.save_global_table();
                    let entries = 2usize << (gif.descriptor.flags & 0x07);
                    gif.read_color_table(reader, entries)?;
                }
                if gif.prev_disposal == 2 {
                    clear_to_background(fb, gif, x0, y0, &prev);
                }
                let frame_x = x0 + i32::from(gif.descriptor.xoff);
                let frame_y = y0 + i32::from(gif.descriptor.yoff);
                render_frame(fb, reader, gif, frame_x, frame_y, transparent, disposal)?;
                gif.prev_disposal = disposal;
                skip_sub_blocks(reader)?;
                return Ok(FrameOutcome::Frame);
            }
            INTRO_EXTENSION => read_extension(reader, gif, &mut transparent, &mut disposal)?,
            INTRO_TRAILER => return Ok(FrameOutcome::Trailer),
            other => {
                return Err(FramebufError::InvalidData(alloc::format!(
                    "unexpected block introducer {other:#04x}"
                )))
            }
        }
    }
}

fn read_extension<R: ReadSource + ?Sized>(
    reader: &mut R,
    gif: &mut GifState,
    transparent: &mut i32,
    disposal: &mut u8,
) -> Result<(), FramebufError> {
    let label = reader.read_byte()?;
    match label {
        EXT_PLAIN_TEXT | EXT_APPLICATION | EXT_COMMENT => skip_sub_blocks(reader),
        EXT_GRAPHIC_CONTROL => {
            let mut block = [0u8; 4];
            if read_sub_block(reader, &mut block)? != 4 {
                return Err(FramebufError::InvalidData(
                    "graphic control block must be 4 bytes".into(),
                ));
            }
            gif.delay = u16::from_le_bytes([block[1], block[2]]);
            *disposal = (block[0] >> 2) & 0x7;
            if block[0] & 0x1 != 0 {
                *transparent = i32::from(block[3]);
            }
            if reader.read_byte()? != 0 {
                return Err(FramebufError::InvalidData(
                    "missing graphic control terminator".into(),
                ));
            }
            Ok(())
        }
        other => Err(FramebufError::InvalidData(alloc::format!(
            "unknown extension label {other:#04x}"
        ))),
    }
}

/// Decompress and composite one frame at `(x0, y0)`.
///
/// Identical palette indices along a scanline are run-length merged into a
/// single one-row `fill_rect` per run.
fn render_frame<R: ReadSource + ?Sized>(
    fb: &mut FrameBuffer<'_>,
    reader: &mut R,
    gif: &mut GifState,
    x0: i32,
    y0: i32,
    transparent: i32,
    disposal: u8,
) -> Result<(), FramebufError> {
    let width = i32::from(gif.descriptor.width);
    let height = i32::from(gif.descriptor.height);
    let x_end = width + x0 - 1;
    let bg = gif.background_color();
    let interlaced = gif.descriptor.interlaced();

    let min_code_size = reader.read_byte()?;
    gif.lzw = Lzw::new(min_code_size);

    let mut y_pos = y0;
    let mut pass = 0usize;
    for _ in 0..height {
        let mut run: i32 = 0;
        let mut old_index: i32 = -1;
        let mut x_pos = x0;
        while x_pos <= x_end {
            let index = match gif.lzw.next_index(reader)? {
                Some(index) => i32::from(index),
                None => return Ok(()), // end-of-information code
            };
            if index >= i32::from(gif.num_colors) {
                return Err(FramebufError::InvalidData(
                    "palette index out of range".into(),
                ));
            }
            if index == old_index {
                run += 1;
            } else {
                if run != 0 {
                    if old_index != transparent {
                        fb.fill_rect(
                            x_pos - run - 1,
                            y_pos,
                            run + 1,
                            1,
                            gif.color_table[old_index as usize],
                        );
                    } else if disposal == 2 {
                        // A transparent run under disposal 2 paints its own
                        // palette entry, not the background color.
                        fb.fill_rect(
                            x_pos - run - 1,
                            y_pos,
                            run + 1,
                            1,
                            gif.color_table[old_index as usize],
                        );
                    }
                    run = 0;
                } else if old_index >= 0 {
                    if old_index != transparent {
                        fb.set_pixel(x_pos - 1, y_pos, gif.color_table[old_index as usize]);
                    } else if disposal == 2 {
                        fb.set_pixel(x_pos - 1, y_pos, bg);
                    }
                }
            }
            old_index = index;
            x_pos += 1;
        }
        // Flush the final run of the scanline.
        if old_index != transparent || disposal == 2 {
            let color = if old_index != transparent {
                gif.color_table[old_index as usize]
            } else {
                bg
            };
            if run != 0 {
                fb.fill_rect(x_pos - run - 1, y_pos, run + 1, 1, color);
            } else {
                fb.set_pixel(x_end, y_pos, color);
            }
        }
        if interlaced {
            y_pos += INTERLACE_STEP[pass];
            if y_pos - y0 >= height {
                pass += 1;
                if pass > 3 {
                    break;
                }
                y_pos = INTERLACE_START[pass] + y0;
            }
        } else {
            y_pos += 1;
        }
    }
    Ok(())
}

/// Clear the parts of the previous frame's rectangle not covered by the new
/// frame to the background color, in up to four strips.
fn clear_to_background(
    fb: &mut FrameBuffer<'_>,
    gif: &GifState,
    x: i32,
    y: i32,
    prev: &ImageDescriptor,
) {
    if prev.width == 0 || prev.height == 0 {
        return;
    }
    let color = gif.background_color();
    let cur = &gif.descriptor;
    let (px, py) = (i32::from(prev.xoff), i32::from(prev.yoff));
    let (pw, ph) = (i32::from(prev.width), i32::from(prev.height));
    let (cx, cy) = (i32::from(cur.xoff), i32::from(cur.yoff));
    let (cw, ch) = (i32::from(cur.width), i32::from(cur.height));

    let mut strip = |x0: i32, y0: i32, x1: i32, y1: i32| {
        if x0 < x1 && y0 < y1 {
            fb.fill_rect(x0, y0, x1 - x0 + 1, y1 - y0 + 1, color);
        }
    };

    if cy > py {
        strip(x + px, y + py, x + px + pw - 1, y + cy - 1);
    }
    if cx > px {
        strip(x + px, y + py, x + cx - 1, y + py + ph - 1);
    }
    if cy + ch < py + ph {
        strip(x + px, y + cy + ch - 1, x + px + pw - 1, y + py + ph - 1);
    }
    if cx + cw < px + pw {
        strip(x + cx + cw - 1, y + py, x + px + pw - 1, y + py + ph - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceReader;

    #[test]
    fn header_accepts_both_versions() {
        let mut r = SliceReader::new(b"GIF87a");
        check_header(&mut r).unwrap();
        let mut r = SliceReader::new(b"GIF89a");
        check_header(&mut r).unwrap();
        let mut r = SliceReader::new(b"GIF88a");
        assert!(check_header(&mut r).is_err());
        let mut r = SliceReader::new(b"NOTGIF");
        assert!(check_header(&mut r).is_err());
    }

    #[test]
    fn logical_screen_fields() {
        let raw = [0x40, 0x01, 0xF0, 0x00, 0x91, 0x02, 0x00];
        let mut r = SliceReader::new(&raw);
        let screen = read_logical_screen(&mut r).unwrap();
        assert_eq!(screen.width, 320);
        assert_eq!(screen.height, 240);
        assert_eq!(screen.flags, 0x91);
        assert_eq!(screen.bg_index, 2);
    }
}
