//! The framebuffer object and its drawing primitives.

use enough::Stop;
use font8x8::legacy::BASIC_LEGACY;

use crate::format::PixelFormat;
use crate::gif::GifHooks;
use crate::io::ReadSource;
use crate::limits::Limits;
use crate::{bmp, gif, FramebufError};

/// A 2D pixel view over a caller-owned byte buffer.
///
/// The framebuffer borrows the buffer for its lifetime; it never allocates
/// or frees pixel storage. All drawing operations clip to the framebuffer
/// rectangle and are no-ops on empty intersections.
#[derive(Debug)]
pub struct FrameBuffer<'a> {
    buf: &'a mut [u8],
    width: u16,
    height: u16,
    /// Row stride in pixels, rounded up to the format's alignment.
    stride: u16,
    format: PixelFormat,
}

impl<'a> FrameBuffer<'a> {
    /// Create a framebuffer with stride equal to the width (before rounding).
    pub fn new(
        buf: &'a mut [u8],
        width: u16,
        height: u16,
        format: PixelFormat,
    ) -> Result<Self, FramebufError> {
        Self::new_with_stride(buf, width, height, format, width)
    }

    /// Create a framebuffer with an explicit stride in pixels.
    ///
    /// The stride is rounded up to the format's alignment (multiples of 8
    /// pixels for horizontal mono, 4 for GS2, 2 for GS4). Fails with
    /// `BufferTooSmall` if the buffer cannot hold `stride x height` pixels.
    pub fn new_with_stride(
        buf: &'a mut [u8],
        width: u16,
        height: u16,
        format: PixelFormat,
        stride: u16,
    ) -> Result<Self, FramebufError> {
        let stride = format.round_stride(stride.max(width));
        let needed = format.buffer_len(usize::from(stride), usize::from(height));
        if buf.len() < needed {
            return Err(FramebufError::BufferTooSmall {
                needed,
                actual: buf.len(),
            });
        }
        Ok(Self {
            buf,
            width,
            height,
            stride,
            format,
        })
    }

    /// Legacy constructor for monochrome vertical framebuffers
    /// (the old `FrameBuffer1` shape).
    pub fn mono_vlsb(buf: &'a mut [u8], width: u16, height: u16) -> Result<Self, FramebufError> {
        Self::new(buf, width, height, PixelFormat::MonoVlsb)
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Row stride in pixels (not bytes), after format rounding.
    pub fn stride(&self) -> u16 {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The underlying pixel bytes, exactly the size the format requires.
    pub fn bytes(&self) -> &[u8] {
        let len = self
            .format
            .buffer_len(usize::from(self.stride), usize::from(self.height));
        &self.buf[..len]
    }

    /// Mutable access to the underlying pixel bytes.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self
            .format
            .buffer_len(usize::from(self.stride), usize::from(self.height));
        &mut self.buf[..len]
    }

    /// Fill the whole framebuffer with one color.
    pub fn fill(&mut self, col: u32) {
        self.format.fill_rect(
            self.buf,
            usize::from(self.stride),
            0,
            0,
            usize::from(self.width),
            usize::from(self.height),
            col,
        );
    }

    /// Fill a rectangle, clipped to the framebuffer.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, col: u32) {
        let fb_w = i32::from(self.width);
        let fb_h = i32::from(self.height);
        if h < 1
            || w < 1
            || x.saturating_add(w) <= 0
            || y.saturating_add(h) <= 0
            || y >= fb_h
            || x >= fb_w
        {
            return;
        }
        let xend = fb_w.min(x.saturating_add(w));
        let yend = fb_h.min(y.saturating_add(h));
        let x = x.max(0);
        let y = y.max(0);
        self.format.fill_rect(
            self.buf,
            usize::from(self.stride),
            x as usize,
            y as usize,
            (xend - x) as usize,
            (yend - y) as usize,
            col,
        );
    }

    /// Get the pixel at `(x, y)`, or `None` when out of range.
    ///
    /// Monochrome formats return 0/1, grayscale formats the stored bits, and
    /// RGB565 the stored byte-swapped 16-bit value.
    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(self.format.get_pixel(
            self.buf,
            usize::from(self.stride),
            x as usize,
            y as usize,
        ))
    }

    /// Set the pixel at `(x, y)`; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, col: u32) {
        if self.in_bounds(x, y) {
            self.format.set_pixel(
                self.buf,
                usize::from(self.stride),
                x as usize,
                y as usize,
                col,
            );
        }
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < i32::from(self.width) && y >= 0 && y < i32::from(self.height)
    }

    /// Horizontal line of width `w` starting at `(x, y)`.
    pub fn hline(&mut self, x: i32, y: i32, w: i32, col: u32) {
        self.fill_rect(x, y, w, 1, col);
    }

    /// Vertical line of height `h` starting at `(x, y)`.
    pub fn vline(&mut self, x: i32, y: i32, h: i32, col: u32) {
        self.fill_rect(x, y, 1, h, col);
    }

    /// Rectangle outline.
    pub fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, col: u32) {
        self.fill_rect(x, y, w, 1, col);
        self.fill_rect(x, y.saturating_add(h).saturating_sub(1), w, 1, col);
        self.fill_rect(x, y, 1, h, col);
        self.fill_rect(x.saturating_add(w).saturating_sub(1), y, 1, h, col);
    }

    /// Bresenham line from `(x1, y1)` to `(x2, y2)`.
    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, col: u32) {
        let mut dx = x2 - x1;
        let mut sx = 1;
        if dx <= 0 {
            dx = -dx;
            sx = -1;
        }

        let mut dy = y2 - y1;
        let mut sy = 1;
        if dy <= 0 {
            dy = -dy;
            sy = -1;
        }

        let steep = dy > dx;
        let (mut x, mut y) = (x1, y1);
        if steep {
            core::mem::swap(&mut x, &mut y);
            core::mem::swap(&mut dx, &mut dy);
            core::mem::swap(&mut sx, &mut sy);
        }

        let mut e = 2 * dy - dx;
        for _ in 0..dx {
            if steep {
                self.set_pixel(y, x, col);
            } else {
                self.set_pixel(x, y, col);
            }
            while e >= 0 {
                y += sy;
                e -= 2 * dx;
            }
            x += sx;
            e += 2 * dy;
        }

        self.set_pixel(x2, y2, col);
    }

    /// Midpoint circle centered at `(x0, y0)` with radius `r`, outlined or
    /// filled.
    pub fn circle(&mut self, x0: i32, y0: i32, r: i32, col: u32, fill: bool) {
        let mut f = 1 - r;
        let mut ddf_x = 1;
        let mut ddf_y = -2 * r;
        let mut x = 0;
        let mut y = r;
        if fill {
            self.fill_rect(x0, y0 - r, 1, 2 * r + 1, col);
        }
        while x < y {
            if f >= 0 {
                y -= 1;
                ddf_y += 2;
                f += ddf_y;
            }
            x += 1;
            ddf_x += 2;
            f += ddf_x;
            if fill {
                self.fill_rect(x0 + x, y0 - y, 1, 2 * y + 1, col);
                self.fill_rect(x0 + y, y0 - x, 1, 2 * x + 1, col);
                self.fill_rect(x0 - x, y0 - y, 1, 2 * y + 1, col);
                self.fill_rect(x0 - y, y0 - x, 1, 2 * x + 1, col);
            } else {
                self.set_pixel(x0 + x, y0 + y, col);
                self.set_pixel(x0 - x, y0 + y, col);
                self.set_pixel(x0 + x, y0 - y, col);
                self.set_pixel(x0 - x, y0 - y, col);
                self.set_pixel(x0 + y, y0 + x, col);
                self.set_pixel(x0 - y, y0 + x, col);
                self.set_pixel(x0 + y, y0 - x, col);
                self.set_pixel(x0 - y, y0 - x, col);
            }
        }
    }

    /// Triangle with vertices `(x0, y0)`, `(x1, y1)`, `(x2, y2)`, outlined or
    /// scanline-filled.
    pub fn triangle(
        &mut self,
        mut x0: i32,
        mut y0: i32,
        mut x1: i32,
        mut y1: i32,
        mut x2: i32,
        mut y2: i32,
        col: u32,
        fill: bool,
    ) {
        use core::mem::swap;

        if !fill {
            self.line(x0, y0, x1, y1, col);
            self.line(x1, y1, x2, y2, col);
            self.line(x2, y2, x0, y0, col);
            return;
        }

        // Sort vertices by ascending y.
        if y0 > y1 {
            swap(&mut y0, &mut y1);
            swap(&mut x0, &mut x1);
        }
        if y1 > y2 {
            swap(&mut y2, &mut y1);
            swap(&mut x2, &mut x1);
        }
        if y0 > y1 {
            swap(&mut y0, &mut y1);
            swap(&mut x0, &mut x1);
        }

        if y0 == y2 {
            // All three vertices on one scanline.
            let mut a = x0;
            let mut b = x0;
            if x1 < a {
                a = x1;
            } else if x1 > b {
                b = x1;
            }
            if x2 < a {
                a = x2;
            } else if x2 > b {
                b = x2;
            }
            self.fill_rect(a, y0, b - a + 1, 1, col);
            return;
        }

        let dx01 = x1 - x0;
        let mut dy01 = y1 - y0;
        let dx02 = x2 - x0;
        let mut dy02 = y2 - y0;
        let dx12 = x2 - x1;
        let mut dy12 = y2 - y1;
        if dy01 == 0 {
            dy01 = 1;
        }
        if dy02 == 0 {
            dy02 = 1;
        }
        if dy12 == 0 {
            dy12 = 1;
        }

        let last = if y1 == y2 { y1 } else { y1 - 1 };
        let mut sa = 0;
        let mut sb = 0;
        let mut y = y0;
        while y <= last {
            let mut a = x0 + sa / dy01;
            let mut b = x0 + sb / dy02;
            sa += dx01;
            sb += dx02;
            if a > b {
                swap(&mut a, &mut b);
            }
            self.fill_rect(a, y, b - a + 1, 1, col);
            y += 1;
        }

        sa = dx12 * (y - y1);
        sb = dx02 * (y - y0);
        while y <= y2 {
            let mut a = x1 + sa / dy12;
            let mut b = x0 + sb / dy02;
            sa += dx12;
            sb += dx02;
            if a > b {
                swap(&mut a, &mut b);
            }
            self.fill_rect(a, y, b - a + 1, 1, col);
            y += 1;
        }
    }

    /// Misspelled legacy name for [`triangle`](Self::triangle).
    #[deprecated(note = "use `triangle`")]
    #[allow(clippy::too_many_arguments)]
    pub fn traingle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        col: u32,
        fill: bool,
    ) {
        self.triangle(x0, y0, x1, y1, x2, y2, col, fill);
    }

    /// Draw text with the built-in 8x8 font, 8 pixels per character cell with
    /// no spacing. Bytes outside 32..=127 are drawn as character 127.
    pub fn text(&mut self, s: &str, x: i32, y: i32, col: u32) {
        let mut x0 = x;
        for byte in s.bytes() {
            let ch = if !(32..=127).contains(&byte) { 127 } else { byte };
            let glyph = BASIC_LEGACY[usize::from(ch)];
            for (row, bits) in glyph.iter().enumerate() {
                let mut bits = *bits;
                let mut cx = 0;
                while bits != 0 {
                    if bits & 1 != 0 {
                        self.set_pixel(x0 + cx, y + row as i32, col);
                    }
                    bits >>= 1;
                    cx += 1;
                }
            }
            x0 = x0.saturating_add(8);
        }
    }

    /// Copy `src`'s entire bitmap into `self` at `(x, y)`.
    ///
    /// Pixels are read through `src`'s format and written through `self`'s;
    /// values are not remapped beyond what each format stores. Source pixels
    /// equal to `key` are skipped.
    pub fn blit(&mut self, src: &FrameBuffer<'_>, x: i32, y: i32, key: Option<u32>) {
        let dst_w = i32::from(self.width);
        let dst_h = i32::from(self.height);
        let src_w = i32::from(src.width);
        let src_h = i32::from(src.height);
        if x >= dst_w || y >= dst_h || -x >= src_w || -y >= src_h {
            return;
        }

        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (-x).max(0);
        let mut sy = (-y).max(0);
        let x0end = dst_w.min(x.saturating_add(src_w));
        let y0end = dst_h.min(y.saturating_add(src_h));

        let src_stride = usize::from(src.stride);
        for dy in y0..y0end {
            let mut sx = x1;
            for dx in x0..x0end {
                let col = src
                    .format
                    .get_pixel(src.buf, src_stride, sx as usize, sy as usize);
                if Some(col) != key {
                    self.format.set_pixel(
                        self.buf,
                        usize::from(self.stride),
                        dx as usize,
                        dy as usize,
                        col,
                    );
                }
                sx += 1;
            }
            sy += 1;
        }
    }

    /// Shift the framebuffer contents by `(dx, dy)` pixels in place.
    ///
    /// Vacated pixels keep their previous contents; callers that want them
    /// cleared must clear explicitly. Iteration order is chosen against the
    /// shift direction so reads happen before the writes that would clobber
    /// them.
    pub fn scroll(&mut self, dx: i32, dy: i32) {
        let w = i32::from(self.width);
        let h = i32::from(self.height);
        if dy >= 0 {
            let mut y = h - 1;
            while y >= dy {
                self.scroll_row(y, dx, dy, w);
                y -= 1;
            }
        } else {
            for y in 0..(h + dy) {
                self.scroll_row(y, dx, dy, w);
            }
        }
    }

    fn scroll_row(&mut self, y: i32, dx: i32, dy: i32, w: i32) {
        let stride = usize::from(self.stride);
        if dx >= 0 {
            let mut x = w - 1;
            while x >= dx {
                let col =
                    self.format
                        .get_pixel(self.buf, stride, (x - dx) as usize, (y - dy) as usize);
                self.format
                    .set_pixel(self.buf, stride, x as usize, y as usize, col);
                x -= 1;
            }
        } else {
            for x in 0..(w + dx) {
                let col =
                    self.format
                        .get_pixel(self.buf, stride, (x - dx) as usize, (y - dy) as usize);
                self.format
                    .set_pixel(self.buf, stride, x as usize, y as usize, col);
            }
        }
    }

    /// Decode a 24/32-bpp uncompressed BMP stream and paint it into the
    /// framebuffer with its top-left pixel offset by `(x0, y0)`.
    pub fn load_bmp<R: ReadSource + ?Sized>(
        &mut self,
        reader: &mut R,
        x0: i32,
        y0: i32,
        limits: Option<&Limits>,
        stop: impl Stop,
    ) -> Result<(), FramebufError> {
        bmp::load(self, reader, x0, y0, limits, &stop)
    }

    /// Play an animated GIF stream into the framebuffer at offset `(x0, y0)`.
    ///
    /// `hooks` supplies the inter-frame delay primitive and the per-frame
    /// callback; `stop` cancels playback at the next 10 ms tick or frame
    /// boundary (a cancelled playback returns `Ok`).
    pub fn load_gif<R: ReadSource + ?Sized>(
        &mut self,
        reader: &mut R,
        x0: i32,
        y0: i32,
        hooks: &mut dyn GifHooks,
        limits: Option<&Limits>,
        stop: impl Stop,
    ) -> Result<(), FramebufError> {
        gif::load(self, reader, x0, y0, hooks, limits, &stop)
    }
}
