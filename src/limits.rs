/// Resource limits for the image loaders.
///
/// All fields default to `None` (no limit).
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum number of GIF frames to render in one playback.
    pub max_frames: Option<u64>,
}

impl Limits {
    /// Check image dimensions against limits. Returns Ok(()) or LimitExceeded error.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), crate::FramebufError> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(crate::FramebufError::LimitExceeded(alloc::format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(crate::FramebufError::LimitExceeded(alloc::format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(crate::FramebufError::LimitExceeded(alloc::format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        Ok(())
    }

    /// Check a running GIF frame count against the frame limit.
    pub(crate) fn check_frames(&self, frames: u64) -> Result<(), crate::FramebufError> {
        if let Some(max_frames) = self.max_frames {
            if frames > max_frames {
                return Err(crate::FramebufError::LimitExceeded(alloc::format!(
                    "frame count {frames} exceeds limit {max_frames}"
                )));
            }
        }
        Ok(())
    }
}
