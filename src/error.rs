use alloc::string::String;
use enough::StopReason;

/// Errors from framebuffer construction and image loading.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FramebufError {
    #[error("invalid format tag: {0}")]
    InvalidFormat(u8),

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported format variant: {0}")]
    UnsupportedVariant(String),

    #[error("invalid image data: {0}")]
    InvalidData(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("i/o error: {0}")]
    Io(String),

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl From<StopReason> for FramebufError {
    fn from(r: StopReason) -> Self {
        FramebufError::Cancelled(r)
    }
}
