/// Image container format identified by a probe.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// BMP (Windows bitmap).
    Bmp,
    /// GIF (GIF87a or GIF89a).
    Gif,
}

/// Image metadata extracted from a header without decoding pixel data.
#[derive(Clone, Copy, Debug)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
}
