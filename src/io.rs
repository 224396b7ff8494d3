//! Byte-stream abstraction over the host filesystem.
//!
//! The image loaders read through [`ReadSource`] rather than a concrete file
//! type: embedded hosts implement it over their filesystem driver, tests and
//! `no_std` callers use [`SliceReader`], and under the `std` feature any
//! `Read + Seek` type (e.g. `std::fs::File`) can be wrapped in [`StdSource`].

use crate::FramebufError;

/// A readable, seekable byte stream.
///
/// Opening and closing the stream is the caller's concern: construct the
/// reader before calling a loader and drop it afterwards.
pub trait ReadSource {
    /// Read up to `buf.len()` bytes, returning how many were read.
    /// Zero means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FramebufError>;

    /// Seek to an absolute byte position.
    fn seek(&mut self, pos: u64) -> Result<(), FramebufError>;

    /// Current byte position.
    fn tell(&mut self) -> Result<u64, FramebufError>;

    /// Read exactly `buf.len()` bytes or fail with `UnexpectedEof`.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), FramebufError> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(FramebufError::UnexpectedEof);
            }
            filled += n;
        }
        Ok(())
    }

    /// Read a single byte.
    fn read_byte(&mut self) -> Result<u8, FramebufError> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

/// In-memory byte stream over a borrowed slice.
#[derive(Debug)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ReadSource for SliceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FramebufError> {
        let available = self.data.len().saturating_sub(self.pos);
        let n = buf.len().min(available);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> Result<(), FramebufError> {
        // Seeking past the end is allowed; subsequent reads return 0.
        self.pos = usize::try_from(pos).map_err(|_| FramebufError::UnexpectedEof)?;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64, FramebufError> {
        Ok(self.pos as u64)
    }
}

/// Adapter giving any `std::io::Read + Seek` type (e.g. `std::fs::File`)
/// the [`ReadSource`] contract.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StdSource<R>(pub R);

#[cfg(feature = "std")]
impl<R: std::io::Read + std::io::Seek> ReadSource for StdSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FramebufError> {
        std::io::Read::read(&mut self.0, buf).map_err(|e| FramebufError::Io(alloc::format!("{e}")))
    }

    fn seek(&mut self, pos: u64) -> Result<(), FramebufError> {
        std::io::Seek::seek(&mut self.0, std::io::SeekFrom::Start(pos))
            .map(|_| ())
            .map_err(|e| FramebufError::Io(alloc::format!("{e}")))
    }

    fn tell(&mut self) -> Result<u64, FramebufError> {
        std::io::Seek::stream_position(&mut self.0)
            .map_err(|e| FramebufError::Io(alloc::format!("{e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_reader_read_and_seek() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = SliceReader::new(&data);
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        assert_eq!(reader.tell().unwrap(), 2);
        reader.seek(4).unwrap();
        assert_eq!(reader.read_byte().unwrap(), 5);
        assert!(matches!(
            reader.read_byte(),
            Err(FramebufError::UnexpectedEof)
        ));
    }
}
