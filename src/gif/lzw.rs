//! LZW decompressor for GIF image data.
//!
//! Codes are read least-significant-bit first out of a 300-byte refill
//! window that carries a two-byte tail across refills so a code may straddle
//! sub-block boundaries. The dictionary holds up to 4096 entries; decoded
//! strings unwind through a LIFO stack one byte at a time.

use alloc::vec;
use alloc::vec::Vec;

use crate::io::ReadSource;
use crate::FramebufError;

/// Maximum LZW code width in bits (4096 dictionary entries).
const MAX_CODE_BITS: usize = 12;
const DICT_SIZE: usize = 1 << MAX_CODE_BITS;

/// Refill window payload size; two extra leading bytes preserve the tail of
/// the previous window across refills.
const WINDOW: usize = 300;

pub(crate) struct Lzw {
    window: [u8; WINDOW + 2],
    cur_bit: usize,
    last_bit: usize,
    last_byte: usize,
    input_done: bool,
    return_clear: bool,

    min_code_size: usize,
    code_size: usize,
    clear_code: usize,
    end_code: usize,
    /// Next free dictionary slot.
    next_code: usize,
    /// Dictionary size at which the code width grows.
    max_code_size: usize,

    first_code: i32,
    old_code: i32,

    /// Chain link to the previous code of each dictionary entry.
    prefix: Vec<u16>,
    /// Byte emitted by each dictionary entry.
    suffix: Vec<u8>,
    stack: Vec<u8>,
}

impl Lzw {
    /// Initialize from the LZW minimum code size byte of the image data.
    pub(crate) fn new(min_code_size: u8) -> Self {
        let n = usize::from(min_code_size & 0x0f);
        Self {
            window: [0; WINDOW + 2],
            cur_bit: 0,
            last_bit: 0,
            last_byte: 2,
            input_done: false,
            return_clear: true,
            min_code_size: n,
            code_size: n + 1,
            clear_code: 1 << n,
            end_code: (1 << n) + 1,
            next_code: (1 << n) + 2,
            max_code_size: 2 << n,
            first_code: 0,
            old_code: 0,
            prefix: vec![0; DICT_SIZE],
            suffix: vec![0; DICT_SIZE],
            stack: Vec::with_capacity(DICT_SIZE),
        }
    }

    /// Pull the next palette index, or `None` at the end-of-information code.
    pub(crate) fn next_index<R: ReadSource + ?Sized>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<u16>, FramebufError> {
        if let Some(byte) = self.stack.pop() {
            return Ok(Some(u16::from(byte)));
        }
        self.decode_more(reader)
    }

    fn decode_more<R: ReadSource + ?Sized>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<u16>, FramebufError> {
        loop {
            let code = usize::from(self.next_code_bits(reader)?);

            if code == self.clear_code {
                if self.clear_code >= DICT_SIZE {
                    return Err(FramebufError::InvalidData("LZW code size too large".into()));
                }
                self.reset_dictionary();
                // Skip any further clear codes; the first real code seeds the
                // decoder and is emitted directly.
                let first = loop {
                    let c = usize::from(self.next_code_bits(reader)?);
                    if c != self.clear_code {
                        break c;
                    }
                };
                if first == self.end_code {
                    return Ok(None);
                }
                self.first_code = first as i32;
                self.old_code = first as i32;
                return Ok(Some(first as u16));
            }
            if code == self.end_code {
                return Ok(None);
            }

            let incoming = code;
            let mut code = code;
            if code >= self.next_code {
                // KwKwK: the code isn't in the dictionary yet.
                self.push(self.first_code as u8)?;
                code = self.old_code as usize;
            }
            while code >= self.clear_code {
                if code >= DICT_SIZE {
                    return Err(FramebufError::InvalidData("LZW code out of range".into()));
                }
                self.push(self.suffix[code])?;
                if code == usize::from(self.prefix[code]) {
                    return Err(FramebufError::InvalidData("LZW prefix cycle".into()));
                }
                code = usize::from(self.prefix[code]);
            }
            self.first_code = i32::from(self.suffix[code]);
            self.push(self.suffix[code])?;

            let slot = self.next_code;
            if slot < DICT_SIZE {
                self.prefix[slot] = self.old_code as u16;
                self.suffix[slot] = self.first_code as u8;
                self.next_code += 1;
                if self.next_code >= self.max_code_size && self.code_size < MAX_CODE_BITS {
                    self.max_code_size <<= 1;
                    self.code_size += 1;
                }
            }
            self.old_code = incoming as i32;

            if let Some(byte) = self.stack.pop() {
                return Ok(Some(u16::from(byte)));
            }
        }
    }

    fn push(&mut self, byte: u8) -> Result<(), FramebufError> {
        if self.stack.len() >= DICT_SIZE {
            return Err(FramebufError::InvalidData("LZW stack overflow".into()));
        }
        self.stack.push(byte);
        Ok(())
    }

    fn reset_dictionary(&mut self) {
        for (i, suffix) in self.suffix[..self.clear_code].iter_mut().enumerate() {
            *suffix = i as u8;
        }
        self.prefix.fill(0);
        self.code_size = self.min_code_size + 1;
        self.max_code_size = self.clear_code << 1;
        self.next_code = self.clear_code + 2;
        self.stack.clear();
    }

    /// Read the next `code_size` bits from the sub-block stream.
    fn next_code_bits<R: ReadSource + ?Sized>(
        &mut self,
        reader: &mut R,
    ) -> Result<u16, FramebufError> {
        if self.return_clear {
            self.return_clear = false;
            return Ok(self.clear_code as u16);
        }

        let mut end = self.cur_bit + self.code_size;
        if end >= self.last_bit {
            if self.input_done {
                return Err(FramebufError::UnexpectedEof);
            }
            // Slide the last two bytes down and append the next sub-block.
            self.window[0] = self.window[self.last_byte - 2];
            self.window[1] = self.window[self.last_byte - 1];
            let count = read_sub_block(reader, &mut self.window[2..])?;
            if count == 0 {
                self.input_done = true;
            }
            // cur_bit may sit past last_bit when the previous code ran into
            // the preserved tail; the signed form keeps the offset correct.
            self.cur_bit = (self.cur_bit as isize - self.last_bit as isize + 16) as usize;
            self.last_byte = 2 + count;
            self.last_bit = (2 + count) * 8;
            end = self.cur_bit + self.code_size;
        }

        let i = self.cur_bit >> 3;
        let j = end >> 3;
        let mut raw = u32::from(self.window[i]);
        if j > i {
            raw |= u32::from(self.window[i + 1]) << 8;
        }
        if j > i + 1 {
            raw |= u32::from(self.window[i + 2]) << 16;
        }
        let code = (raw >> (self.cur_bit & 7)) & ((1 << self.code_size) - 1);
        self.cur_bit += self.code_size;
        Ok(code as u16)
    }
}

/// Read one GIF data sub-block (length byte + payload) into `buf`.
/// Returns the payload length; zero is the block terminator.
pub(crate) fn read_sub_block<R: ReadSource + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<usize, FramebufError> {
    let len = usize::from(reader.read_byte()?);
    if len > buf.len() {
        return Err(FramebufError::InvalidData("oversized data sub-block".into()));
    }
    if len > 0 {
        reader.read_exact(&mut buf[..len])?;
    }
    Ok(len)
}
