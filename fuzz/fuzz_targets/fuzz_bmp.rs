#![no_main]
use libfuzzer_sys::fuzz_target;
use zenframebuf::{FrameBuffer, PixelFormat, SliceReader};

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic, for any pixel format.
    for format in [PixelFormat::Rgb565, PixelFormat::Pl8, PixelFormat::MonoVlsb] {
        let mut backing = [0u8; 64 * 64 * 2];
        let mut fb = FrameBuffer::new(&mut backing, 64, 64, format).unwrap();
        let mut reader = SliceReader::new(data);
        let _ = fb.load_bmp(&mut reader, 0, 0, None, enough::Unstoppable);
    }
});
