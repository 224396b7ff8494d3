#![no_main]
use libfuzzer_sys::fuzz_target;
use zenframebuf::gif::NoDelay;
use zenframebuf::{FrameBuffer, Limits, PixelFormat, SliceReader};

fuzz_target!(|data: &[u8]| {
    // Playing arbitrary bytes must never panic; the frame limit bounds
    // pathological inputs that would otherwise loop for a long time.
    let limits = Limits {
        max_frames: Some(64),
        ..Default::default()
    };
    let mut backing = [0u8; 64 * 64 * 2];
    let mut fb = FrameBuffer::new(&mut backing, 64, 64, PixelFormat::Rgb565).unwrap();
    let mut reader = SliceReader::new(data);
    let _ = fb.load_gif(
        &mut reader,
        0,
        0,
        &mut NoDelay,
        Some(&limits),
        enough::Unstoppable,
    );
});
