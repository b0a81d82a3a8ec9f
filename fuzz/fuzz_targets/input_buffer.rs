#![no_main]

use bitstream::{CompressionLevel, InputBuffer};
use libfuzzer_sys::fuzz_target;

const LEVELS: [CompressionLevel; 4] = [
    CompressionLevel::Level0,
    CompressionLevel::Level1,
    CompressionLevel::Level2,
    CompressionLevel::Level3,
];

fuzz_target!(|data: &[u8]| {
    let Some((&ops, payload)) = data.split_first() else {
        return;
    };
    let mut buffer = InputBuffer::new();
    buffer.load(payload);

    for step in 0..usize::from(ops % 32) {
        let level = LEVELS[step % LEVELS.len()];
        let _ = match (usize::from(ops) + step) % 5 {
            0 => buffer.read_bool().map(|_| ()),
            1 => buffer.read_int(level).map(|_| ()),
            2 => buffer.read_unit_real(level).map(|_| ()),
            3 => buffer.read_normalized_vector2(level).map(|_| ()),
            _ => buffer.read_normalized_vector3(level).map(|_| ()),
        };
        assert!(buffer.bit_offset() <= buffer.size_in_bits());
    }
});
