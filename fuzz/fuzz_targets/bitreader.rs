#![no_main]

use bitstream::BitReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = BitReader::new(data);
    let mut idx = 0usize;

    // Use input bytes to drive a bounded sequence of operations.
    while idx < data.len() && idx < 1024 {
        let byte = data[idx];
        idx += 1;

        match byte % 7 {
            0 => {
                let _ = reader.read_bit();
            }
            1 => {
                let _ = reader.read_bits(usize::from(byte % 70));
            }
            2 => {
                let _ = reader.seek(usize::from(byte) * 3);
            }
            3 => {
                let _ = reader.skip(usize::from(byte % 17));
            }
            4 => {
                let _ = reader.read_u8_aligned();
            }
            5 => {
                let _ = reader.read_u32_aligned();
            }
            _ => {
                let _ = reader.read_byte_slice(usize::from(byte % 9));
            }
        }
        assert!(reader.bit_position() <= reader.len_bits());
    }
});
