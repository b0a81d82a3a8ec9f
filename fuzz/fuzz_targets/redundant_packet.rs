#![no_main]

use libfuzzer_sys::fuzz_target;
use wire::{decode_redundant_packet, encode_redundant_packet, Limits};

fuzz_target!(|data: &[u8]| {
    let Some((&width, packet)) = data.split_first() else {
        return;
    };
    let payload_bits = usize::from(width % 64) + 1;
    let limits = Limits::for_testing();

    let Ok(decoded) = decode_redundant_packet(packet, &limits, |_| Some(payload_bits)) else {
        return;
    };

    // Re-encoding without merging must describe the same inputs.
    let inputs: Vec<(u64, &[u8])> = decoded.inputs().collect();
    let encoded = encode_redundant_packet(
        decoded.first_id,
        inputs.iter().map(|(_, payload)| *payload),
        |_, _| false,
    );
    let again = decode_redundant_packet(&encoded, &Limits::unlimited(), |_| Some(payload_bits))
        .expect("re-encoded packet decodes");
    assert!(again.inputs().eq(inputs.iter().copied()));
});
