#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_stack::{parse_tcp_adu, ModbusFunction};

fuzz_target!(|data: &[u8]| {
    // MBAP framing should never panic regardless of what bytes arrive
    // off the wire, even on truncated or malformed headers.
    if let Ok((_transaction_id, unit_id, pdu)) = parse_tcp_adu(data) {
        let _ = unit_id;
        if let Some(&fc_byte) = pdu.first() {
            if let Ok(function) = ModbusFunction::from_u8(fc_byte & 0x7F) {
                let _ = modbus_stack::parse_response_pdu(function, 1, &pdu, 0);
            }
        }
    }
});
