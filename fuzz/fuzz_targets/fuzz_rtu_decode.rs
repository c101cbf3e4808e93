#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_stack::crc::detect_valid_frame;
use modbus_stack::parse_rtu_adu;

fuzz_target!(|data: &[u8]| {
    // RTU frame detection and ADU parsing must tolerate arbitrary byte
    // soup accumulated off a serial line, including partial frames and
    // garbage that happens to pass the CRC check by chance.
    if detect_valid_frame(data, data.len()) {
        let _ = parse_rtu_adu(data, data.len());
    }
});
