#![no_main]

use libfuzzer_sys::fuzz_target;
use arbitrary::Arbitrary;
use modbus_stack::{ModbusFunction, ModbusRequest};

#[derive(Arbitrary, Debug)]
struct FuzzRequest {
    slave_id: u8,
    function_code: u8,
    address: u16,
    quantity: u16,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzRequest| {
    // Arbitrary quantity/data combinations must either build a valid PDU
    // or return an error, never panic — this is the boundary the slave
    // dispatcher relies on staying within MAX_PDU_SIZE.
    if let Ok(function) = ModbusFunction::from_u8(input.function_code & 0x7F) {
        let request = ModbusRequest {
            slave_id: input.slave_id,
            function,
            address: input.address,
            quantity: input.quantity,
            data: input.data,
        };
        let _ = modbus_stack::build_request_pdu(&request);
    }
});
