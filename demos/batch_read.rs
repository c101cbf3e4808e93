//! Batch Reading Example
//!
//! Demonstrates how to read large ranges of registers and coils by
//! splitting requests to stay within the Modbus specification limits.
//!
//! # Why Batch Reading?
//!
//! The Modbus specification limits the number of items per read request:
//! - **FC03/FC04**: Max 125 registers per request
//! - **FC01/FC02**: Max 2000 bits per request
//!
//! This example shows how to split a large logical read into a series
//! of requests that each respect these limits, and reassemble the
//! results into one contiguous buffer.
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example batch_read
//! ```

use modbus_stack::{ModbusClient, ModbusResult, ModbusTcpClient, MAX_READ_COILS, MAX_READ_REGISTERS};

/// Read `quantity` holding registers starting at `start_address`, splitting
/// into multiple requests of at most `MAX_READ_REGISTERS` each.
async fn read_holding_registers_chunked(
    client: &mut ModbusTcpClient,
    slave_id: u8,
    start_address: u16,
    quantity: u16,
) -> ModbusResult<Vec<u16>> {
    let mut out = Vec::with_capacity(quantity as usize);
    let mut remaining = quantity;
    let mut address = start_address;

    while remaining > 0 {
        let chunk = remaining.min(MAX_READ_REGISTERS as u16);
        let mut values = client.read_holding_registers(slave_id, address, chunk).await?;
        out.append(&mut values);
        address += chunk;
        remaining -= chunk;
    }

    Ok(out)
}

/// Read `quantity` coils starting at `start_address`, splitting into
/// multiple requests of at most `MAX_READ_COILS` each.
async fn read_coils_chunked(
    client: &mut ModbusTcpClient,
    slave_id: u8,
    start_address: u16,
    quantity: u16,
) -> ModbusResult<Vec<bool>> {
    let mut out = Vec::with_capacity(quantity as usize);
    let mut remaining = quantity;
    let mut address = start_address;

    while remaining > 0 {
        let chunk = remaining.min(MAX_READ_COILS as u16);
        let mut values = client.read_coils(slave_id, address, chunk).await?;
        out.append(&mut values);
        address += chunk;
        remaining -= chunk;
    }

    Ok(out)
}

#[tokio::main]
async fn main() -> ModbusResult<()> {
    let addr = "127.0.0.1:502".parse().expect("valid socket address");
    let mut client = ModbusTcpClient::from_address(addr).await?;

    let slave_id = 1;

    println!("=== Reading 200 holding registers (limit is {} per request) ===\n", MAX_READ_REGISTERS);
    let registers = read_holding_registers_chunked(&mut client, slave_id, 0, 200).await?;
    println!("Read {} registers total across {} request(s)\n", registers.len(), (200 + MAX_READ_REGISTERS - 1) / MAX_READ_REGISTERS);

    println!("=== Reading 3000 coils (limit is {} per request) ===\n", MAX_READ_COILS);
    let coils = read_coils_chunked(&mut client, slave_id, 0, 3000).await?;
    println!("Read {} coils total", coils.len());
    println!("First 16 coils: {:?}", &coils[..coils.len().min(16)]);

    let stats = client.get_stats();
    println!(
        "\nTotal requests: {}, responses: {}",
        stats.requests_sent, stats.responses_received
    );

    client.close().await?;
    Ok(())
}
