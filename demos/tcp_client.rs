//! Basic TCP Client Example
//!
//! This example demonstrates how to connect to a Modbus TCP server
//! and perform basic read/write operations.
//!
//! # Running this example
//!
//! ```bash
//! cargo run --example tcp_client
//! ```
//!
//! Note: This requires a Modbus TCP server running on 127.0.0.1:502.
//! You can use any Modbus simulator for testing.

use modbus_stack::{ModbusClient, ModbusResult, ModbusTcpClient};

#[tokio::main]
async fn main() -> ModbusResult<()> {
    let addr = "127.0.0.1:502".parse().expect("valid socket address");
    let mut client = ModbusTcpClient::from_address(addr).await?;

    println!("Connected to Modbus server");

    let slave_id = 1;

    // =========================================================================
    // Reading Operations
    // =========================================================================

    let registers = client.read_holding_registers(slave_id, 0, 10).await?;
    println!("Registers 0-9: {:?}", registers);

    let input_regs = client.read_input_registers(slave_id, 0, 5).await?;
    println!("Input registers 0-4: {:?}", input_regs);

    let coils = client.read_coils(slave_id, 0, 8).await?;
    println!("Coils 0-7: {:?}", coils);

    let discrete = client.read_discrete_inputs(slave_id, 0, 8).await?;
    println!("Discrete inputs 0-7: {:?}", discrete);

    // =========================================================================
    // Writing Operations
    // =========================================================================

    client.write_single_register(slave_id, 100, 0x1234).await?;
    println!("Wrote 0x1234 to register 100");

    client.write_single_coil(slave_id, 0, true).await?;
    println!("Set coil 0 to ON");

    client
        .write_multiple_registers(slave_id, 200, &[0x1111, 0x2222, 0x3333])
        .await?;
    println!("Wrote 3 registers starting at address 200");

    client
        .write_multiple_coils(slave_id, 10, &[true, false, true, true])
        .await?;
    println!("Wrote 4 coils starting at address 10");

    // =========================================================================
    // Statistics
    // =========================================================================

    let stats = client.get_stats();
    println!(
        "\nTransport Statistics:\n  Requests sent: {}\n  Responses received: {}",
        stats.requests_sent, stats.responses_received
    );

    client.close().await?;
    println!("\nConnection closed");

    Ok(())
}
