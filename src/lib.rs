//! A pure-Rust Modbus master and slave stack for TCP, UDP, and RTU.
//!
//! ## Supported function codes
//!
//! | Code | Function |
//! |------|----------|
//! | 0x01 | Read Coils |
//! | 0x02 | Read Discrete Inputs |
//! | 0x03 | Read Holding Registers |
//! | 0x04 | Read Input Registers |
//! | 0x05 | Write Single Coil |
//! | 0x06 | Write Single Register |
//! | 0x0F | Write Multiple Coils |
//! | 0x10 | Write Multiple Registers |
//! | 0x17 | Read/Write Multiple Registers |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use modbus_stack::{ModbusTcpClient, ModbusClient, ModbusResult};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let addr = "127.0.0.1:502".parse().unwrap();
//!     let mut client = ModbusTcpClient::from_address(addr).await?;
//!
//!     let values = client.read_holding_registers(1, 0, 10).await?;
//!     println!("read registers: {:?}", values);
//!
//!     client.write_single_register(1, 100, 0x1234).await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

/// Core error types and result handling.
pub mod error;

/// Modbus protocol constants.
pub mod constants;

/// Modbus protocol definitions and message handling.
pub mod protocol;

/// PDU encoding/decoding and TCP/RTU ADU framing.
pub mod frame;

/// CRC-16 and RTU frame detection.
pub mod crc;

/// Network transport layer for TCP, UDP, and RTU communication.
pub mod transport;

/// Modbus client implementations.
pub mod client;

/// Logging and observer hooks.
pub mod logging;

/// Multi-register byte/word order conversions for wide integers, floats, and strings.
pub mod bytes;

/// Typed, validated master/slave configuration.
pub mod config;

/// Slave (server) side: register banks, dispatcher, and listeners.
pub mod slave;

pub use bytes::{
    f32_to_regs, f64_to_regs, i32_to_regs, i64_to_regs, regs_to_f32, regs_to_f64, regs_to_i32, regs_to_i64,
    regs_to_u32, regs_to_u64, registers_to_string, string_to_registers, u32_to_regs, u64_to_regs, WordOrder,
};
pub use client::{GenericModbusClient, ModbusClient, ModbusTcpClient, ModbusUdpClient};
pub use config::{EnabledFunctions, MasterConfig, SlaveConfig, TransportMode};
pub use constants::*;
pub use error::{ModbusError, ModbusResult};
pub use frame::{
    assemble_rtu_adu, assemble_tcp_adu, build_request_pdu, parse_response_pdu, parse_rtu_adu, parse_tcp_adu,
    ModbusPdu, PduBuilder,
};
pub use logging::{CallbackLogger, LogCallback, LogLevel, LoggingMode};
pub use protocol::{ModbusFunction, ModbusRequest, ModbusResponse};
pub use slave::{Banks, Dispatcher, SlaveListener};
pub use transport::{ModbusTransport, TcpTransport, TransportStats, UdpTransport};

#[cfg(feature = "rtu")]
pub use client::ModbusRtuClient;

#[cfg(feature = "rtu")]
pub use transport::RtuTransport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
