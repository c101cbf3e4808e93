//! Typed, validated configuration for the master and slave engines
//! (§6.2). Both structs are plain data built through a fallible
//! constructor: construction fails fast with `ModbusError::Configuration`
//! rather than deferring the problem to the first request.

use std::net::IpAddr;
use std::time::Duration;

use crate::constants::*;
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::SlaveId;

#[cfg(feature = "rtu")]
pub use tokio_serial::{DataBits, Parity, StopBits};

/// Serial stop-bit count. Re-exported from `tokio_serial` when the
/// `rtu` feature is enabled; kept as a standalone enum otherwise so
/// `SlaveConfig`/`MasterConfig` compile without the feature.
#[cfg(not(feature = "rtu"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Serial parity. Re-exported from `tokio_serial` when the `rtu`
/// feature is enabled; kept as a standalone enum otherwise. §6.2 names
/// five variants (`None`, `Odd`, `Even`, `Mark`, `Space`); `tokio_serial`
/// (and the POSIX/Windows serial APIs it wraps) only exposes the first
/// three, so `Mark`/`Space` are not representable here — see DESIGN.md.
#[cfg(not(feature = "rtu"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Transport selection and its transport-specific parameters.
#[derive(Debug, Clone)]
pub enum TransportMode {
    Tcp { addr: IpAddr, port: u16 },
    Udp { addr: IpAddr, port: u16 },
    Rtu {
        port_name: String,
        baud_rate: u32,
        parity: Parity,
        stop_bits: StopBits,
    },
}

/// Master-side connection parameters (§6.2).
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub mode: TransportMode,
    pub unit_identifier: SlaveId,
    pub connection_timeout: Duration,
    pub number_of_retries: u32,
}

impl MasterConfig {
    pub fn new(mode: TransportMode) -> ModbusResult<Self> {
        let config = Self {
            mode,
            unit_identifier: DEFAULT_UNIT_IDENTIFIER,
            connection_timeout: Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS),
            number_of_retries: DEFAULT_NUMBER_OF_RETRIES,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_unit_identifier(mut self, unit_identifier: SlaveId) -> ModbusResult<Self> {
        self.unit_identifier = unit_identifier;
        self.validate()?;
        Ok(self)
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> ModbusResult<Self> {
        self.connection_timeout = timeout;
        self.validate()?;
        Ok(self)
    }

    pub fn with_number_of_retries(mut self, retries: u32) -> Self {
        self.number_of_retries = retries;
        self
    }

    fn validate(&self) -> ModbusResult<()> {
        if let TransportMode::Rtu { baud_rate, .. } = &self.mode {
            if *baud_rate == 0 {
                return Err(ModbusError::configuration("RTU baud rate must be nonzero"));
            }
        }
        if self.connection_timeout.is_zero() {
            return Err(ModbusError::configuration("connection_timeout must be nonzero"));
        }
        if self.unit_identifier > RTU_UNIT_ID_MAX && !matches!(self.mode, TransportMode::Tcp { .. } | TransportMode::Udp { .. })
        {
            return Err(ModbusError::configuration(format!(
                "unit_identifier {} exceeds RTU maximum {}",
                self.unit_identifier, RTU_UNIT_ID_MAX
            )));
        }
        Ok(())
    }
}

/// Per-function-code enable/disable switches for the slave dispatcher
/// (§6.2, §4.5). A disabled function code is rejected with exception 1
/// (illegal function) regardless of address/quantity validity.
#[derive(Debug, Clone, Copy)]
pub struct EnabledFunctions {
    pub read_coils: bool,
    pub read_discrete_inputs: bool,
    pub read_holding_registers: bool,
    pub read_input_registers: bool,
    pub write_single_coil: bool,
    pub write_single_register: bool,
    pub write_multiple_coils: bool,
    pub write_multiple_registers: bool,
    pub read_write_multiple_registers: bool,
}

impl Default for EnabledFunctions {
    fn default() -> Self {
        Self {
            read_coils: true,
            read_discrete_inputs: true,
            read_holding_registers: true,
            read_input_registers: true,
            write_single_coil: true,
            write_single_register: true,
            write_multiple_coils: true,
            write_multiple_registers: true,
            read_write_multiple_registers: true,
        }
    }
}

/// Slave-side listener parameters (§6.2).
#[derive(Debug, Clone)]
pub struct SlaveConfig {
    pub mode: TransportMode,
    pub unit_identifier: SlaveId,
    pub enabled_functions: EnabledFunctions,
    /// `0` disables idle disconnection entirely.
    pub tcp_idle_timeout: Duration,
    /// When non-empty, only these peer addresses may connect over TCP.
    pub tcp_peer_allowlist: Vec<IpAddr>,
}

impl SlaveConfig {
    pub fn new(mode: TransportMode) -> ModbusResult<Self> {
        let config = Self {
            mode,
            unit_identifier: DEFAULT_UNIT_IDENTIFIER,
            enabled_functions: EnabledFunctions::default(),
            tcp_idle_timeout: Duration::from_secs(0),
            tcp_peer_allowlist: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_unit_identifier(mut self, unit_identifier: SlaveId) -> ModbusResult<Self> {
        self.unit_identifier = unit_identifier;
        self.validate()?;
        Ok(self)
    }

    pub fn with_enabled_functions(mut self, enabled_functions: EnabledFunctions) -> Self {
        self.enabled_functions = enabled_functions;
        self
    }

    pub fn with_tcp_idle_timeout(mut self, timeout: Duration) -> Self {
        self.tcp_idle_timeout = timeout;
        self
    }

    pub fn with_tcp_peer_allowlist(mut self, allowlist: Vec<IpAddr>) -> Self {
        self.tcp_peer_allowlist = allowlist;
        self
    }

    fn validate(&self) -> ModbusResult<()> {
        if let TransportMode::Rtu { baud_rate, .. } = &self.mode {
            if *baud_rate == 0 {
                return Err(ModbusError::configuration("RTU baud rate must be nonzero"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_baud_rtu_master() {
        let mode = TransportMode::Rtu {
            port_name: "/dev/ttyUSB0".to_string(),
            baud_rate: 0,
            parity: Parity::None,
            stop_bits: StopBits::One,
        };
        assert!(MasterConfig::new(mode).is_err());
    }

    #[test]
    fn rejects_zero_connection_timeout() {
        let mode = TransportMode::Tcp {
            addr: "127.0.0.1".parse().unwrap(),
            port: DEFAULT_TCP_PORT,
        };
        let config = MasterConfig::new(mode).unwrap();
        assert!(config.with_connection_timeout(Duration::from_millis(0)).is_err());
    }

    #[test]
    fn defaults_match_spec() {
        let mode = TransportMode::Tcp {
            addr: "127.0.0.1".parse().unwrap(),
            port: DEFAULT_TCP_PORT,
        };
        let config = MasterConfig::new(mode).unwrap();
        assert_eq!(config.unit_identifier, 1);
        assert_eq!(config.number_of_retries, 3);
        assert_eq!(config.connection_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn slave_config_defaults_enable_every_function() {
        let mode = TransportMode::Tcp {
            addr: "0.0.0.0".parse().unwrap(),
            port: DEFAULT_TCP_PORT,
        };
        let config = SlaveConfig::new(mode).unwrap();
        assert!(config.enabled_functions.read_holding_registers);
        assert!(config.tcp_peer_allowlist.is_empty());
    }
}
