//! Crate-wide error type and result alias.

use thiserror::Error;

/// Result alias used at every public boundary of the crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// All ways a Modbus operation can fail.
#[derive(Error, Debug)]
pub enum ModbusError {
    /// Transport is not ready (TCP/UDP socket never established, or
    /// closed since).
    #[error("transport not connected")]
    NotConnected,

    /// RTU transport is configured but the serial port is closed.
    #[error("serial port not open")]
    SerialPortNotOpen,

    /// Argument out of the Modbus-specified range (quantity, address,
    /// coil value, ...).
    #[error("illegal argument: {message}")]
    IllegalArgument { message: String },

    /// No matching response arrived within the configured deadline.
    #[error("timeout after {elapsed_ms}ms: {message}")]
    TimeoutExpired { message: String, elapsed_ms: u64 },

    /// An RTU response's trailing CRC did not match the recomputed
    /// value.
    #[error("CRC check failed")]
    CrcCheckFailed,

    /// The peer returned a well-formed Modbus exception response.
    #[error("modbus exception {code}: {kind}")]
    ModbusException { code: u8, kind: ExceptionKind },

    /// Malformed ADU/PDU that is not itself a well-formed exception
    /// response (too short, bad MBAP length field, unsupported
    /// function code in a context that makes no sense as "illegal
    /// function").
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// A function code this build does not recognize at all.
    #[error("unsupported function code: {code:#04x}")]
    InvalidFunction { code: u8 },

    /// Invalid `MasterConfig`/`SlaveConfig` at construction time.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Underlying transport I/O failed for a reason other than
    /// timeout.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModbusError {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::IllegalArgument {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::TimeoutExpired {
            message: message.into(),
            elapsed_ms,
        }
    }

    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// Build a typed exception error from the raw exception code
    /// returned by a peer (§7).
    pub fn from_exception_code(code: u8) -> Self {
        Self::ModbusException {
            code,
            kind: ExceptionKind::from_code(code),
        }
    }
}

/// Typed sub-variant of a `ModbusException`, mapped from the raw
/// exception code per §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    FunctionCodeNotSupported,
    StartingAddressInvalid,
    QuantityInvalid,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Unknown,
}

impl ExceptionKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::FunctionCodeNotSupported,
            2 => Self::StartingAddressInvalid,
            3 => Self::QuantityInvalid,
            4 => Self::SlaveDeviceFailure,
            5 => Self::Acknowledge,
            6 => Self::SlaveDeviceBusy,
            10 => Self::GatewayPathUnavailable,
            11 => Self::GatewayTargetFailedToRespond,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FunctionCodeNotSupported => "illegal function",
            Self::StartingAddressInvalid => "illegal data address",
            Self::QuantityInvalid => "illegal data value",
            Self::SlaveDeviceFailure => "slave device failure",
            Self::Acknowledge => "acknowledge",
            Self::SlaveDeviceBusy => "slave device busy",
            Self::GatewayPathUnavailable => "gateway path unavailable",
            Self::GatewayTargetFailedToRespond => "gateway target failed to respond",
            Self::Unknown => "unknown exception",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_kind_mapping() {
        assert_eq!(
            ExceptionKind::from_code(1),
            ExceptionKind::FunctionCodeNotSupported
        );
        assert_eq!(
            ExceptionKind::from_code(2),
            ExceptionKind::StartingAddressInvalid
        );
        assert_eq!(ExceptionKind::from_code(3), ExceptionKind::QuantityInvalid);
        assert_eq!(ExceptionKind::from_code(4), ExceptionKind::SlaveDeviceFailure);
        assert_eq!(ExceptionKind::from_code(5), ExceptionKind::Acknowledge);
        assert_eq!(ExceptionKind::from_code(6), ExceptionKind::SlaveDeviceBusy);
        assert_eq!(
            ExceptionKind::from_code(10),
            ExceptionKind::GatewayPathUnavailable
        );
        assert_eq!(
            ExceptionKind::from_code(11),
            ExceptionKind::GatewayTargetFailedToRespond
        );
        assert_eq!(ExceptionKind::from_code(200), ExceptionKind::Unknown);
    }

    #[test]
    fn from_exception_code_roundtrip() {
        let err = ModbusError::from_exception_code(2);
        match err {
            ModbusError::ModbusException { code, kind } => {
                assert_eq!(code, 2);
                assert_eq!(kind, ExceptionKind::StartingAddressInvalid);
            }
            _ => panic!("expected ModbusException"),
        }
    }
}
