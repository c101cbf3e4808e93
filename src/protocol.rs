//! Application-layer request/response model shared by the frame codec
//! and the master transaction engine.

use crate::constants::*;
use crate::error::{ModbusError, ModbusResult};

/// Modbus unit (slave) identifier.
pub type SlaveId = u8;

/// The function codes this crate supports (§1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusFunction {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
    ReadWriteMultipleRegisters,
}

impl ModbusFunction {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::ReadCoils => FC_READ_COILS,
            Self::ReadDiscreteInputs => FC_READ_DISCRETE_INPUTS,
            Self::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            Self::ReadInputRegisters => FC_READ_INPUT_REGISTERS,
            Self::WriteSingleCoil => FC_WRITE_SINGLE_COIL,
            Self::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            Self::WriteMultipleCoils => FC_WRITE_MULTIPLE_COILS,
            Self::WriteMultipleRegisters => FC_WRITE_MULTIPLE_REGISTERS,
            Self::ReadWriteMultipleRegisters => FC_READ_WRITE_MULTIPLE_REGISTERS,
        }
    }

    pub fn from_u8(fc: u8) -> ModbusResult<Self> {
        Ok(match fc {
            FC_READ_COILS => Self::ReadCoils,
            FC_READ_DISCRETE_INPUTS => Self::ReadDiscreteInputs,
            FC_READ_HOLDING_REGISTERS => Self::ReadHoldingRegisters,
            FC_READ_INPUT_REGISTERS => Self::ReadInputRegisters,
            FC_WRITE_SINGLE_COIL => Self::WriteSingleCoil,
            FC_WRITE_SINGLE_REGISTER => Self::WriteSingleRegister,
            FC_WRITE_MULTIPLE_COILS => Self::WriteMultipleCoils,
            FC_WRITE_MULTIPLE_REGISTERS => Self::WriteMultipleRegisters,
            FC_READ_WRITE_MULTIPLE_REGISTERS => Self::ReadWriteMultipleRegisters,
            other => return Err(ModbusError::invalid_function(other)),
        })
    }

    /// Whether this function operates on the bit-addressed banks
    /// (coils / discrete inputs) rather than the register banks.
    pub fn is_bit_oriented(self) -> bool {
        matches!(
            self,
            Self::ReadCoils | Self::ReadDiscreteInputs | Self::WriteSingleCoil | Self::WriteMultipleCoils
        )
    }
}

/// A master-side request, transport-agnostic.
///
/// `data` carries the function-specific payload beyond address/quantity
/// (write values, FC23's write block) — see §4.3's PDU table.
#[derive(Debug, Clone)]
pub struct ModbusRequest {
    pub slave_id: SlaveId,
    pub function: ModbusFunction,
    pub address: u16,
    pub quantity: u16,
    pub data: Vec<u8>,
}

impl ModbusRequest {
    /// Present only for FC23 requests: the second (write-side) address
    /// and quantity, if this request's `data` carries the
    /// `raddr,rqty,waddr,wqty,wbytecount,regs...` tail used by
    /// `read_write_multiple_registers`.
    pub fn rw_write_address(&self) -> Option<u16> {
        if self.function == ModbusFunction::ReadWriteMultipleRegisters && self.data.len() >= 5 {
            Some(u16::from_be_bytes([self.data[0], self.data[1]]))
        } else {
            None
        }
    }
}

/// A response ADU's application-layer payload, already stripped of its
/// transport framing (MBAP or unit id + CRC).
#[derive(Debug, Clone)]
pub struct ModbusResponse {
    pub slave_id: SlaveId,
    pub function: ModbusFunction,
    /// Raw PDU bytes following the function code (byte count + payload
    /// for reads, echoed address/quantity for writes).
    data: Vec<u8>,
    /// Transaction id this response decoded from (TCP/UDP MBAP header
    /// only; `0` for RTU where there is none).
    pub transaction_id: u16,
}

impl ModbusResponse {
    pub fn new_success(slave_id: SlaveId, function: ModbusFunction, data: Vec<u8>) -> Self {
        Self {
            slave_id,
            function,
            data,
            transaction_id: 0,
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: u16) -> Self {
        self.transaction_id = transaction_id;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Parse a read-coils/read-discrete-inputs response body
    /// (`byte_count, bits...`) into LSB-first bits in ascending address
    /// order.
    pub fn parse_bits(&self) -> ModbusResult<Vec<bool>> {
        if self.data.is_empty() {
            return Err(ModbusError::Protocol {
                message: "empty bit response".to_string(),
            });
        }
        let byte_count = self.data[0] as usize;
        let payload = &self.data[1..];
        if payload.len() < byte_count {
            return Err(ModbusError::Protocol {
                message: "bit response shorter than byte count".to_string(),
            });
        }
        let mut bits = Vec::with_capacity(byte_count * 8);
        for &byte in &payload[..byte_count] {
            for bit in 0..8 {
                bits.push((byte >> bit) & 1 != 0);
            }
        }
        Ok(bits)
    }

    /// Parse a read-registers response body (`byte_count, regs...`)
    /// into big-endian `u16` values.
    pub fn parse_registers(&self) -> ModbusResult<Vec<u16>> {
        if self.data.is_empty() {
            return Err(ModbusError::Protocol {
                message: "empty register response".to_string(),
            });
        }
        let byte_count = self.data[0] as usize;
        let payload = &self.data[1..];
        if payload.len() < byte_count || byte_count % 2 != 0 {
            return Err(ModbusError::Protocol {
                message: "register response malformed byte count".to_string(),
            });
        }
        Ok(payload[..byte_count]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect())
    }
}

/// A well-formed Modbus exception response (§3, §7).
#[derive(Debug, Clone, Copy)]
pub struct ModbusException {
    pub function_code: u8,
    pub exception_code: u8,
}

impl ModbusException {
    pub fn new(function_code: u8, exception_code: u8) -> Self {
        Self {
            function_code,
            exception_code,
        }
    }

    /// The error-response function code byte, `fc | 0x80`.
    pub fn error_code(&self) -> u8 {
        self.function_code | EXCEPTION_FLAG
    }

    pub fn into_error(self) -> ModbusError {
        ModbusError::from_exception_code(self.exception_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_round_trip() {
        for fc in [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x0F, 0x10, 0x17] {
            let f = ModbusFunction::from_u8(fc).unwrap();
            assert_eq!(f.to_u8(), fc);
        }
    }

    #[test]
    fn unsupported_function_rejected() {
        assert!(ModbusFunction::from_u8(0x08).is_err());
    }

    #[test]
    fn parse_registers_scenario_1() {
        // SPEC_FULL §8 scenario 1 response PDU body.
        let resp = ModbusResponse::new_success(
            17,
            ModbusFunction::ReadHoldingRegisters,
            vec![0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64],
        );
        let regs = resp.parse_registers().unwrap();
        assert_eq!(regs, vec![0x022B, 0x0000, 0x0064]);
    }

    #[test]
    fn parse_bits_empty_bank_scenario() {
        // SPEC_FULL §8 scenario 4: no coils set, quantity 8.
        let resp = ModbusResponse::new_success(1, ModbusFunction::ReadCoils, vec![0x01, 0x00]);
        let bits = resp.parse_bits().unwrap();
        assert_eq!(bits, vec![false; 8]);
    }

    #[test]
    fn exception_error_code() {
        let exc = ModbusException::new(0x03, 0x01);
        assert_eq!(exc.error_code(), 0x83);
    }
}
