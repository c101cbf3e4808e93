//! ADU assembly and parsing shared by every transport (§4.3, §6.1).
//!
//! A `ModbusPdu` is the function code plus its function-specific
//! payload, transport-agnostic. This module wraps one in the MBAP
//! envelope for TCP/UDP or the unit-id+CRC envelope for RTU, and parses
//! both shapes back out of a received buffer.

use tracing::debug;

use crate::constants::*;
use crate::crc::{crc16, crc_bytes, detect_valid_frame};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{ModbusFunction, ModbusRequest, ModbusResponse, SlaveId};

/// High-performance PDU with a stack-allocated fixed array.
#[derive(Debug, Clone)]
pub struct ModbusPdu {
    data: [u8; MAX_PDU_SIZE],
    len: usize,
}

impl ModbusPdu {
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    #[inline]
    pub fn from_slice(data: &[u8]) -> ModbusResult<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::Protocol {
                message: format!("PDU too large: {} bytes (max {})", data.len(), MAX_PDU_SIZE),
            });
        }
        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();
        Ok(pdu)
    }

    #[inline]
    pub fn push(&mut self, byte: u8) -> ModbusResult<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(ModbusError::Protocol {
                message: "PDU buffer full".to_string(),
            });
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    #[inline]
    pub fn push_u16(&mut self, value: u16) -> ModbusResult<()> {
        self.push((value >> 8) as u8)?;
        self.push((value & 0xFF) as u8)
    }

    #[inline]
    pub fn extend(&mut self, data: &[u8]) -> ModbusResult<()> {
        if self.len + data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::Protocol {
                message: format!(
                    "PDU would exceed max size: {} + {} > {}",
                    self.len,
                    data.len(),
                    MAX_PDU_SIZE
                ),
            });
        }
        self.data[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        (self.len > 0).then(|| self.data[0])
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code().map(|fc| fc & EXCEPTION_FLAG != 0).unwrap_or(false)
    }
}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent PDU builder.
pub struct PduBuilder {
    pdu: ModbusPdu,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    #[inline]
    pub fn new() -> Self {
        Self { pdu: ModbusPdu::new() }
    }

    #[inline]
    pub fn function_code(mut self, fc: u8) -> ModbusResult<Self> {
        self.pdu.push(fc)?;
        Ok(self)
    }

    #[inline]
    pub fn address(mut self, addr: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(addr)?;
        Ok(self)
    }

    #[inline]
    pub fn quantity(mut self, qty: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(qty)?;
        Ok(self)
    }

    #[inline]
    pub fn byte(mut self, b: u8) -> ModbusResult<Self> {
        self.pdu.push(b)?;
        Ok(self)
    }

    #[inline]
    pub fn data(mut self, data: &[u8]) -> ModbusResult<Self> {
        self.pdu.extend(data)?;
        Ok(self)
    }

    #[inline]
    pub fn build(self) -> ModbusPdu {
        self.pdu
    }

    /// FC01-04 read request.
    pub fn build_read_request(fc: u8, start_address: u16, quantity: u16) -> ModbusResult<ModbusPdu> {
        if !matches!(fc, 0x01..=0x04) {
            return Err(ModbusError::InvalidFunction { code: fc });
        }
        PduBuilder::new()
            .function_code(fc)?
            .address(start_address)?
            .quantity(quantity)?
            .build_ok()
    }

    /// FC05 write single coil.
    pub fn build_write_single_coil(address: u16, value: bool) -> ModbusResult<ModbusPdu> {
        let coil_value: u16 = if value { 0xFF00 } else { 0x0000 };
        PduBuilder::new()
            .function_code(0x05)?
            .address(address)?
            .quantity(coil_value)?
            .build_ok()
    }

    /// FC06 write single register.
    pub fn build_write_single_register(address: u16, value: u16) -> ModbusResult<ModbusPdu> {
        PduBuilder::new()
            .function_code(0x06)?
            .address(address)?
            .quantity(value)?
            .build_ok()
    }

    /// FC15 write multiple coils.
    pub fn build_write_multiple_coils(address: u16, values: &[bool]) -> ModbusResult<ModbusPdu> {
        let quantity = values.len() as u16;
        let byte_count = (values.len() + 7) / 8;
        let mut coil_bytes = vec![0u8; byte_count];
        for (i, &value) in values.iter().enumerate() {
            if value {
                coil_bytes[i / 8] |= 1 << (i % 8);
            }
        }
        PduBuilder::new()
            .function_code(0x0F)?
            .address(address)?
            .quantity(quantity)?
            .byte(byte_count as u8)?
            .data(&coil_bytes)?
            .build_ok()
    }

    /// FC16 write multiple registers.
    pub fn build_write_multiple_registers(address: u16, values: &[u16]) -> ModbusResult<ModbusPdu> {
        let quantity = values.len() as u16;
        let byte_count = (values.len() * 2) as u8;
        let mut builder = PduBuilder::new()
            .function_code(0x10)?
            .address(address)?
            .quantity(quantity)?
            .byte(byte_count)?;
        for &value in values {
            builder = builder.byte((value >> 8) as u8)?.byte((value & 0xFF) as u8)?;
        }
        builder.build_ok()
    }

    /// FC23 read/write multiple registers.
    pub fn build_read_write_multiple_registers(
        read_address: u16,
        read_quantity: u16,
        write_address: u16,
        write_values: &[u16],
    ) -> ModbusResult<ModbusPdu> {
        let write_quantity = write_values.len() as u16;
        let write_byte_count = (write_values.len() * 2) as u8;
        let mut builder = PduBuilder::new()
            .function_code(FC_READ_WRITE_MULTIPLE_REGISTERS)?
            .address(read_address)?
            .quantity(read_quantity)?
            .address(write_address)?
            .quantity(write_quantity)?
            .byte(write_byte_count)?;
        for &value in write_values {
            builder = builder.byte((value >> 8) as u8)?.byte((value & 0xFF) as u8)?;
        }
        builder.build_ok()
    }

    #[inline]
    fn build_ok(self) -> ModbusResult<ModbusPdu> {
        Ok(self.build())
    }
}

/// Build the PDU for a fully-formed `ModbusRequest`, enforcing the
/// per-FC quantity limits of §4.3.
pub fn build_request_pdu(request: &ModbusRequest) -> ModbusResult<ModbusPdu> {
    use ModbusFunction::*;
    let fc = request.function.to_u8();
    match request.function {
        ReadCoils | ReadDiscreteInputs => {
            if request.quantity == 0 || request.quantity as usize > MAX_READ_COILS {
                return Err(ModbusError::invalid_data("read quantity out of range"));
            }
            PduBuilder::build_read_request(fc, request.address, request.quantity)
        }
        ReadHoldingRegisters | ReadInputRegisters => {
            if request.quantity == 0 || request.quantity as usize > MAX_READ_REGISTERS {
                return Err(ModbusError::invalid_data("read quantity out of range"));
            }
            PduBuilder::build_read_request(fc, request.address, request.quantity)
        }
        WriteSingleCoil => {
            PduBuilder::new()
                .function_code(fc)?
                .address(request.address)?
                .data(&request.data)?
                .build_ok()
        }
        WriteSingleRegister => {
            PduBuilder::new()
                .function_code(fc)?
                .address(request.address)?
                .data(&request.data)?
                .build_ok()
        }
        WriteMultipleCoils => {
            if request.quantity == 0 || request.quantity as usize > MAX_WRITE_COILS {
                return Err(ModbusError::invalid_data("write quantity out of range"));
            }
            PduBuilder::new()
                .function_code(fc)?
                .address(request.address)?
                .quantity(request.quantity)?
                .byte(request.data.len() as u8)?
                .data(&request.data)?
                .build_ok()
        }
        WriteMultipleRegisters => {
            if request.quantity == 0 || request.quantity as usize > MAX_WRITE_REGISTERS {
                return Err(ModbusError::invalid_data("write quantity out of range"));
            }
            PduBuilder::new()
                .function_code(fc)?
                .address(request.address)?
                .quantity(request.quantity)?
                .byte(request.data.len() as u8)?
                .data(&request.data)?
                .build_ok()
        }
        ReadWriteMultipleRegisters => {
            if request.quantity == 0 || request.quantity as usize > MAX_RW_READ_REGISTERS {
                return Err(ModbusError::invalid_data("rw read quantity out of range"));
            }
            if request.data.len() < 2 {
                return Err(ModbusError::invalid_data("rw request missing write address"));
            }
            let write_address = u16::from_be_bytes([request.data[0], request.data[1]]);
            let write_words = &request.data[2..];
            if write_words.len() % 2 != 0 || write_words.is_empty() {
                return Err(ModbusError::invalid_data("rw write payload malformed"));
            }
            let write_quantity = write_words.len() / 2;
            if write_quantity > MAX_RW_WRITE_REGISTERS {
                return Err(ModbusError::invalid_data("rw write quantity out of range"));
            }
            let write_values: Vec<u16> = write_words
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            PduBuilder::build_read_write_multiple_registers(
                request.address,
                request.quantity,
                write_address,
                &write_values,
            )
        }
    }
}

/// Decode a response PDU (function code byte already stripped of
/// exception handling) into a `ModbusResponse`, or the typed exception
/// error if the peer set the exception flag.
pub fn parse_response_pdu(
    function: ModbusFunction,
    slave_id: SlaveId,
    pdu: &[u8],
    transaction_id: u16,
) -> ModbusResult<ModbusResponse> {
    if pdu.is_empty() {
        return Err(ModbusError::Protocol {
            message: "empty response PDU".to_string(),
        });
    }
    let fc_byte = pdu[0];
    if fc_byte & EXCEPTION_FLAG != 0 {
        let exception_code = *pdu.get(1).ok_or_else(|| ModbusError::Protocol {
            message: "truncated exception response".to_string(),
        })?;
        debug!("exception response: fc={:#04x} code={}", fc_byte, exception_code);
        return Err(ModbusError::from_exception_code(exception_code));
    }
    Ok(ModbusResponse::new_success(slave_id, function, pdu[1..].to_vec())
        .with_transaction_id(transaction_id))
}

/// Wrap `pdu` in the 7-byte MBAP envelope used by TCP and UDP.
pub fn assemble_tcp_adu(transaction_id: u16, unit_id: u8, pdu: &ModbusPdu) -> Vec<u8> {
    let body = pdu.as_slice();
    let length = (1 + body.len()) as u16;
    let mut buf = Vec::with_capacity(7 + body.len());
    buf.extend_from_slice(&transaction_id.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&length.to_be_bytes());
    buf.push(unit_id);
    buf.extend_from_slice(body);
    buf
}

/// Wrap `pdu` in the unit-id + CRC envelope used by RTU.
pub fn assemble_rtu_adu(unit_id: u8, pdu: &ModbusPdu) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + pdu.len() + 2);
    buf.push(unit_id);
    buf.extend_from_slice(pdu.as_slice());
    let (lo, hi) = crc_bytes(crc16(&buf));
    buf.push(lo);
    buf.push(hi);
    buf
}

/// Parse a TCP/UDP MBAP ADU, returning `(transaction_id, unit_id, pdu_bytes)`.
pub fn parse_tcp_adu(buf: &[u8]) -> ModbusResult<(u16, u8, Vec<u8>)> {
    if buf.len() < MBAP_HEADER_LEN + 2 {
        return Err(ModbusError::Protocol {
            message: format!("MBAP frame too short: {} bytes", buf.len()),
        });
    }
    let transaction_id = u16::from_be_bytes([buf[0], buf[1]]);
    let protocol_id = u16::from_be_bytes([buf[2], buf[3]]);
    if protocol_id != 0 {
        return Err(ModbusError::Protocol {
            message: format!("unexpected MBAP protocol id: {}", protocol_id),
        });
    }
    let length = u16::from_be_bytes([buf[4], buf[5]]) as usize;
    if length == 0 || length > MAX_MBAP_LENGTH || buf.len() < MBAP_HEADER_LEN + length {
        return Err(ModbusError::Protocol {
            message: format!("invalid MBAP length field: {}", length),
        });
    }
    let unit_id = buf[MBAP_HEADER_LEN];
    let pdu = buf[MBAP_HEADER_LEN + 1..MBAP_HEADER_LEN + length].to_vec();
    Ok((transaction_id, unit_id, pdu))
}

/// Parse an RTU ADU of `buf[..len]` after `detect_valid_frame` confirmed
/// it is complete, returning `(unit_id, pdu_bytes)`.
pub fn parse_rtu_adu(buf: &[u8], len: usize) -> ModbusResult<(u8, Vec<u8>)> {
    if !detect_valid_frame(buf, len) {
        return Err(ModbusError::CrcCheckFailed);
    }
    let unit_id = buf[0];
    let pdu = buf[1..len - 2].to_vec();
    Ok((unit_id, pdu))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_write_single_coil_bytes() {
        let pdu = PduBuilder::build_write_single_coil(0x00AC, true).unwrap();
        assert_eq!(pdu.as_slice(), &[0x05, 0x00, 0xAC, 0xFF, 0x00]);
    }

    #[test]
    fn build_write_multiple_registers_bytes() {
        let pdu = PduBuilder::build_write_multiple_registers(0x0001, &[0x000A, 0x0102]).unwrap();
        assert_eq!(
            pdu.as_slice(),
            &[0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn scenario_1_tcp_read_holding_registers() {
        let request = ModbusRequest {
            slave_id: 17,
            function: ModbusFunction::ReadHoldingRegisters,
            address: 0x006B,
            quantity: 3,
            data: vec![],
        };
        let pdu = build_request_pdu(&request).unwrap();
        let adu = assemble_tcp_adu(1, 17, &pdu);
        assert_eq!(
            adu,
            vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x11, 0x03, 0x00, 0x6B, 0x00, 0x03]
        );

        let response_bytes = [
            0x00u8, 0x01, 0x00, 0x00, 0x00, 0x09, 0x11, 0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64,
        ];
        let (txid, unit_id, pdu_body) = parse_tcp_adu(&response_bytes).unwrap();
        assert_eq!(txid, 1);
        assert_eq!(unit_id, 17);
        let response =
            parse_response_pdu(ModbusFunction::ReadHoldingRegisters, unit_id, &pdu_body, txid).unwrap();
        assert_eq!(response.parse_registers().unwrap(), vec![0x022B, 0x0000, 0x0064]);
    }

    #[test]
    fn scenario_2_rtu_write_single_coil() {
        let pdu = PduBuilder::build_write_single_coil(0x00AC, true).unwrap();
        let adu = assemble_rtu_adu(0x11, &pdu);
        assert_eq!(adu, vec![0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00, 0x4E, 0x8B]);
    }

    #[test]
    fn scenario_3_tcp_write_multiple_registers() {
        let request = ModbusRequest {
            slave_id: 1,
            function: ModbusFunction::WriteMultipleRegisters,
            address: 1,
            quantity: 2,
            data: vec![0x00, 0x0A, 0x01, 0x02],
        };
        let pdu = build_request_pdu(&request).unwrap();
        let adu = assemble_tcp_adu(2, 1, &pdu);
        assert_eq!(
            adu,
            vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x0B, 0x01, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
    }

    #[test]
    fn scenario_5_exception_on_disabled_fc() {
        let response_bytes = [0x00u8, 0x03, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x01];
        let (txid, unit_id, pdu_body) = parse_tcp_adu(&response_bytes).unwrap();
        let err = parse_response_pdu(ModbusFunction::ReadHoldingRegisters, unit_id, &pdu_body, txid)
            .unwrap_err();
        match err {
            ModbusError::ModbusException { code, .. } => assert_eq!(code, 1),
            other => panic!("expected ModbusException, got {other:?}"),
        }
    }

    #[test]
    fn fc23_request_round_trip() {
        let request = ModbusRequest {
            slave_id: 1,
            function: ModbusFunction::ReadWriteMultipleRegisters,
            address: 0x0003,
            quantity: 2,
            data: vec![0x00, 0x0E, 0x00, 0xFF, 0x00, 0xFF],
        };
        let pdu = build_request_pdu(&request).unwrap();
        assert_eq!(
            pdu.as_slice(),
            &[0x17, 0x00, 0x03, 0x00, 0x02, 0x00, 0x0E, 0x00, 0x02, 0x04, 0x00, 0xFF, 0x00, 0xFF]
        );
    }

    #[test]
    fn rejects_oversized_read_quantity() {
        let request = ModbusRequest {
            slave_id: 1,
            function: ModbusFunction::ReadHoldingRegisters,
            address: 0,
            quantity: 126,
            data: vec![],
        };
        assert!(build_request_pdu(&request).is_err());
    }
}
