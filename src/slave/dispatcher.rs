//! Validate-then-apply PDU dispatch (§4.5).
//!
//! Mirrors the parse → validate → process → finalize-response shape
//! common to Modbus slave implementations: the function code is
//! decoded once, every FC runs the same ordered validation pipeline
//! (quantity range, address range, value/bytecount checks), and only
//! then does the bank get mutated.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::EnabledFunctions;
use crate::constants::*;
use crate::logging::{CallbackLogger, LoggingMode, SlaveObserver};
use crate::protocol::{ModbusFunction, SlaveId};

use super::banks::Banks;

fn exception_pdu(fc: u8, code: u8) -> Vec<u8> {
    vec![fc | EXCEPTION_FLAG, code]
}

fn be16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Decodes and applies PDUs against a shared [`Banks`] instance.
/// `Clone` so each accepted TCP connection / UDP worker task can hold
/// its own handle onto the same banks and observer hooks.
#[derive(Clone)]
pub struct Dispatcher {
    banks: Arc<Banks>,
    unit_identifier: SlaveId,
    enabled: EnabledFunctions,
    observer: Option<SlaveObserver>,
    logger: CallbackLogger,
}

impl Dispatcher {
    pub fn new(unit_identifier: SlaveId, enabled: EnabledFunctions) -> Self {
        Self {
            banks: Arc::new(Banks::new()),
            unit_identifier,
            enabled,
            observer: None,
            logger: CallbackLogger::new(LoggingMode::All),
        }
    }

    pub fn with_banks(mut self, banks: Arc<Banks>) -> Self {
        self.banks = banks;
        self
    }

    /// Override which function codes are enabled, e.g. to keep a
    /// dispatcher in sync with its owning `SlaveConfig` (§6.2).
    pub fn with_enabled_functions(mut self, enabled: EnabledFunctions) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_observer(mut self, observer: SlaveObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_logger(mut self, logger: CallbackLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn banks(&self) -> &Arc<Banks> {
        &self.banks
    }

    pub fn observer(&self) -> Option<&SlaveObserver> {
        self.observer.as_ref()
    }

    pub fn history(&self) -> Vec<crate::logging::LoggedExchange> {
        self.logger.history()
    }

    /// Decode and apply one PDU addressed to `unit_id`. Returns `None`
    /// when the unit id matches neither this slave's configured
    /// identifier nor the broadcast id `0` (the frame is silently
    /// dropped per §4.5 item 1), or when it was a broadcast write (real
    /// Modbus peers do not expect a reply to those).
    pub fn dispatch(&self, unit_id: SlaveId, pdu: &[u8]) -> Option<Vec<u8>> {
        if unit_id != self.unit_identifier && unit_id != UNIT_ID_BROADCAST {
            return None;
        }
        let fc = pdu.first().copied().unwrap_or(0);
        self.logger.log_request(unit_id, fc, 0, 0, pdu);
        let response = self.process(pdu);
        self.logger.log_response(unit_id, fc, pdu, &response);
        if let Some(ref observer) = self.observer {
            if let Some(ref cb) = observer.on_log_data_changed {
                cb();
            }
        }
        if unit_id == UNIT_ID_BROADCAST {
            None
        } else {
            Some(response)
        }
    }

    fn process(&self, pdu: &[u8]) -> Vec<u8> {
        let Some(&fc) = pdu.first() else {
            return exception_pdu(0, EXCEPTION_ILLEGAL_FUNCTION);
        };
        let Ok(function) = ModbusFunction::from_u8(fc) else {
            warn!(fc, "slave received unsupported function code");
            return exception_pdu(fc, EXCEPTION_ILLEGAL_FUNCTION);
        };
        if !self.is_enabled(function) {
            debug!(?function, "function code disabled by configuration");
            return exception_pdu(fc, EXCEPTION_ILLEGAL_FUNCTION);
        }
        use ModbusFunction::*;
        match function {
            ReadCoils => self.handle_read_bits(fc, pdu, true),
            ReadDiscreteInputs => self.handle_read_bits(fc, pdu, false),
            ReadHoldingRegisters => self.handle_read_registers(fc, pdu, true),
            ReadInputRegisters => self.handle_read_registers(fc, pdu, false),
            WriteSingleCoil => self.handle_write_single_coil(fc, pdu),
            WriteSingleRegister => self.handle_write_single_register(fc, pdu),
            WriteMultipleCoils => self.handle_write_multiple_coils(fc, pdu),
            WriteMultipleRegisters => self.handle_write_multiple_registers(fc, pdu),
            ReadWriteMultipleRegisters => self.handle_read_write_multiple_registers(fc, pdu),
        }
    }

    fn is_enabled(&self, function: ModbusFunction) -> bool {
        use ModbusFunction::*;
        match function {
            ReadCoils => self.enabled.read_coils,
            ReadDiscreteInputs => self.enabled.read_discrete_inputs,
            ReadHoldingRegisters => self.enabled.read_holding_registers,
            ReadInputRegisters => self.enabled.read_input_registers,
            WriteSingleCoil => self.enabled.write_single_coil,
            WriteSingleRegister => self.enabled.write_single_register,
            WriteMultipleCoils => self.enabled.write_multiple_coils,
            WriteMultipleRegisters => self.enabled.write_multiple_registers,
            ReadWriteMultipleRegisters => self.enabled.read_write_multiple_registers,
        }
    }

    fn notify_coils_changed(&self, first_address: u16, count: u16) {
        if let Some(ref observer) = self.observer {
            if let Some(ref cb) = observer.on_coils_changed {
                cb(first_address + 1, count);
            }
        }
    }

    fn notify_holding_registers_changed(&self, first_address: u16, count: u16) {
        if let Some(ref observer) = self.observer {
            if let Some(ref cb) = observer.on_holding_registers_changed {
                cb(first_address + 1, count);
            }
        }
    }

    fn handle_read_bits(&self, fc: u8, pdu: &[u8], is_coils: bool) -> Vec<u8> {
        if pdu.len() < 5 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let address = be16(&pdu[1..3]);
        let quantity = be16(&pdu[3..5]);
        if quantity == 0 || quantity as usize > MAX_READ_COILS {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        if address as u32 + 1 + quantity as u32 > 65535 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_ADDRESS);
        }
        let bits = if is_coils {
            self.banks.read_coils(address, quantity)
        } else {
            self.banks.read_discrete_inputs(address, quantity)
        };
        let byte_count = bits.len().div_ceil(8);
        let mut bytes = vec![0u8; byte_count];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        let mut response = vec![fc, byte_count as u8];
        response.extend_from_slice(&bytes);
        response
    }

    fn handle_read_registers(&self, fc: u8, pdu: &[u8], is_holding: bool) -> Vec<u8> {
        if pdu.len() < 5 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let address = be16(&pdu[1..3]);
        let quantity = be16(&pdu[3..5]);
        if quantity == 0 || quantity as usize > MAX_READ_REGISTERS {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        if address as u32 + 1 + quantity as u32 > 65535 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_ADDRESS);
        }
        let registers = if is_holding {
            self.banks.read_holding_registers(address, quantity)
        } else {
            self.banks.read_input_registers(address, quantity)
        };
        let mut response = vec![fc, (registers.len() * 2) as u8];
        for value in registers {
            response.extend_from_slice(&value.to_be_bytes());
        }
        response
    }

    fn handle_write_single_coil(&self, fc: u8, pdu: &[u8]) -> Vec<u8> {
        if pdu.len() < 5 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let address = be16(&pdu[1..3]);
        let value = be16(&pdu[3..5]);
        if address as u32 + 1 + 1 > 65535 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_ADDRESS);
        }
        if value != 0x0000 && value != 0xFF00 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        self.banks.write_single_coil(address, value == 0xFF00);
        self.notify_coils_changed(address, 1);
        pdu[..5].to_vec()
    }

    fn handle_write_single_register(&self, fc: u8, pdu: &[u8]) -> Vec<u8> {
        if pdu.len() < 5 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let address = be16(&pdu[1..3]);
        let value = be16(&pdu[3..5]);
        if address as u32 + 1 + 1 > 65535 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_ADDRESS);
        }
        self.banks.write_single_register(address, value);
        self.notify_holding_registers_changed(address, 1);
        pdu[..5].to_vec()
    }

    fn handle_write_multiple_coils(&self, fc: u8, pdu: &[u8]) -> Vec<u8> {
        if pdu.len() < 6 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let address = be16(&pdu[1..3]);
        let quantity = be16(&pdu[3..5]);
        let byte_count = pdu[5] as usize;
        if quantity == 0 || quantity as usize > MAX_WRITE_COILS {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        if address as u32 + 1 + quantity as u32 > 65535 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_ADDRESS);
        }
        let expected_bytes = (quantity as usize).div_ceil(8);
        if byte_count != expected_bytes || pdu.len() < 6 + byte_count {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let coil_bytes = &pdu[6..6 + byte_count];
        let values: Vec<bool> = (0..quantity as usize)
            .map(|i| (coil_bytes[i / 8] >> (i % 8)) & 1 != 0)
            .collect();
        self.banks.write_multiple_coils(address, &values);
        self.notify_coils_changed(address, quantity);
        pdu[..5].to_vec()
    }

    fn handle_write_multiple_registers(&self, fc: u8, pdu: &[u8]) -> Vec<u8> {
        if pdu.len() < 6 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let address = be16(&pdu[1..3]);
        let quantity = be16(&pdu[3..5]);
        let byte_count = pdu[5] as usize;
        if quantity == 0 || quantity as usize > MAX_WRITE_REGISTERS {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        if address as u32 + 1 + quantity as u32 > 65535 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_ADDRESS);
        }
        if byte_count != quantity as usize * 2 || pdu.len() < 6 + byte_count {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let values: Vec<u16> = pdu[6..6 + byte_count].chunks_exact(2).map(be16).collect();
        self.banks.write_multiple_registers(address, &values);
        self.notify_holding_registers_changed(address, quantity);
        pdu[..5].to_vec()
    }

    fn handle_read_write_multiple_registers(&self, fc: u8, pdu: &[u8]) -> Vec<u8> {
        if pdu.len() < 10 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let read_address = be16(&pdu[1..3]);
        let read_quantity = be16(&pdu[3..5]);
        let write_address = be16(&pdu[5..7]);
        let write_quantity = be16(&pdu[7..9]);
        let write_byte_count = pdu[9] as usize;
        if read_quantity == 0 || read_quantity as usize > MAX_RW_READ_REGISTERS {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        if write_quantity == 0 || write_quantity as usize > MAX_RW_WRITE_REGISTERS {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        if write_byte_count != write_quantity as usize * 2 {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        if read_address as u32 + 1 + read_quantity as u32 > 65535
            || write_address as u32 + 1 + write_quantity as u32 > 65535
        {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_ADDRESS);
        }
        if pdu.len() < 10 + write_byte_count {
            return exception_pdu(fc, EXCEPTION_ILLEGAL_DATA_VALUE);
        }
        let write_values: Vec<u16> = pdu[10..10 + write_byte_count].chunks_exact(2).map(be16).collect();
        let read_values = self
            .banks
            .read_write_multiple_registers(read_address, read_quantity, write_address, &write_values);
        self.notify_holding_registers_changed(write_address, write_quantity);
        let mut response = vec![fc, (read_values.len() * 2) as u8];
        for value in read_values {
            response.extend_from_slice(&value.to_be_bytes());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    #[test]
    fn drops_frame_with_foreign_unit_id() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        assert!(dispatcher.dispatch(2, &[0x03, 0x00, 0x00, 0x00, 0x01]).is_none());
    }

    #[test]
    fn broadcast_write_applies_but_sends_no_reply() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        let pdu = [0x06, 0x00, 0x00, 0x00, 0x2A];
        assert!(dispatcher.dispatch(UNIT_ID_BROADCAST, &pdu).is_none());
        assert_eq!(dispatcher.banks().read_holding_registers(0, 1), vec![0x2A]);
    }

    #[test]
    fn disabled_function_returns_illegal_function_exception() {
        let mut enabled = EnabledFunctions::default();
        enabled.read_holding_registers = false;
        let dispatcher = Dispatcher::new(1, enabled);
        let response = dispatcher
            .dispatch(1, &[0x03, 0x00, 0x00, 0x00, 0x01])
            .unwrap();
        assert_eq!(response, vec![0x83, 0x01]);
    }

    #[test]
    fn read_holding_registers_happy_path() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        dispatcher.banks().write_multiple_registers(0x6B, &[0x022B, 0x0000, 0x0064]);
        let response = dispatcher
            .dispatch(1, &[0x03, 0x00, 0x6B, 0x00, 0x03])
            .unwrap();
        assert_eq!(response, vec![0x03, 0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64]);
    }

    #[test]
    fn oversized_read_quantity_is_illegal_data_value() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        let response = dispatcher
            .dispatch(1, &[0x03, 0x00, 0x00, 0x00, 0xFA])
            .unwrap();
        assert_eq!(response, vec![0x83, 0x03]);
    }

    #[test]
    fn address_overflow_is_illegal_data_address() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        let response = dispatcher
            .dispatch(1, &[0x03, 0xFF, 0xFF, 0x00, 0x02])
            .unwrap();
        assert_eq!(response, vec![0x83, 0x02]);
    }

    #[test]
    fn write_single_coil_rejects_invalid_value() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        let response = dispatcher
            .dispatch(1, &[0x05, 0x00, 0x00, 0x12, 0x34])
            .unwrap();
        assert_eq!(response, vec![0x85, 0x03]);
    }

    #[test]
    fn write_single_coil_rejects_top_of_address_space() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        // 0xFFFE = 65534: address + 1 (implicit quantity) + 1 > 65535.
        let response = dispatcher
            .dispatch(1, &[0x05, 0xFF, 0xFE, 0xFF, 0x00])
            .unwrap();
        assert_eq!(response, vec![0x85, 0x02]);
    }

    #[test]
    fn write_single_register_rejects_top_of_address_space() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        let response = dispatcher
            .dispatch(1, &[0x06, 0xFF, 0xFE, 0x00, 0x01])
            .unwrap();
        assert_eq!(response, vec![0x86, 0x02]);
    }

    #[test]
    fn write_single_coil_echoes_request_on_success() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        let response = dispatcher
            .dispatch(1, &[0x05, 0x00, 0xAC, 0xFF, 0x00])
            .unwrap();
        assert_eq!(response, vec![0x05, 0x00, 0xAC, 0xFF, 0x00]);
        assert_eq!(dispatcher.banks().read_coils(0x00AC, 1), vec![true]);
    }

    #[test]
    fn read_write_multiple_registers_writes_then_reads() {
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
        dispatcher.banks().write_multiple_registers(0x03, &[0x00, 0x00, 0x00]);
        let request = [
            0x17, 0x00, 0x03, 0x00, 0x01, 0x00, 0x0E, 0x00, 0x01, 0x02, 0x00, 0xFF,
        ];
        let response = dispatcher.dispatch(1, &request).unwrap();
        assert_eq!(response, vec![0x17, 0x02, 0x00, 0x00]);
        assert_eq!(dispatcher.banks().read_holding_registers(0x0E, 1), vec![0x00FF]);
    }

    #[test]
    fn observer_hooks_fire_on_write() {
        let first_address = StdArc::new(AtomicU16::new(0));
        let count = StdArc::new(AtomicU16::new(0));
        let calls = StdArc::new(AtomicUsize::new(0));
        let (fa, c, n) = (first_address.clone(), count.clone(), calls.clone());
        let observer = SlaveObserver {
            on_coils_changed: Some(std::sync::Arc::new(move |addr: u16, qty: u16| {
                fa.store(addr, Ordering::SeqCst);
                c.store(qty, Ordering::SeqCst);
                n.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(1, EnabledFunctions::default()).with_observer(observer);
        dispatcher.dispatch(1, &[0x05, 0x00, 0xAC, 0xFF, 0x00]).unwrap();
        assert_eq!(first_address.load(Ordering::SeqCst), 0x00AD);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
