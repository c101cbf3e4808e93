//! Master transaction engine: a transport-generic client plus thin
//! TCP/UDP/RTU wrappers (§4.4, §5).
//!
//! [`GenericModbusClient`] owns the request/response bookkeeping common
//! to every transport — building the typed [`ModbusRequest`], handing it
//! to the transport, and decoding the typed [`ModbusResponse`] back into
//! the caller's plain `bool`/`u16` vectors. Quantity and address-range
//! validation happens once, in [`crate::frame::build_request_pdu`]; this
//! module does not duplicate it.

use std::net::SocketAddr;
use std::time::Duration;

use crate::constants::*;
use crate::error::ModbusResult;
use crate::frame::build_request_pdu;
use crate::logging::{CallbackLogger, ConnectionEvent, MasterObserver};
use crate::protocol::{ModbusFunction, ModbusRequest, SlaveId};
use crate::transport::{ModbusTransport, TcpTransport, TransportStats, UdpTransport};

#[cfg(feature = "rtu")]
use crate::transport::RtuTransport;

fn pack_coils(values: &[bool]) -> Vec<u8> {
    let byte_count = values.len().div_ceil(8);
    let mut bytes = vec![0u8; byte_count];
    for (i, &value) in values.iter().enumerate() {
        if value {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

fn pack_registers(values: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 2);
    for &value in values {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes
}

fn parse_bits(function: ModbusFunction, data: &[u8]) -> ModbusResult<Vec<bool>> {
    crate::protocol::ModbusResponse::new_success(0, function, data.to_vec()).parse_bits()
}

fn parse_registers(function: ModbusFunction, data: &[u8]) -> ModbusResult<Vec<u16>> {
    crate::protocol::ModbusResponse::new_success(0, function, data.to_vec()).parse_registers()
}

/// The master-side operations this crate supports (§1, §4.4).
pub trait ModbusClient {
    fn read_coils(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<bool>>> + Send;

    fn read_discrete_inputs(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<bool>>> + Send;

    fn read_holding_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u16>>> + Send;

    fn read_input_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        quantity: u16,
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u16>>> + Send;

    fn write_single_coil(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: bool,
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    fn write_single_register(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        value: u16,
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    fn write_multiple_coils(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[bool],
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    fn write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        address: u16,
        values: &[u16],
    ) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    /// FC23: atomically write `write_values` starting at `write_address`
    /// and read `read_quantity` registers starting at `read_address`,
    /// returning the read side.
    fn read_write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        read_address: u16,
        read_quantity: u16,
        write_address: u16,
        write_values: &[u16],
    ) -> impl std::future::Future<Output = ModbusResult<Vec<u16>>> + Send;
}

/// Transport-generic client. TCP, UDP, and RTU wrappers below are thin
/// facades over this.
pub struct GenericModbusClient<T: ModbusTransport> {
    transport: T,
    logger: Option<CallbackLogger>,
    observer: Option<MasterObserver>,
}

impl<T: ModbusTransport + Send> GenericModbusClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            logger: None,
            observer: None,
        }
    }

    pub fn with_logger(transport: T, logger: CallbackLogger) -> Self {
        Self {
            transport,
            logger: Some(logger),
            observer: None,
        }
    }

    /// Attach the §6.3 `on_send_data`/`on_receive_data`/`on_connected_changed`
    /// observer hooks. Independent of [`with_logger`]; both may be set.
    pub fn with_observer(mut self, observer: MasterObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn get_stats(&self) -> TransportStats {
        self.transport.get_stats()
    }

    pub async fn close(&mut self) -> ModbusResult<()> {
        let result = self.transport.close().await;
        if let Some(ref observer) = self.observer {
            if let Some(ref cb) = observer.on_connected_changed {
                cb(ConnectionEvent::Disconnected);
            }
        }
        result
    }

    async fn execute_request(&mut self, request: ModbusRequest) -> ModbusResult<Vec<u8>> {
        let fc = request.function.to_u8();
        let request_pdu = build_request_pdu(&request).ok();
        if let Some(ref logger) = self.logger {
            logger.log_request(request.slave_id, fc, request.address, request.quantity, &request.data);
        }
        if let Some(ref observer) = self.observer {
            if let Some(ref cb) = observer.on_send_data {
                if let Some(ref pdu) = request_pdu {
                    cb(pdu.as_slice());
                }
            }
        }
        let response = self.transport.request(&request).await?;
        if let Some(ref logger) = self.logger {
            let sent = request_pdu.as_ref().map(|p| p.as_slice()).unwrap_or(&[]);
            logger.log_response(response.slave_id, fc, sent, response.data());
        }
        if let Some(ref observer) = self.observer {
            if let Some(ref cb) = observer.on_receive_data {
                cb(response.data());
            }
        }
        Ok(response.data().to_vec())
    }
}

impl<T: ModbusTransport + Send> ModbusClient for GenericModbusClient<T> {
    async fn read_coils(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::ReadCoils,
            address,
            quantity,
            data: vec![],
        };
        let fc = request.function;
        let data = self.execute_request(request).await?;
        let mut bits = parse_bits(fc, &data)?;
        bits.truncate(quantity as usize);
        Ok(bits)
    }

    async fn read_discrete_inputs(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::ReadDiscreteInputs,
            address,
            quantity,
            data: vec![],
        };
        let fc = request.function;
        let data = self.execute_request(request).await?;
        let mut bits = parse_bits(fc, &data)?;
        bits.truncate(quantity as usize);
        Ok(bits)
    }

    async fn read_holding_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::ReadHoldingRegisters,
            address,
            quantity,
            data: vec![],
        };
        let fc = request.function;
        let data = self.execute_request(request).await?;
        let mut regs = parse_registers(fc, &data)?;
        regs.truncate(quantity as usize);
        Ok(regs)
    }

    async fn read_input_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::ReadInputRegisters,
            address,
            quantity,
            data: vec![],
        };
        let fc = request.function;
        let data = self.execute_request(request).await?;
        let mut regs = parse_registers(fc, &data)?;
        regs.truncate(quantity as usize);
        Ok(regs)
    }

    async fn write_single_coil(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()> {
        let coil_value: u16 = if value { 0xFF00 } else { 0x0000 };
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::WriteSingleCoil,
            address,
            quantity: 0,
            data: coil_value.to_be_bytes().to_vec(),
        };
        self.execute_request(request).await.map(|_| ())
    }

    async fn write_single_register(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::WriteSingleRegister,
            address,
            quantity: 0,
            data: value.to_be_bytes().to_vec(),
        };
        self.execute_request(request).await.map(|_| ())
    }

    async fn write_multiple_coils(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::WriteMultipleCoils,
            address,
            quantity: values.len() as u16,
            data: pack_coils(values),
        };
        self.execute_request(request).await.map(|_| ())
    }

    async fn write_multiple_registers(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()> {
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::WriteMultipleRegisters,
            address,
            quantity: values.len() as u16,
            data: pack_registers(values),
        };
        self.execute_request(request).await.map(|_| ())
    }

    async fn read_write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        read_address: u16,
        read_quantity: u16,
        write_address: u16,
        write_values: &[u16],
    ) -> ModbusResult<Vec<u16>> {
        let mut data = write_address.to_be_bytes().to_vec();
        data.extend_from_slice(&pack_registers(write_values));
        let request = ModbusRequest {
            slave_id,
            function: ModbusFunction::ReadWriteMultipleRegisters,
            address: read_address,
            quantity: read_quantity,
            data,
        };
        let fc = request.function;
        let data = self.execute_request(request).await?;
        let mut regs = parse_registers(fc, &data)?;
        regs.truncate(read_quantity as usize);
        Ok(regs)
    }
}

// ============================================================================
// TCP
// ============================================================================

/// Modbus TCP master client.
pub struct ModbusTcpClient {
    inner: GenericModbusClient<TcpTransport>,
}

impl ModbusTcpClient {
    pub async fn new(addr: SocketAddr, timeout: Duration) -> ModbusResult<Self> {
        let transport = TcpTransport::new(addr, timeout).await?;
        Ok(Self {
            inner: GenericModbusClient::new(transport),
        })
    }

    pub async fn with_logging(addr: SocketAddr, timeout: Duration, logger: CallbackLogger) -> ModbusResult<Self> {
        let transport = TcpTransport::new(addr, timeout).await?;
        Ok(Self {
            inner: GenericModbusClient::with_logger(transport, logger),
        })
    }

    pub async fn with_observer(addr: SocketAddr, timeout: Duration, observer: MasterObserver) -> ModbusResult<Self> {
        let transport = TcpTransport::new(addr, timeout).await?;
        Ok(Self {
            inner: GenericModbusClient::new(transport).with_observer(observer),
        })
    }

    /// Connect using the default timeout (§6.2).
    pub async fn from_address(addr: SocketAddr) -> ModbusResult<Self> {
        Self::new(addr, Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS)).await
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn get_stats(&self) -> TransportStats {
        self.inner.get_stats()
    }

    pub async fn close(&mut self) -> ModbusResult<()> {
        self.inner.close().await
    }
}

impl ModbusClient for ModbusTcpClient {
    async fn read_coils(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.inner.read_coils(slave_id, address, quantity).await
    }

    async fn read_discrete_inputs(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.inner.read_discrete_inputs(slave_id, address, quantity).await
    }

    async fn read_holding_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.inner.read_holding_registers(slave_id, address, quantity).await
    }

    async fn read_input_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.inner.read_input_registers(slave_id, address, quantity).await
    }

    async fn write_single_coil(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()> {
        self.inner.write_single_coil(slave_id, address, value).await
    }

    async fn write_single_register(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        self.inner.write_single_register(slave_id, address, value).await
    }

    async fn write_multiple_coils(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
        self.inner.write_multiple_coils(slave_id, address, values).await
    }

    async fn write_multiple_registers(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.inner.write_multiple_registers(slave_id, address, values).await
    }

    async fn read_write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        read_address: u16,
        read_quantity: u16,
        write_address: u16,
        write_values: &[u16],
    ) -> ModbusResult<Vec<u16>> {
        self.inner
            .read_write_multiple_registers(slave_id, read_address, read_quantity, write_address, write_values)
            .await
    }
}

// ============================================================================
// UDP
// ============================================================================

/// Modbus UDP master client. No retry: §4.4 specifies that TCP/UDP
/// operations surface a timeout directly rather than retrying.
pub struct ModbusUdpClient {
    inner: GenericModbusClient<UdpTransport>,
}

impl ModbusUdpClient {
    pub async fn new(addr: SocketAddr, timeout: Duration) -> ModbusResult<Self> {
        let transport = UdpTransport::new(addr, timeout).await?;
        Ok(Self {
            inner: GenericModbusClient::new(transport),
        })
    }

    pub async fn with_logging(addr: SocketAddr, timeout: Duration, logger: CallbackLogger) -> ModbusResult<Self> {
        let transport = UdpTransport::new(addr, timeout).await?;
        Ok(Self {
            inner: GenericModbusClient::with_logger(transport, logger),
        })
    }

    pub async fn from_address(addr: SocketAddr) -> ModbusResult<Self> {
        Self::new(addr, Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS)).await
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn get_stats(&self) -> TransportStats {
        self.inner.get_stats()
    }

    pub async fn close(&mut self) -> ModbusResult<()> {
        self.inner.close().await
    }
}

impl ModbusClient for ModbusUdpClient {
    async fn read_coils(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.inner.read_coils(slave_id, address, quantity).await
    }

    async fn read_discrete_inputs(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.inner.read_discrete_inputs(slave_id, address, quantity).await
    }

    async fn read_holding_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.inner.read_holding_registers(slave_id, address, quantity).await
    }

    async fn read_input_registers(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<u16>> {
        self.inner.read_input_registers(slave_id, address, quantity).await
    }

    async fn write_single_coil(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()> {
        self.inner.write_single_coil(slave_id, address, value).await
    }

    async fn write_single_register(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
        self.inner.write_single_register(slave_id, address, value).await
    }

    async fn write_multiple_coils(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
        self.inner.write_multiple_coils(slave_id, address, values).await
    }

    async fn write_multiple_registers(&mut self, slave_id: SlaveId, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.inner.write_multiple_registers(slave_id, address, values).await
    }

    async fn read_write_multiple_registers(
        &mut self,
        slave_id: SlaveId,
        read_address: u16,
        read_quantity: u16,
        write_address: u16,
        write_values: &[u16],
    ) -> ModbusResult<Vec<u16>> {
        self.inner
            .read_write_multiple_registers(slave_id, read_address, read_quantity, write_address, write_values)
            .await
    }
}

// ============================================================================
// RTU (serial)
// ============================================================================

#[cfg(feature = "rtu")]
pub use rtu_client::ModbusRtuClient;

#[cfg(feature = "rtu")]
mod rtu_client {
    use super::*;

    /// Modbus RTU master client over a serial port.
    pub struct ModbusRtuClient {
        inner: GenericModbusClient<RtuTransport>,
    }

    impl ModbusRtuClient {
        pub fn new(port_name: &str, baud_rate: u32) -> ModbusResult<Self> {
            let transport = RtuTransport::new(port_name, baud_rate)?;
            Ok(Self {
                inner: GenericModbusClient::new(transport),
            })
        }

        pub fn with_logging(port_name: &str, baud_rate: u32, logger: CallbackLogger) -> ModbusResult<Self> {
            let transport = RtuTransport::new(port_name, baud_rate)?;
            Ok(Self {
                inner: GenericModbusClient::with_logger(transport, logger),
            })
        }

        #[allow(clippy::too_many_arguments)]
        pub fn with_config(
            port_name: &str,
            baud_rate: u32,
            data_bits: tokio_serial::DataBits,
            stop_bits: tokio_serial::StopBits,
            parity: tokio_serial::Parity,
            timeout: Duration,
        ) -> ModbusResult<Self> {
            let transport =
                RtuTransport::new_with_config(port_name, baud_rate, data_bits, stop_bits, parity, timeout)?;
            Ok(Self {
                inner: GenericModbusClient::new(transport),
            })
        }

        pub fn set_packet_logging(&mut self, enabled: bool) {
            self.inner.transport_mut().set_packet_logging(enabled);
        }

        pub fn is_connected(&self) -> bool {
            self.inner.is_connected()
        }

        pub fn get_stats(&self) -> TransportStats {
            self.inner.get_stats()
        }

        pub async fn close(&mut self) -> ModbusResult<()> {
            self.inner.close().await
        }
    }

    impl ModbusClient for ModbusRtuClient {
        async fn read_coils(&mut self, slave_id: SlaveId, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
            self.inner.read_coils(slave_id, address, quantity).await
        }

        async fn read_discrete_inputs(
            &mut self,
            slave_id: SlaveId,
            address: u16,
            quantity: u16,
        ) -> ModbusResult<Vec<bool>> {
            self.inner.read_discrete_inputs(slave_id, address, quantity).await
        }

        async fn read_holding_registers(
            &mut self,
            slave_id: SlaveId,
            address: u16,
            quantity: u16,
        ) -> ModbusResult<Vec<u16>> {
            self.inner.read_holding_registers(slave_id, address, quantity).await
        }

        async fn read_input_registers(
            &mut self,
            slave_id: SlaveId,
            address: u16,
            quantity: u16,
        ) -> ModbusResult<Vec<u16>> {
            self.inner.read_input_registers(slave_id, address, quantity).await
        }

        async fn write_single_coil(&mut self, slave_id: SlaveId, address: u16, value: bool) -> ModbusResult<()> {
            self.inner.write_single_coil(slave_id, address, value).await
        }

        async fn write_single_register(&mut self, slave_id: SlaveId, address: u16, value: u16) -> ModbusResult<()> {
            self.inner.write_single_register(slave_id, address, value).await
        }

        async fn write_multiple_coils(&mut self, slave_id: SlaveId, address: u16, values: &[bool]) -> ModbusResult<()> {
            self.inner.write_multiple_coils(slave_id, address, values).await
        }

        async fn write_multiple_registers(
            &mut self,
            slave_id: SlaveId,
            address: u16,
            values: &[u16],
        ) -> ModbusResult<()> {
            self.inner.write_multiple_registers(slave_id, address, values).await
        }

        async fn read_write_multiple_registers(
            &mut self,
            slave_id: SlaveId,
            read_address: u16,
            read_quantity: u16,
            write_address: u16,
            write_values: &[u16],
        ) -> ModbusResult<Vec<u16>> {
            self.inner
                .read_write_multiple_registers(slave_id, read_address, read_quantity, write_address, write_values)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModbusError;
    use crate::protocol::ModbusResponse;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed queue of responses and records every request it
    /// was asked to send, for testing `GenericModbusClient` without a
    /// real socket.
    struct MockTransport {
        responses: Mutex<VecDeque<ModbusResult<ModbusResponse>>>,
        requests: Mutex<Vec<ModbusRequest>>,
        connected: bool,
        stats: TransportStats,
    }

    impl MockTransport {
        fn new(responses: Vec<ModbusResult<ModbusResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                connected: true,
                stats: TransportStats::default(),
            }
        }
    }

    impl ModbusTransport for MockTransport {
        async fn request(&mut self, request: &ModbusRequest) -> ModbusResult<ModbusResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.stats.requests_sent += 1;
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(resp)) => {
                    self.stats.responses_received += 1;
                    Ok(resp)
                }
                Some(Err(err)) => {
                    self.stats.errors += 1;
                    Err(err)
                }
                None => Err(ModbusError::NotConnected),
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn close(&mut self) -> ModbusResult<()> {
            self.connected = false;
            Ok(())
        }

        fn get_stats(&self) -> TransportStats {
            self.stats
        }
    }

    #[tokio::test]
    async fn read_holding_registers_truncates_to_quantity() {
        let transport = MockTransport::new(vec![Ok(ModbusResponse::new_success(
            1,
            ModbusFunction::ReadHoldingRegisters,
            vec![0x06, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03],
        ))]);
        let mut client = GenericModbusClient::new(transport);
        let regs = client.read_holding_registers(1, 0, 3).await.unwrap();
        assert_eq!(regs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn write_single_coil_encodes_on_value() {
        let transport = MockTransport::new(vec![Ok(ModbusResponse::new_success(
            1,
            ModbusFunction::WriteSingleCoil,
            vec![0x00, 0xAC, 0xFF, 0x00],
        ))]);
        let mut client = GenericModbusClient::new(transport);
        client.write_single_coil(1, 0x00AC, true).await.unwrap();
        let sent = &client.transport().requests.lock().unwrap()[0];
        assert_eq!(sent.data, vec![0xFF, 0x00]);
    }

    #[tokio::test]
    async fn read_write_multiple_registers_round_trip() {
        let transport = MockTransport::new(vec![Ok(ModbusResponse::new_success(
            1,
            ModbusFunction::ReadWriteMultipleRegisters,
            vec![0x02, 0x00, 0x7E],
        ))]);
        let mut client = GenericModbusClient::new(transport);
        let regs = client
            .read_write_multiple_registers(1, 0x03, 1, 0x0E, &[0x00FF])
            .await
            .unwrap();
        assert_eq!(regs, vec![0x007E]);
    }

    #[tokio::test]
    async fn propagates_exception_from_transport() {
        let transport = MockTransport::new(vec![Err(ModbusError::from_exception_code(2))]);
        let mut client = GenericModbusClient::new(transport);
        let err = client.read_coils(1, 0, 1).await.unwrap_err();
        assert!(matches!(err, ModbusError::ModbusException { code: 2, .. }));
    }
}
