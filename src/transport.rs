//! Transport adapters: TCP, UDP, and (optionally) RTU serial (§4.4,
//! §4.6). Each implements the common [`ModbusTransport`] send/receive
//! contract; the master transaction engine in `client.rs` is generic
//! over it.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use crate::constants::*;
use crate::crc::detect_valid_frame;
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{assemble_rtu_adu, assemble_tcp_adu, build_request_pdu, parse_response_pdu, parse_rtu_adu, parse_tcp_adu};
use crate::protocol::{ModbusRequest, ModbusResponse, SlaveId};

/// Per-transport counters exposed to callers via `get_stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportStats {
    pub requests_sent: u64,
    pub responses_received: u64,
    pub errors: u64,
    pub retries: u64,
}

/// Common contract every transport implements. The master engine in
/// `client.rs` is generic over this trait rather than over a concrete
/// stream type.
pub trait ModbusTransport {
    /// Send `request` and return the decoded response, or the typed
    /// error if it failed, timed out, or the peer raised an exception.
    fn request(
        &mut self,
        request: &ModbusRequest,
    ) -> impl std::future::Future<Output = ModbusResult<ModbusResponse>> + Send;

    /// Whether the transport currently believes it has a usable
    /// connection (TCP socket, RTU port) or is simply ready (UDP).
    fn is_connected(&self) -> bool;

    /// Release the underlying resource. Further `request` calls fail
    /// with `NotConnected`/`SerialPortNotOpen`.
    fn close(&mut self) -> impl std::future::Future<Output = ModbusResult<()>> + Send;

    fn get_stats(&self) -> TransportStats;
}

/// The §4.6 RTU silent-interval approximation, in milliseconds.
///
/// Clamped to a 1ms floor so pathologically high baud rates never
/// collapse the frame-boundary window to zero.
pub fn silent_interval_ms(baud_rate: u32) -> u64 {
    (4000 / baud_rate.max(1) as u64).max(1)
}

// ============================================================================
// TCP
// ============================================================================

/// Modbus TCP transport: one MBAP-framed ADU per request/response over
/// a persistent stream.
pub struct TcpTransport {
    stream: TcpStream,
    timeout: Duration,
    transaction_id: u16,
    connected: bool,
    stats: TransportStats,
}

impl TcpTransport {
    pub async fn new(addr: SocketAddr, timeout: Duration) -> ModbusResult<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ModbusError::timeout("tcp connect", timeout.as_millis() as u64))?
            .map_err(ModbusError::Io)?;
        Ok(Self {
            stream,
            timeout,
            transaction_id: 0,
            connected: true,
            stats: TransportStats::default(),
        })
    }
}

impl ModbusTransport for TcpTransport {
    async fn request(&mut self, request: &ModbusRequest) -> ModbusResult<ModbusResponse> {
        if !self.connected {
            return Err(ModbusError::NotConnected);
        }

        self.transaction_id = self.transaction_id.wrapping_add(1);
        let transaction_id = self.transaction_id;

        let pdu = build_request_pdu(request)?;
        let adu = assemble_tcp_adu(transaction_id, request.slave_id, &pdu);

        tokio::time::timeout(self.timeout, self.stream.write_all(&adu))
            .await
            .map_err(|_| ModbusError::timeout("tcp write", self.timeout.as_millis() as u64))?
            .map_err(ModbusError::Io)?;
        self.stats.requests_sent += 1;

        let mut header = [0u8; MBAP_HEADER_LEN + 1];
        tokio::time::timeout(self.timeout, self.stream.read_exact(&mut header))
            .await
            .map_err(|_| ModbusError::timeout("tcp header", self.timeout.as_millis() as u64))?
            .map_err(ModbusError::Io)?;

        let length = u16::from_be_bytes([header[4], header[5]]) as usize;
        if length == 0 || length > MAX_MBAP_LENGTH {
            self.stats.errors += 1;
            return Err(ModbusError::Protocol {
                message: format!("invalid MBAP length field: {length}"),
            });
        }

        let mut rest = vec![0u8; length - 1];
        tokio::time::timeout(self.timeout, self.stream.read_exact(&mut rest))
            .await
            .map_err(|_| ModbusError::timeout("tcp body", self.timeout.as_millis() as u64))?
            .map_err(ModbusError::Io)?;

        let mut full = Vec::with_capacity(header.len() + rest.len());
        full.extend_from_slice(&header);
        full.extend_from_slice(&rest);

        let (resp_txid, unit_id, pdu_body) = parse_tcp_adu(&full)?;
        self.stats.responses_received += 1;
        parse_response_pdu(request.function, unit_id, &pdu_body, resp_txid)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) -> ModbusResult<()> {
        self.connected = false;
        self.stream.shutdown().await.map_err(ModbusError::Io)
    }

    fn get_stats(&self) -> TransportStats {
        self.stats
    }
}

// ============================================================================
// UDP
// ============================================================================

/// Modbus UDP transport: one MBAP-framed ADU per datagram, no
/// connection-oriented retry semantics (§4.4: "TCP and UDP operations
/// do not retry").
pub struct UdpTransport {
    socket: UdpSocket,
    timeout: Duration,
    transaction_id: u16,
    connected: bool,
    stats: TransportStats,
}

impl UdpTransport {
    pub async fn new(addr: SocketAddr, timeout: Duration) -> ModbusResult<Self> {
        let local: SocketAddr = if addr.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let socket = UdpSocket::bind(local).await.map_err(ModbusError::Io)?;
        socket.connect(addr).await.map_err(ModbusError::Io)?;
        Ok(Self {
            socket,
            timeout,
            transaction_id: 0,
            connected: true,
            stats: TransportStats::default(),
        })
    }
}

impl ModbusTransport for UdpTransport {
    async fn request(&mut self, request: &ModbusRequest) -> ModbusResult<ModbusResponse> {
        if !self.connected {
            return Err(ModbusError::NotConnected);
        }

        self.transaction_id = self.transaction_id.wrapping_add(1);
        let transaction_id = self.transaction_id;

        let pdu = build_request_pdu(request)?;
        let adu = assemble_tcp_adu(transaction_id, request.slave_id, &pdu);

        tokio::time::timeout(self.timeout, self.socket.send(&adu))
            .await
            .map_err(|_| ModbusError::timeout("udp send", self.timeout.as_millis() as u64))?
            .map_err(ModbusError::Io)?;
        self.stats.requests_sent += 1;

        let mut buf = vec![0u8; MODBUS_RESPONSE_BUFFER_SIZE];
        let n = tokio::time::timeout(self.timeout, self.socket.recv(&mut buf))
            .await
            .map_err(|_| ModbusError::timeout("udp recv", self.timeout.as_millis() as u64))?
            .map_err(ModbusError::Io)?;

        let (resp_txid, unit_id, pdu_body) = parse_tcp_adu(&buf[..n])?;
        self.stats.responses_received += 1;
        parse_response_pdu(request.function, unit_id, &pdu_body, resp_txid)
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

// ============================================================================
// RTU (serial)
// ============================================================================

#[cfg(feature = "rtu")]
mod rtu_impl {
    use super::*;
    use tokio_serial::SerialPortBuilderExt;

    /// Modbus RTU transport: silent-interval-delimited frames over a
    /// serial port, with bounded retry on CRC mismatch or timeout
    /// (§4.4).
    pub struct RtuTransport {
        port: tokio_serial::SerialStream,
        baud_rate: u32,
        timeout: Duration,
        number_of_retries: u32,
        packet_logging: bool,
        is_open: bool,
        stats: TransportStats,
    }

    impl RtuTransport {
        pub fn new(port_name: &str, baud_rate: u32) -> ModbusResult<Self> {
            Self::new_with_config(
                port_name,
                baud_rate,
                tokio_serial::DataBits::Eight,
                tokio_serial::StopBits::One,
                tokio_serial::Parity::None,
                Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS),
            )
        }

        pub fn new_with_config(
            port_name: &str,
            baud_rate: u32,
            data_bits: tokio_serial::DataBits,
            stop_bits: tokio_serial::StopBits,
            parity: tokio_serial::Parity,
            timeout: Duration,
        ) -> ModbusResult<Self> {
            let port = tokio_serial::new(port_name, baud_rate)
                .data_bits(data_bits)
                .stop_bits(stop_bits)
                .parity(parity)
                .open_native_async()
                .map_err(|e| ModbusError::connection(format!("failed to open {port_name}: {e}")))?;

            Ok(Self {
                port,
                baud_rate,
                timeout,
                number_of_retries: DEFAULT_NUMBER_OF_RETRIES,
                packet_logging: false,
                is_open: true,
                stats: TransportStats::default(),
            })
        }

        pub fn set_packet_logging(&mut self, enabled: bool) {
            self.packet_logging = enabled;
        }

        /// Accumulate bytes until a complete, CRC-valid frame addressed
        /// to `expected_unit` (or the broadcast id) is read, or the
        /// deadline passes (§4.6, §4.7).
        async fn read_response(&mut self, expected_unit: SlaveId, deadline: Instant) -> ModbusResult<Vec<u8>> {
            let mut buf = vec![0u8; RTU_BUFFER_SIZE];
            let mut pos = 0usize;
            let mut last_byte_at: Option<Instant> = None;
            let silent = Duration::from_millis(silent_interval_ms(self.baud_rate));
            let mut saw_candidate = false;

            loop {
                let now = Instant::now();
                if now >= deadline {
                    return Err(if saw_candidate {
                        ModbusError::CrcCheckFailed
                    } else {
                        ModbusError::timeout("rtu response", self.timeout.as_millis() as u64)
                    });
                }

                if let Some(last) = last_byte_at {
                    if pos > 0 && now.duration_since(last) > silent {
                        pos = 0;
                    }
                }

                let poll = deadline.saturating_duration_since(now).min(Duration::from_millis(5));
                match tokio::time::timeout(poll, self.port.read(&mut buf[pos..])).await {
                    Err(_) => continue,
                    Ok(Ok(0)) => continue,
                    Ok(Ok(n)) => {
                        pos += n;
                        last_byte_at = Some(Instant::now());
                        if detect_valid_frame(&buf, pos) {
                            if buf[0] == expected_unit || expected_unit == UNIT_ID_BROADCAST {
                                return Ok(buf[..pos].to_vec());
                            }
                            pos = 0;
                        } else if pos >= 6 {
                            saw_candidate = true;
                        }
                    }
                    Ok(Err(e)) => return Err(ModbusError::Io(e)),
                }
            }
        }
    }

    impl ModbusTransport for RtuTransport {
        async fn request(&mut self, request: &ModbusRequest) -> ModbusResult<ModbusResponse> {
            if !self.is_open {
                return Err(ModbusError::SerialPortNotOpen);
            }

            let pdu = build_request_pdu(request)?;
            let adu = assemble_rtu_adu(request.slave_id, &pdu);

            let mut attempt = 0u32;
            loop {
                self.port.write_all(&adu).await.map_err(ModbusError::Io)?;
                self.stats.requests_sent += 1;
                if self.packet_logging {
                    tracing::trace!(unit_id = request.slave_id, bytes = adu.len(), "rtu request sent");
                }

                let deadline = Instant::now() + self.timeout;
                match self.read_response(request.slave_id, deadline).await {
                    Ok(raw) => {
                        let (unit_id, pdu_body) = parse_rtu_adu(&raw, raw.len())?;
                        self.stats.responses_received += 1;
                        return parse_response_pdu(request.function, unit_id, &pdu_body, 0);
                    }
                    Err(err @ ModbusError::TimeoutExpired { .. }) | Err(err @ ModbusError::CrcCheckFailed) => {
                        self.stats.errors += 1;
                        if attempt >= self.number_of_retries {
                            return Err(err);
                        }
                        attempt += 1;
                        self.stats.retries += 1;
                    }
                    Err(other) => return Err(other),
                }
            }
        }

        fn is_connected(&self) -> bool {
            self.is_open
        }

        async fn close(&mut self) -> ModbusResult<()> {
            self.is_open = false;
            Ok(())
        }

        fn get_stats(&self) -> TransportStats {
            self.stats
        }
    }
}

#[cfg(feature = "rtu")]
pub use rtu_impl::RtuTransport;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_interval_matches_documented_formula() {
        assert_eq!(silent_interval_ms(9600), 1);
        assert_eq!(silent_interval_ms(115_200), 1);
    }

    #[test]
    fn silent_interval_never_zero() {
        assert!(silent_interval_ms(u32::MAX) >= 1);
    }
}
