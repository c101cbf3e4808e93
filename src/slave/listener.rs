//! TCP/UDP/RTU front ends that feed decoded ADUs to a [`Dispatcher`]
//! (§4.6). The TCP accept loop and its idle reaper follow the same
//! shape as a relay's connection manager: a shared `last_active` map,
//! a background sweep comparing against a configured timeout.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

use crate::config::{SlaveConfig, TransportMode};
use crate::constants::*;
use crate::crc::{crc16, crc_bytes};
use crate::error::{ModbusError, ModbusResult};
use crate::frame::parse_tcp_adu;
use crate::protocol::SlaveId;

use super::dispatcher::Dispatcher;

/// How often the accept/receive loops poll `should_stop` between
/// blocking operations.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn assemble_tcp_response(transaction_id: u16, unit_id: SlaveId, pdu: &[u8]) -> Vec<u8> {
    let length = (1 + pdu.len()) as u16;
    let mut buf = Vec::with_capacity(7 + pdu.len());
    buf.extend_from_slice(&transaction_id.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&length.to_be_bytes());
    buf.push(unit_id);
    buf.extend_from_slice(pdu);
    buf
}

#[cfg(feature = "rtu")]
fn assemble_rtu_response(unit_id: SlaveId, pdu: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + pdu.len() + 2);
    buf.push(unit_id);
    buf.extend_from_slice(pdu);
    let (lo, hi) = crc_bytes(crc16(&buf));
    buf.push(lo);
    buf.push(hi);
    buf
}

/// Serves one [`SlaveConfig`]'s chosen transport, dispatching every
/// decoded ADU to a shared [`Dispatcher`].
pub struct SlaveListener {
    dispatcher: Dispatcher,
    config: SlaveConfig,
    should_stop: Arc<AtomicBool>,
    local_addr: Arc<Mutex<Option<SocketAddr>>>,
}

impl SlaveListener {
    /// `config.enabled_functions` (§6.2) is the source of truth for
    /// which function codes this listener's dispatcher accepts: it
    /// overrides whatever `dispatcher` was constructed with.
    pub fn new(dispatcher: Dispatcher, config: SlaveConfig) -> Self {
        let dispatcher = dispatcher.with_enabled_functions(config.enabled_functions);
        Self {
            dispatcher,
            config,
            should_stop: Arc::new(AtomicBool::new(false)),
            local_addr: Arc::new(Mutex::new(None)),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The TCP/UDP socket address actually bound by `serve`, once bound.
    /// Useful when the configured port is `0` and the OS picks one.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap()
    }

    /// Signal every running accept/receive loop to exit at its next
    /// poll (§5's `stop_listening`). Does not itself join the task; the
    /// caller awaits whatever `JoinHandle` it spawned `serve` on.
    pub fn stop_listening(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
    }

    pub async fn serve(&self) -> ModbusResult<()> {
        match self.config.mode.clone() {
            TransportMode::Tcp { addr, port } => self.serve_tcp(addr, port).await,
            TransportMode::Udp { addr, port } => self.serve_udp(addr, port).await,
            #[cfg(feature = "rtu")]
            TransportMode::Rtu {
                port_name,
                baud_rate,
                parity,
                stop_bits,
            } => self.serve_rtu(&port_name, baud_rate, parity, stop_bits).await,
            #[cfg(not(feature = "rtu"))]
            TransportMode::Rtu { .. } => Err(ModbusError::configuration(
                "RTU slave mode requires the `rtu` feature",
            )),
        }
    }

    async fn serve_tcp(&self, addr: std::net::IpAddr, port: u16) -> ModbusResult<()> {
        let listener = TcpListener::bind((addr, port)).await.map_err(ModbusError::Io)?;
        *self.local_addr.lock().unwrap() = listener.local_addr().ok();
        let clients: Arc<Mutex<HashMap<SocketAddr, Instant>>> = Arc::new(Mutex::new(HashMap::new()));

        if !self.config.tcp_idle_timeout.is_zero() {
            let clients = clients.clone();
            let should_stop = self.should_stop.clone();
            let idle_timeout = self.config.tcp_idle_timeout;
            tokio::spawn(async move {
                while !should_stop.load(Ordering::SeqCst) {
                    tokio::time::sleep(POLL_INTERVAL).await;
                    let now = Instant::now();
                    clients
                        .lock()
                        .unwrap()
                        .retain(|_, last_active| now.duration_since(*last_active) <= idle_timeout);
                }
            });
        }

        while !self.should_stop.load(Ordering::SeqCst) {
            let accepted = tokio::time::timeout(POLL_INTERVAL, listener.accept()).await;
            let (stream, peer) = match accepted {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(ModbusError::Io(e)),
                Err(_) => continue,
            };
            if !self.config.tcp_peer_allowlist.is_empty() && !self.config.tcp_peer_allowlist.contains(&peer.ip()) {
                tracing::warn!(%peer, "rejecting TCP peer not on allowlist");
                continue;
            }
            clients.lock().unwrap().insert(peer, Instant::now());
            if let Some(observer) = self.dispatcher.observer() {
                if let Some(ref cb) = observer.on_connection_count_changed {
                    cb(clients.lock().unwrap().len());
                }
            }
            let dispatcher = self.dispatcher.clone();
            let clients = clients.clone();
            tokio::spawn(async move {
                Self::handle_tcp_client(stream, peer, dispatcher, clients).await;
            });
        }
        Ok(())
    }

    async fn handle_tcp_client(
        mut stream: TcpStream,
        peer: SocketAddr,
        dispatcher: Dispatcher,
        clients: Arc<Mutex<HashMap<SocketAddr, Instant>>>,
    ) {
        let mut header = [0u8; MBAP_HEADER_LEN + 1];
        loop {
            if stream.read_exact(&mut header).await.is_err() {
                break;
            }
            let length = u16::from_be_bytes([header[4], header[5]]) as usize;
            if length == 0 || length > MAX_MBAP_LENGTH {
                break;
            }
            let mut rest = vec![0u8; length - 1];
            if stream.read_exact(&mut rest).await.is_err() {
                break;
            }
            clients.lock().unwrap().insert(peer, Instant::now());

            let mut frame = Vec::with_capacity(header.len() + rest.len());
            frame.extend_from_slice(&header);
            frame.extend_from_slice(&rest);
            let Ok((transaction_id, unit_id, pdu)) = parse_tcp_adu(&frame) else {
                break;
            };
            if let Some(response_pdu) = dispatcher.dispatch(unit_id, &pdu) {
                let adu = assemble_tcp_response(transaction_id, unit_id, &response_pdu);
                if stream.write_all(&adu).await.is_err() {
                    break;
                }
            }
        }
        clients.lock().unwrap().remove(&peer);
    }

    async fn serve_udp(&self, addr: std::net::IpAddr, port: u16) -> ModbusResult<()> {
        let socket = Arc::new(UdpSocket::bind((addr, port)).await.map_err(ModbusError::Io)?);
        *self.local_addr.lock().unwrap() = socket.local_addr().ok();
        let mut buf = vec![0u8; MODBUS_RESPONSE_BUFFER_SIZE];

        while !self.should_stop.load(Ordering::SeqCst) {
            let received = tokio::time::timeout(POLL_INTERVAL, socket.recv_from(&mut buf)).await;
            let (n, peer) = match received {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(ModbusError::Io(e)),
                Err(_) => continue,
            };
            let datagram = buf[..n].to_vec();
            let dispatcher = self.dispatcher.clone();
            let socket = socket.clone();
            tokio::spawn(async move {
                let Ok((transaction_id, unit_id, pdu)) = parse_tcp_adu(&datagram) else {
                    return;
                };
                if let Some(response_pdu) = dispatcher.dispatch(unit_id, &pdu) {
                    let adu = assemble_tcp_response(transaction_id, unit_id, &response_pdu);
                    let _ = socket.send_to(&adu, peer).await;
                }
            });
        }
        Ok(())
    }

    #[cfg(feature = "rtu")]
    async fn serve_rtu(
        &self,
        port_name: &str,
        baud_rate: u32,
        parity: crate::config::Parity,
        stop_bits: crate::config::StopBits,
    ) -> ModbusResult<()> {
        use crate::crc::detect_valid_frame;
        use crate::transport::silent_interval_ms;
        use tokio_serial::SerialPortBuilderExt;

        let mut port = tokio_serial::new(port_name, baud_rate)
            .parity(parity)
            .stop_bits(stop_bits)
            .open_native_async()
            .map_err(|e| ModbusError::connection(format!("failed to open {port_name}: {e}")))?;

        let mut buf = vec![0u8; RTU_BUFFER_SIZE];
        let mut pos = 0usize;
        let mut last_byte_at: Option<Instant> = None;
        let silent = Duration::from_millis(silent_interval_ms(baud_rate));

        while !self.should_stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if let Some(last) = last_byte_at {
                if pos > 0 && now.duration_since(last) > silent {
                    pos = 0;
                }
            }
            match tokio::time::timeout(Duration::from_millis(5), port.read(&mut buf[pos..])).await {
                Err(_) => continue,
                Ok(Ok(0)) => continue,
                Ok(Ok(n)) => {
                    pos += n;
                    last_byte_at = Some(Instant::now());
                    if detect_valid_frame(&buf, pos) {
                        let unit_id = buf[0];
                        let pdu = buf[1..pos - 2].to_vec();
                        if let Some(response_pdu) = self.dispatcher.dispatch(unit_id, &pdu) {
                            let adu = assemble_rtu_response(unit_id, &response_pdu);
                            let _ = port.write_all(&adu).await;
                        }
                        pos = 0;
                    }
                }
                Ok(Err(e)) => return Err(ModbusError::Io(e)),
            }
        }
        Ok(())
    }
}
