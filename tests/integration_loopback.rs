//! Loopback TCP master-against-slave integration tests (§6.6, §8).
//!
//! Each test spins up a [`SlaveListener`] on an OS-assigned port,
//! connects a [`ModbusTcpClient`] to it, and exercises one of §8's
//! concrete scenarios end to end through the real wire codec.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use modbus_stack::{
    Dispatcher, EnabledFunctions, ModbusClient, ModbusError, ModbusTcpClient, SlaveConfig, SlaveListener,
    TransportMode,
};

async fn spawn_slave(dispatcher: Dispatcher, enabled: EnabledFunctions) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let mode = TransportMode::Tcp {
        addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
    };
    let config = SlaveConfig::new(mode).unwrap().with_enabled_functions(enabled);
    let listener = std::sync::Arc::new(SlaveListener::new(dispatcher, config));

    let serve_handle = {
        let listener = listener.clone();
        tokio::spawn(async move {
            let _ = listener.serve().await;
        })
    };

    let mut addr = None;
    for _ in 0..100 {
        if let Some(a) = listener.local_addr() {
            addr = Some(a);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    (addr.expect("slave never bound a local address"), serve_handle)
}

#[tokio::test]
async fn scenario_read_holding_registers() {
    let dispatcher = Dispatcher::new(17, EnabledFunctions::default());
    dispatcher.banks().write_multiple_registers(0x006B, &[555, 0, 100]);
    let (addr, _server) = spawn_slave(dispatcher, EnabledFunctions::default()).await;

    let mut client = ModbusTcpClient::new(addr, Duration::from_secs(1)).await.unwrap();
    let values = client.read_holding_registers(17, 0x006B, 3).await.unwrap();
    assert_eq!(values, vec![555, 0, 100]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn scenario_write_multiple_registers_then_read_back() {
    let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
    let (addr, _server) = spawn_slave(dispatcher, EnabledFunctions::default()).await;

    let mut client = ModbusTcpClient::new(addr, Duration::from_secs(1)).await.unwrap();
    client
        .write_multiple_registers(1, 0x0001, &[0x000A, 0x0102])
        .await
        .unwrap();
    let values = client.read_holding_registers(1, 0x0001, 2).await.unwrap();
    assert_eq!(values, vec![0x000A, 0x0102]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn scenario_read_coils_on_empty_bank_returns_all_off() {
    let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
    let (addr, _server) = spawn_slave(dispatcher, EnabledFunctions::default()).await;

    let mut client = ModbusTcpClient::new(addr, Duration::from_secs(1)).await.unwrap();
    let coils = client.read_coils(1, 0, 16).await.unwrap();
    assert_eq!(coils, vec![false; 16]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn scenario_disabled_function_code_yields_illegal_function_exception() {
    let mut enabled = EnabledFunctions::default();
    enabled.read_holding_registers = false;
    let dispatcher = Dispatcher::new(1, enabled);
    let (addr, _server) = spawn_slave(dispatcher, enabled).await;

    let mut client = ModbusTcpClient::new(addr, Duration::from_secs(1)).await.unwrap();
    let err = client.read_holding_registers(1, 0, 1).await.unwrap_err();
    assert!(matches!(
        err,
        ModbusError::ModbusException { code, .. } if code == 1
    ));

    client.close().await.unwrap();
}

#[tokio::test]
async fn scenario_write_single_coil_round_trip() {
    let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
    let (addr, _server) = spawn_slave(dispatcher, EnabledFunctions::default()).await;

    let mut client = ModbusTcpClient::new(addr, Duration::from_secs(1)).await.unwrap();
    client.write_single_coil(1, 0x00AC, true).await.unwrap();
    let coils = client.read_coils(1, 0x00AC, 1).await.unwrap();
    assert_eq!(coils, vec![true]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn scenario_read_write_multiple_registers_is_atomic() {
    let dispatcher = Dispatcher::new(1, EnabledFunctions::default());
    dispatcher.banks().write_multiple_registers(0x03, &[10, 20, 30]);
    let (addr, _server) = spawn_slave(dispatcher, EnabledFunctions::default()).await;

    let mut client = ModbusTcpClient::new(addr, Duration::from_secs(1)).await.unwrap();
    let read_back = client
        .read_write_multiple_registers(1, 0x03, 3, 0x01, &[99])
        .await
        .unwrap();
    assert_eq!(read_back, vec![10, 99, 30]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn unit_id_mismatch_drops_the_frame() {
    let dispatcher = Dispatcher::new(5, EnabledFunctions::default());
    let (addr, _server) = spawn_slave(dispatcher, EnabledFunctions::default()).await;

    let mut client = ModbusTcpClient::new(addr, Duration::from_millis(300)).await.unwrap();
    let result = client.read_holding_registers(9, 0, 1).await;
    assert!(matches!(result, Err(ModbusError::TimeoutExpired { .. })));

    client.close().await.unwrap();
}
