//! Optional callback-based observation hooks (§6.3), layered
//! independently of the crate's `tracing` instrumentation (§6.4).
//!
//! A caller who wants structured logs installs a `tracing` subscriber;
//! a caller who wants typed per-ADU callbacks registers one of the
//! hooks here instead. Neither is required for correct protocol
//! operation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::constants::PROTOCOL_LOG_CAPACITY;

/// Severity of a single retained log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Whether the callback logger records every request/response pair or
/// only failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    #[default]
    All,
    ErrorsOnly,
    Disabled,
}

/// A single retained request/response pair (§6.3's bounded ring).
#[derive(Debug, Clone)]
pub struct LoggedExchange {
    pub slave_id: u8,
    pub function_code: u8,
    pub request: Vec<u8>,
    pub response: Vec<u8>,
}

pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Per-request/response callback hooks plus the bounded 100-entry
/// history ring required by §6.3.
#[derive(Clone, Default)]
pub struct CallbackLogger {
    mode: LoggingMode,
    callback: Option<LogCallback>,
    history: Arc<Mutex<VecDeque<LoggedExchange>>>,
}

impl CallbackLogger {
    pub fn new(mode: LoggingMode) -> Self {
        Self {
            mode,
            callback: None,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(PROTOCOL_LOG_CAPACITY))),
        }
    }

    pub fn with_callback(mode: LoggingMode, callback: LogCallback) -> Self {
        Self {
            mode,
            callback: Some(callback),
            history: Arc::new(Mutex::new(VecDeque::with_capacity(PROTOCOL_LOG_CAPACITY))),
        }
    }

    pub fn log_request(&self, slave_id: u8, function_code: u8, address: u16, quantity: u16, data: &[u8]) {
        if self.mode == LoggingMode::Disabled {
            return;
        }
        if let Some(ref cb) = self.callback {
            cb(
                LogLevel::Debug,
                &format!(
                    "tx unit={slave_id} fc={function_code:#04x} addr={address} qty={quantity} data={data:02x?}"
                ),
            );
        }
    }

    pub fn log_response(&self, slave_id: u8, function_code: u8, request: &[u8], response: &[u8]) {
        if self.mode == LoggingMode::Disabled {
            return;
        }
        let is_exception = response.first().map(|&b| b & crate::constants::EXCEPTION_FLAG != 0).unwrap_or(false);
        if self.mode == LoggingMode::ErrorsOnly && !is_exception {
            return;
        }
        if let Some(ref cb) = self.callback {
            let level = if is_exception { LogLevel::Warn } else { LogLevel::Debug };
            cb(
                level,
                &format!("rx unit={slave_id} fc={function_code:#04x} data={response:02x?}"),
            );
        }
        self.record(slave_id, function_code, request, response);
    }

    /// Append an exchange to the bounded history ring, evicting the
    /// oldest entry once at capacity.
    fn record(&self, slave_id: u8, function_code: u8, request: &[u8], response: &[u8]) {
        let mut history = self.history.lock().unwrap();
        if history.len() >= PROTOCOL_LOG_CAPACITY {
            history.pop_front();
        }
        history.push_back(LoggedExchange {
            slave_id,
            function_code,
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Snapshot of the retained history, oldest first.
    pub fn history(&self) -> Vec<LoggedExchange> {
        self.history.lock().unwrap().iter().cloned().collect()
    }
}

impl std::fmt::Debug for CallbackLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackLogger")
            .field("mode", &self.mode)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Master-side connection state change, surfaced via
/// `on_connected_changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

/// Observer hooks for the master engine (§6.3).
#[derive(Clone, Default)]
pub struct MasterObserver {
    pub on_send_data: Option<Arc<dyn Fn(&[u8]) + Send + Sync>>,
    pub on_receive_data: Option<Arc<dyn Fn(&[u8]) + Send + Sync>>,
    pub on_connected_changed: Option<Arc<dyn Fn(ConnectionEvent) + Send + Sync>>,
}

impl std::fmt::Debug for MasterObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterObserver").finish()
    }
}

/// Observer hooks for the slave dispatcher/listener (§6.3).
#[derive(Clone, Default)]
pub struct SlaveObserver {
    pub on_coils_changed: Option<Arc<dyn Fn(u16, u16) + Send + Sync>>,
    pub on_holding_registers_changed: Option<Arc<dyn Fn(u16, u16) + Send + Sync>>,
    pub on_connection_count_changed: Option<Arc<dyn Fn(usize) + Send + Sync>>,
    pub on_log_data_changed: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl std::fmt::Debug for SlaveObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlaveObserver").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn disabled_mode_skips_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let logger = CallbackLogger::with_callback(
            LoggingMode::Disabled,
            Arc::new(move |_, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        logger.log_request(1, 0x03, 0, 1, &[]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn history_ring_is_bounded() {
        let logger = CallbackLogger::new(LoggingMode::All);
        for i in 0..(PROTOCOL_LOG_CAPACITY + 10) {
            logger.log_response(1, 0x03, &[], &[i as u8]);
        }
        assert_eq!(logger.history().len(), PROTOCOL_LOG_CAPACITY);
    }
}
