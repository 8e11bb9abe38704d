use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use netconsole_frame::{
    decode_header, encode_keepalive, tag_name, FrameError, Record, HEADER_SIZE,
};
use netconsole_transport::{reconnect_loop, ConnectConfig, Endpoint, TcpConnection};
use tracing::{debug, info, trace, warn};

use crate::error::{ClientError, Result};
use crate::handler::RecordHandler;
use crate::signal::ConnectSignal;

/// How often a live connection is probed.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(2);

/// Client timing configuration. Defaults are the protocol constants.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connect timeout and retry pause for the reconnect loop.
    pub connect: ConnectConfig,
    /// Interval between keepalive probes. Default: 2 s.
    pub keepalive_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect: ConnectConfig::default(),
            keepalive_interval: KEEPALIVE_INTERVAL,
        }
    }
}

/// Observable connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Constructed, not started.
    Idle,
    /// Started and waiting for a connection.
    Connecting,
    /// A live connection exists.
    Connected,
    /// Stopped; terminal.
    Stopped,
}

/// Where `start` runs the keepalive/reconnect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// On a background thread; `start` returns immediately.
    #[default]
    Background,
    /// On the calling thread; `start` returns after `stop`.
    Blocking,
}

struct State {
    running: bool,
    stopped: bool,
    connection: Option<Arc<TcpConnection>>,
}

impl State {
    fn connection_state(&self) -> ConnectionState {
        if self.stopped {
            ConnectionState::Stopped
        } else if self.connection.is_some() {
            ConnectionState::Connected
        } else if self.running {
            ConnectionState::Connecting
        } else {
            ConnectionState::Idle
        }
    }
}

enum KeepaliveStep {
    Probe(Arc<TcpConnection>),
    Reconnect,
    Exit,
}

/// State shared by the reader and keepalive threads. Every change is
/// followed by `notify_all` on `changed`.
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(State {
                running: false,
                stopped: false,
                connection: None,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a connection is available. `None` once stopped.
    fn wait_for_connection(&self) -> Option<Arc<TcpConnection>> {
        let state = self.lock();
        let state = self
            .changed
            .wait_while(state, |s| s.running && s.connection.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        if !state.running {
            return None;
        }
        state.connection.clone()
    }

    /// Wait up to `timeout` while connected, then decide what the keepalive
    /// thread does next.
    fn next_keepalive_step(&self, timeout: Duration) -> KeepaliveStep {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| s.running && s.connection.is_some())
            .unwrap_or_else(PoisonError::into_inner);
        if !state.running {
            return KeepaliveStep::Exit;
        }
        match &state.connection {
            Some(conn) => KeepaliveStep::Probe(Arc::clone(conn)),
            None => KeepaliveStep::Reconnect,
        }
    }

    /// Block for up to `timeout` unless stopped. Returns true once stopped.
    fn wait_stopped(&self, timeout: Duration) -> bool {
        let state = self.lock();
        if timeout.is_zero() {
            return !state.running;
        }
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| s.running)
            .unwrap_or_else(PoisonError::into_inner);
        !state.running
    }

    /// Publish a fresh connection. Returns false (and closes it) if the
    /// client stopped while connecting.
    fn install(&self, conn: Arc<TcpConnection>) -> bool {
        let mut state = self.lock();
        if !state.running {
            conn.close();
            return false;
        }
        state.connection = Some(conn);
        drop(state);
        self.changed.notify_all();
        true
    }

    /// Close `conn` and clear it if it is still the live connection.
    ///
    /// A failure observed on an already replaced connection never clears its
    /// successor.
    fn disconnect(&self, conn: &Arc<TcpConnection>, reason: &dyn fmt::Display) {
        let mut state = self.lock();
        conn.close();
        let current = state
            .connection
            .as_ref()
            .is_some_and(|live| Arc::ptr_eq(live, conn));
        if current {
            state.connection = None;
            warn!(peer = %conn.peer_addr(), %reason, "connection lost");
        } else {
            debug!(peer = %conn.peer_addr(), %reason, "stale connection closed");
        }
        drop(state);
        self.changed.notify_all();
    }
}

/// Netconsole client.
///
/// Owns at most one connection at a time. Records reach the handler strictly
/// in wire order because only the reader thread decodes and dispatches.
pub struct Client {
    shared: Arc<Shared>,
    config: ClientConfig,
    handler: Mutex<Option<Box<dyn RecordHandler>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Client {
    /// Create a client with the protocol's default timing.
    pub fn new(handler: impl RecordHandler) -> Self {
        Self::with_config(handler, ClientConfig::default())
    }

    /// Create a client with explicit timing.
    pub fn with_config(handler: impl RecordHandler, config: ClientConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            config,
            handler: Mutex::new(Some(Box::new(handler))),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Start connecting to `host:port` and dispatching records.
    ///
    /// `connect_signal` is set the first time a connection succeeds. With
    /// [`StartMode::Blocking`] this call returns only after [`Client::stop`]
    /// is called from another thread (or from the handler).
    pub fn start(
        &self,
        host: impl Into<String>,
        port: u16,
        connect_signal: Option<ConnectSignal>,
        mode: StartMode,
    ) -> Result<()> {
        let endpoint = Endpoint::new(host, port);

        let handler = {
            let mut state = self.shared.lock();
            if state.stopped {
                return Err(ClientError::Stopped);
            }
            if state.running {
                return Err(ClientError::AlreadyRunning);
            }
            let handler = self
                .handler
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .ok_or(ClientError::AlreadyRunning)?;
            state.running = true;
            handler
        };

        info!(%endpoint, ?mode, "starting netconsole client");

        let shared = Arc::clone(&self.shared);
        self.spawn("netconsole-reader", move || run_reader(&shared, handler))?;

        match mode {
            StartMode::Background => {
                let shared = Arc::clone(&self.shared);
                let config = self.config.clone();
                self.spawn("netconsole-keepalive", move || {
                    run_keepalive(&shared, &endpoint, &config, connect_signal)
                })?;
            }
            StartMode::Blocking => {
                run_keepalive(&self.shared, &endpoint, &self.config, connect_signal);
                self.join_threads();
            }
        }

        Ok(())
    }

    /// Stop both threads and close the connection.
    ///
    /// Idempotent and callable from any thread, including the handler.
    /// Waits for the background threads except the one it is called from.
    pub fn stop(&self) {
        let (conn, first) = {
            let mut state = self.shared.lock();
            let first = !state.stopped;
            state.running = false;
            state.stopped = true;
            (state.connection.take(), first)
        };
        if let Some(conn) = conn {
            conn.close();
        }
        self.shared.changed.notify_all();

        if first {
            info!("netconsole client stopped");
        }
        self.join_threads();
    }

    /// True iff a live connection currently exists.
    pub fn is_connected(&self) -> bool {
        self.shared.lock().connection.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().connection_state()
    }

    fn spawn(&self, name: &'static str, f: impl FnOnce() + Send + 'static) -> Result<()> {
        match thread::Builder::new().name(name.to_string()).spawn(f) {
            Ok(handle) => {
                self.threads
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(handle);
                Ok(())
            }
            Err(source) => {
                // The handler may already be gone with a spawned reader, so
                // the client cannot be started again.
                self.stop();
                Err(ClientError::Spawn { name, source })
            }
        }
    }

    fn join_threads(&self) {
        let current = thread::current().id();
        let handles: Vec<_> = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let name = handle.thread().name().unwrap_or("netconsole").to_string();
            if handle.join().is_err() {
                warn!(thread = %name, "client thread panicked");
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

fn run_reader(shared: &Shared, mut handler: Box<dyn RecordHandler>) {
    debug!("reader started");
    while let Some(conn) = shared.wait_for_connection() {
        if let Err(err) = read_frames(&conn, handler.as_mut()) {
            shared.disconnect(&conn, &err);
        }
    }
    debug!("reader stopped");
}

/// Read and dispatch frames until the connection fails.
///
/// Unknown tags are skipped by length so the stream stays aligned. A
/// zero-length header or a payload too short for its record means framing
/// can no longer be trusted, which is treated like a lost connection.
fn read_frames(conn: &TcpConnection, handler: &mut dyn RecordHandler) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE];
    let mut payload = Vec::new();

    loop {
        conn.read_exact(&mut header)?;
        let header = decode_header(&header);
        let len = header.payload_len().ok_or(FrameError::ZeroLength)?;

        payload.resize(len, 0);
        conn.read_exact(&mut payload)?;

        match Record::decode(header.tag, &payload)? {
            Some(record) => dispatch(handler, record),
            None => debug!(
                tag = header.tag,
                name = tag_name(header.tag),
                len,
                "skipping frame"
            ),
        }
    }
}

/// Hand `record` to the handler. A panicking handler loses that record only;
/// the reader keeps the stream.
fn dispatch(handler: &mut dyn RecordHandler, record: Record) {
    let tag = record.tag();
    if panic::catch_unwind(AssertUnwindSafe(|| handler.handle(record))).is_err() {
        warn!(tag, name = tag_name(tag), "record handler panicked; record dropped");
    }
}

fn run_keepalive(
    shared: &Shared,
    endpoint: &Endpoint,
    config: &ClientConfig,
    mut connect_signal: Option<ConnectSignal>,
) {
    debug!("keepalive started");
    loop {
        match shared.next_keepalive_step(config.keepalive_interval) {
            KeepaliveStep::Exit => break,
            KeepaliveStep::Probe(conn) => match conn.write_all(&encode_keepalive()) {
                Ok(()) => trace!("keepalive sent"),
                Err(err) => shared.disconnect(&conn, &err),
            },
            KeepaliveStep::Reconnect => {
                debug!(%endpoint, "connecting");
                let Some(conn) =
                    reconnect_loop(endpoint, &config.connect, |wait| shared.wait_stopped(wait))
                else {
                    continue;
                };
                if shared.install(Arc::new(conn)) {
                    if let Some(signal) = connect_signal.take() {
                        signal.set();
                    }
                }
            }
        }
    }
    debug!("keepalive stopped");
}
