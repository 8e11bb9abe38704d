//! Driver-station impersonation.
//!
//! Some device firmware only emits console output while it believes a
//! control station is attached. [`FakeDriverStation`] holds the station's TCP
//! link open (discarding whatever arrives) and sends the minimal heartbeat
//! datagram every 20 ms. It decodes nothing.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use netconsole_transport::{Endpoint, TcpConnection, CONNECT_TIMEOUT};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};

/// Device port the station's TCP link connects to.
pub const DS_TCP_PORT: u16 = 1740;

/// Device port heartbeat datagrams are sent to.
pub const DS_UDP_PORT: u16 = 1110;

const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(20);

/// Heartbeat datagram: little-endian sequence, then a fixed control byte.
fn heartbeat(seq: u16) -> [u8; 6] {
    let [lo, hi] = seq.to_le_bytes();
    [lo, hi, 0x01, 0, 0, 0]
}

/// A running fake driver station. Stops on `stop()` or drop.
pub struct FakeDriverStation {
    running: Arc<AtomicBool>,
    link: Arc<TcpConnection>,
    threads: Vec<JoinHandle<()>>,
}

impl FakeDriverStation {
    /// Attach to the device at `host` on the standard station ports.
    pub fn start(host: &str) -> Result<Self> {
        Self::start_with_ports(host, DS_TCP_PORT, DS_UDP_PORT)
    }

    /// Attach using explicit ports.
    pub fn start_with_ports(host: &str, tcp_port: u16, udp_port: u16) -> Result<Self> {
        let link = Arc::new(TcpConnection::connect(
            &Endpoint::new(host, tcp_port),
            CONNECT_TIMEOUT,
        )?);

        let socket = heartbeat_socket(link.peer_addr().ip(), udp_port)?;

        let running = Arc::new(AtomicBool::new(true));
        let mut station = Self {
            running: Arc::clone(&running),
            link: Arc::clone(&link),
            threads: Vec::with_capacity(2),
        };

        let heartbeat_running = Arc::clone(&running);
        station.spawn("netconsole-ds-udp", move || {
            run_heartbeat(&socket, &heartbeat_running)
        })?;

        station.spawn("netconsole-ds-tcp", move || run_discard(&link, &running))?;

        info!(host, tcp_port, udp_port, "fake driver station attached");
        Ok(station)
    }

    /// Stop both threads and close the TCP link. Idempotent.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::AcqRel) {
            debug!("stopping fake driver station");
        }
        self.link.close();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                warn!("fake driver station thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn spawn(&mut self, name: &'static str, f: impl FnOnce() + Send + 'static) -> Result<()> {
        match thread::Builder::new().name(name.to_string()).spawn(f) {
            Ok(handle) => {
                self.threads.push(handle);
                Ok(())
            }
            Err(source) => {
                self.stop();
                Err(ClientError::Spawn { name, source })
            }
        }
    }
}

impl Drop for FakeDriverStation {
    fn drop(&mut self) {
        self.stop();
    }
}

/// UDP socket bound to the unspecified address of `device`'s family and
/// connected to `device:udp_port`.
fn heartbeat_socket(device: IpAddr, udp_port: u16) -> io::Result<UdpSocket> {
    let local = match device {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let socket = UdpSocket::bind(SocketAddr::new(local, 0))?;
    socket.connect(SocketAddr::new(device, udp_port))?;
    Ok(socket)
}

fn run_heartbeat(socket: &UdpSocket, running: &AtomicBool) {
    let mut seq: u16 = 0;
    while running.load(Ordering::Acquire) {
        seq = seq.wrapping_add(1);
        if let Err(err) = socket.send(&heartbeat(seq)) {
            // ICMP unreachable surfaces here as a transient error while the
            // device boots.
            debug!(error = %err, "heartbeat send failed");
        }
        thread::sleep(HEARTBEAT_INTERVAL);
    }
}

fn run_discard(link: &TcpConnection, running: &AtomicBool) {
    let mut byte = [0u8; 1];
    while running.load(Ordering::Acquire) {
        if let Err(err) = link.read_exact(&mut byte) {
            if running.load(Ordering::Acquire) {
                warn!(error = %err, "driver station link closed");
            }
            break;
        }
    }
}
