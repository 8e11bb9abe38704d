use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// TCP port the device serves netconsole on.
pub const DEFAULT_PORT: u16 = 1741;

/// A host/port pair the client connects to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Endpoint on the standard netconsole port.
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                endpoint: self.to_string(),
                source,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::Resolve {
                endpoint: self.to_string(),
                source: std::io::Error::new(ErrorKind::NotFound, "no addresses found"),
            });
        }
        Ok(addrs)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A live TCP connection to the device.
///
/// All operations take `&self`, so one connection can be shared between a
/// blocked reader and a thread that writes keepalives or closes it.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer: SocketAddr,
    closed: AtomicBool,
}

impl TcpConnection {
    /// Connect to `endpoint`, trying each resolved address within `timeout`.
    ///
    /// On success Nagle buffering is disabled and reads block without a
    /// timeout.
    pub fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        let mut last_err = None;

        for addr in endpoint.resolve()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    let conn = Self::from_stream(stream)?;
                    info!(%endpoint, peer = %conn.peer, "connected");
                    return Ok(conn);
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            endpoint: endpoint.to_string(),
            source: last_err
                .unwrap_or_else(|| std::io::Error::new(ErrorKind::NotFound, "no addresses tried")),
        })
    }

    /// Wrap an already connected stream, applying the same socket options as
    /// [`TcpConnection::connect`].
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(None)?;
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream,
            peer,
            closed: AtomicBool::new(false),
        })
    }

    /// Fill `buf` completely (blocking).
    ///
    /// EOF before `buf` is full, or any socket error, is reported as
    /// [`TransportError::ConnectionLost`]; a partial read is never returned.
    pub fn read_exact(&self, buf: &mut [u8]) -> Result<()> {
        let mut stream = &self.stream;
        stream
            .read_exact(buf)
            .map_err(TransportError::ConnectionLost)
    }

    /// Write all of `data` and flush.
    pub fn write_all(&self, data: &[u8]) -> Result<()> {
        let mut stream = &self.stream;
        stream
            .write_all(data)
            .and_then(|()| stream.flush())
            .map_err(TransportError::ConnectionLost)
    }

    /// Shut the socket down in both directions.
    ///
    /// Idempotent and safe from any thread. A thread blocked in
    /// [`TcpConnection::read_exact`] returns `ConnectionLost` afterwards.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => debug!(peer = %self.peer, "connection closed"),
            Err(err) if err.kind() == ErrorKind::NotConnected => {}
            Err(err) => debug!(peer = %self.peer, error = %err, "shutdown failed"),
        }
    }

    /// Whether [`TcpConnection::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Address of the connected device.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, Endpoint::new("127.0.0.1", port))
    }

    #[test]
    fn connect_sets_nodelay_and_blocking_reads() {
        let (listener, endpoint) = listener();
        let conn = TcpConnection::connect(&endpoint, Duration::from_secs(3)).unwrap();
        let _server = listener.accept().unwrap();

        assert!(conn.stream.nodelay().unwrap());
        assert_eq!(conn.stream.read_timeout().unwrap(), None);
        assert_eq!(conn.peer_addr(), listener.local_addr().unwrap());
    }

    #[test]
    fn read_exact_and_write_all() {
        let (listener, endpoint) = listener();
        let conn = TcpConnection::connect(&endpoint, Duration::from_secs(3)).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        server.write_all(b"abc").unwrap();
        let mut buf = [0u8; 3];
        conn.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");

        conn.write_all(&[0, 0]).unwrap();
        let mut keepalive = [0xFFu8; 2];
        server.read_exact(&mut keepalive).unwrap();
        assert_eq!(keepalive, [0, 0]);
    }

    #[test]
    fn short_read_is_connection_lost() {
        let (listener, endpoint) = listener();
        let conn = TcpConnection::connect(&endpoint, Duration::from_secs(3)).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        server.write_all(b"ab").unwrap();
        drop(server);

        let mut buf = [0u8; 3];
        let err = conn.read_exact(&mut buf).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionLost(_)));
    }

    #[test]
    fn close_unblocks_reader() {
        let (listener, endpoint) = listener();
        let conn = Arc::new(TcpConnection::connect(&endpoint, Duration::from_secs(3)).unwrap());
        let _server = listener.accept().unwrap();

        let reader = {
            let conn = Arc::clone(&conn);
            thread::spawn(move || {
                let mut buf = [0u8; 1];
                conn.read_exact(&mut buf)
            })
        };

        thread::sleep(Duration::from_millis(50));
        conn.close();
        conn.close();
        assert!(conn.is_closed());

        let result = reader.join().unwrap();
        assert!(matches!(result, Err(TransportError::ConnectionLost(_))));
    }

    #[test]
    fn refused_connect_is_connect_error() {
        let (listener, endpoint) = listener();
        drop(listener);

        let err = TcpConnection::connect(&endpoint, Duration::from_secs(3)).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[test]
    fn endpoint_display_and_default_port() {
        let endpoint = Endpoint::with_default_port("10.0.0.2");
        assert_eq!(endpoint.port, DEFAULT_PORT);
        assert_eq!(endpoint.to_string(), "10.0.0.2:1741");
    }
}
