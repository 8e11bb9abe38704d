//! TCP transport for the netconsole telemetry protocol.
//!
//! This is the lowest layer of netconsole. It owns the socket:
//! - bounded connect with `TCP_NODELAY` and blocking reads
//! - exact reads and full writes that report a dropped peer as
//!   [`TransportError::ConnectionLost`]
//! - an idempotent close that unblocks a concurrent reader
//! - the reconnect loop used whenever the connection drops

pub mod error;
pub mod reconnect;
pub mod tcp;

pub use error::{Result, TransportError};
pub use reconnect::{reconnect_loop, ConnectConfig, CONNECT_TIMEOUT, RETRY_DELAY};
pub use tcp::{Endpoint, TcpConnection, DEFAULT_PORT};
