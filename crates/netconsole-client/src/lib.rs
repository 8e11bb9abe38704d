//! Self-healing client for the netconsole telemetry stream.
//!
//! [`Client`] keeps one TCP connection to the device alive with two threads:
//! a reader that decodes frames and hands [`Record`]s to a
//! [`RecordHandler`] in wire order, and a keepalive driver that probes the
//! connection every two seconds and reconnects whenever it drops.
//!
//! [`FakeDriverStation`] is an optional companion that convinces the device a
//! controller is attached, which some firmware requires before it emits
//! console output.
//!
//! [`Record`]: netconsole_frame::Record

pub mod client;
pub mod error;
pub mod fakeds;
pub mod handler;
pub mod signal;

pub use client::{Client, ClientConfig, ConnectionState, StartMode, KEEPALIVE_INTERVAL};
pub use error::{ClientError, Result};
pub use fakeds::{FakeDriverStation, DS_TCP_PORT, DS_UDP_PORT};
pub use handler::RecordHandler;
pub use signal::ConnectSignal;
