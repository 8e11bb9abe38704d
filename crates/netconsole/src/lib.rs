//! Resilient client for the netconsole diagnostic telemetry protocol.
//!
//! The device streams framed info and error records over TCP port 1741;
//! netconsole keeps that connection alive across drops and hands every
//! record to your handler in wire order.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connect, exact reads, close and the reconnect loop
//! - [`frame`]: Header and record codec, keepalive sentinel, frame writer
//! - [`client`]: Reader and keepalive threads, start/stop lifecycle, fake
//!   driver station
//!
//! ```no_run
//! use netconsole::client::{Client, StartMode};
//! use netconsole::frame::Record;
//!
//! let client = Client::new(|record: Record| println!("{record}"));
//! client.start("10.0.0.2", 1741, None, StartMode::Blocking)?;
//! # Ok::<(), netconsole::client::ClientError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use netconsole_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use netconsole_frame::*;
}

/// Re-export client types.
pub mod client {
    pub use netconsole_client::*;
}
