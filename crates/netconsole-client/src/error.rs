/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// `start` was called on a client that is already running.
    #[error("client already running")]
    AlreadyRunning,

    /// `start` was called after `stop`; a stopped client cannot be restarted.
    #[error("client has been stopped")]
    Stopped,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] netconsole_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] netconsole_frame::FrameError),

    /// A worker thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    /// Socket error outside an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
