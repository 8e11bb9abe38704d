use std::time::Duration;

use tracing::{debug, warn};

use crate::tcp::{Endpoint, TcpConnection};

/// Bound on a single connect attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause between failed connect attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Configuration for connect attempts.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Timeout for each connect attempt. Default: 3 s.
    pub connect_timeout: Duration,
    /// Pause after a failed attempt. Default: 1 s.
    pub retry_delay: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            retry_delay: RETRY_DELAY,
        }
    }
}

/// Connect to `endpoint`, retrying until it succeeds or `should_stop` says so.
///
/// `should_stop` receives how long it may block: zero before each attempt and
/// `config.retry_delay` after a failure. Returning `true` abandons the loop
/// with `None`. Callers that want an interruptible pause wait on their own
/// condition for that duration; a plain sleep is also fine.
pub fn reconnect_loop<F>(
    endpoint: &Endpoint,
    config: &ConnectConfig,
    mut should_stop: F,
) -> Option<TcpConnection>
where
    F: FnMut(Duration) -> bool,
{
    let mut attempt: u64 = 0;
    loop {
        if should_stop(Duration::ZERO) {
            return None;
        }

        attempt += 1;
        match TcpConnection::connect(endpoint, config.connect_timeout) {
            Ok(conn) => return Some(conn),
            Err(err) if attempt == 1 => warn!(%endpoint, error = %err, "connect failed, retrying"),
            Err(err) => debug!(%endpoint, attempt, error = %err, "connect failed, retrying"),
        }

        if should_stop(config.retry_delay) {
            return None;
        }
    }
}
