use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// One-shot flag set when the client first connects.
///
/// Clones share the same flag. Reconnects after the first connection do not
/// touch it.
#[derive(Debug, Clone, Default)]
pub struct ConnectSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ConnectSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake all waiters.
    pub fn set(&self) {
        let (flag, cond) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the flag is set.
    pub fn wait(&self) {
        let (flag, cond) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = cond
            .wait_while(guard, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until the flag is set or `timeout` elapses. Returns the flag.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cond) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cond
            .wait_timeout_while(guard, timeout, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
