use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use strata_core::ErrorKind;

use crate::error::{LoadError, LoadResult};

/// Identifies one submitted request in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a new unique request ID.
pub(crate) fn next_request_id() -> RequestId {
    RequestId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A non-blocking handle to an in-flight load.
/// Call `try_recv()` each frame to check for the result without blocking.
pub struct PendingLoad {
    id: RequestId,
    receiver: mpsc::Receiver<LoadResult>,
}

impl PendingLoad {
    pub(crate) fn new(id: RequestId, receiver: mpsc::Receiver<LoadResult>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Non-blocking check for the result. Returns `None` if still pending.
    pub fn try_recv(&self) -> Option<LoadResult> {
        self.receiver.try_recv().ok()
    }

    /// Blocking wait for the result. Only use off the frame loop.
    pub fn wait(self) -> LoadResult {
        self.receiver.recv().unwrap_or_else(|_| Err(closed()))
    }

    /// Blocking wait bounded by `timeout`. `None` if the load is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<LoadResult> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(closed())),
        }
    }
}

fn closed() -> LoadError {
    LoadError::new(ErrorKind::Shutdown, "result channel closed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_recv_none_then_result() {
        let (tx, rx) = mpsc::channel();
        let pending = PendingLoad::new(next_request_id(), rx);

        assert!(pending.try_recv().is_none());

        tx.send(Err(LoadError::new(ErrorKind::Parse, "bad"))).unwrap();

        let result = pending.try_recv();
        assert_eq!(result.unwrap().unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_wait_on_dropped_sender_is_shutdown() {
        let (tx, rx) = mpsc::channel::<LoadResult>();
        let pending = PendingLoad::new(next_request_id(), rx);
        drop(tx);
        assert_eq!(pending.wait().unwrap_err().kind(), ErrorKind::Shutdown);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let (_tx, rx) = mpsc::channel::<LoadResult>();
        let pending = PendingLoad::new(next_request_id(), rx);
        assert!(pending.wait_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = next_request_id();
        let b = next_request_id();
        assert_ne!(a, b);
        assert!(b > a);
    }
}
