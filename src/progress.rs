//! Load progress notifications.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

/// One step of a load, reported to the request's observer as it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProgress {
    /// The document bytes are in memory.
    Fetched { bytes: usize },
    /// The document parsed and validated.
    Parsed { meshes: usize, animations: usize },
    /// `resolved` of the document's `total` buffers and images are available.
    DependencyResolved { resolved: usize, total: usize },
    /// Animations came from the cache. Only reported when a cache is set.
    CacheHit,
    /// Animations were decoded. Only reported when a cache is set.
    CacheMiss,
}

/// Called on a loader thread for every [`LoadProgress`] event.
pub type ProgressObserver = Arc<dyn Fn(&LoadProgress) + Send + Sync>;

/// Observer slot on a request.
#[derive(Clone)]
pub(crate) struct Observer(pub ProgressObserver);

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Observer(..)")
    }
}

/// Every observer attached to one pipeline run. Callers that join a running
/// load see the events emitted after they joined.
#[derive(Clone, Default)]
pub(crate) struct ProgressSink {
    observers: Arc<Mutex<Vec<ProgressObserver>>>,
}

impl ProgressSink {
    pub(crate) fn attach(&self, observer: ProgressObserver) {
        self.observers.lock().push(observer);
    }

    pub(crate) fn emit(&self, event: LoadProgress) {
        let observers = self.observers.lock().clone();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(&event))).is_err() {
                warn!("progress observer panicked on {:?}", event);
            }
        }
    }
}
