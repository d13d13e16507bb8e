use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::Mutex;
use strata_assets::{DefaultImageCodec, ImageCodec};
use strata_core::{CacheKey, ErrorKind};
use strata_fetch::{DefaultFetcher, FetchError, ResourceFetcher};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::pending::{next_request_id, PendingLoad, RequestId};
use crate::pipeline::Pipeline;
use crate::progress::ProgressSink;
use crate::request::{LoadRequest, ValidatedRequest};
use crate::settings::LoaderSettings;

type Handler = Box<dyn FnOnce(LoadResult) + Send + 'static>;

/// Errors creating an [`AssetLoader`].
#[derive(Debug, thiserror::Error)]
pub enum LoaderInitError {
    #[error("failed to create runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("failed to create fetcher: {0}")]
    Fetcher(#[from] FetchError),
}

/// One caller waiting on a load. Delivers exactly once: either the result
/// it is given, or a shutdown failure if it is dropped first.
struct Waiter {
    id: RequestId,
    handler: Option<Handler>,
}

impl Waiter {
    fn new(id: RequestId, handler: Handler) -> Self {
        Self {
            id,
            handler: Some(handler),
        }
    }

    fn deliver(mut self, result: LoadResult) {
        if let Some(handler) = self.handler.take() {
            handler(result);
        }
    }

    /// Deliver without letting a panicking handler reach the caller, so the
    /// other callers of a shared load still get their result.
    fn deliver_guarded(self, result: LoadResult) {
        let id = self.id;
        if catch_unwind(AssertUnwindSafe(move || self.deliver(result))).is_err() {
            warn!("completion handler for request {} panicked", id);
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            debug!("request {} dropped before completion", self.id);
            handler(Err(LoadError::new(
                ErrorKind::Shutdown,
                "loader shut down before the load completed",
            )));
        }
    }
}

/// A running non-forced load and the callers attached to it.
struct InFlight {
    waiters: Vec<Waiter>,
    progress: ProgressSink,
}

struct Inner {
    pipeline: Pipeline,
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,
}

/// Loads glTF documents on a background runtime.
///
/// Owns the runtime; dropping the loader shuts it down, and any caller still
/// waiting receives an [`ErrorKind::Shutdown`] failure.
pub struct AssetLoader {
    runtime: Option<Runtime>,
    inner: Arc<Inner>,
    settings: LoaderSettings,
}

impl AssetLoader {
    /// Create a loader from the settings file, with HTTP/file fetching and
    /// the default image codec.
    pub fn new() -> Result<Self, LoaderInitError> {
        Self::with_settings(LoaderSettings::load())
    }

    pub fn with_settings(settings: LoaderSettings) -> Result<Self, LoaderInitError> {
        let fetcher = DefaultFetcher::new(settings.http_timeout(), &settings.user_agent)?;
        Self::with_parts(settings, Arc::new(fetcher), Arc::new(DefaultImageCodec))
    }

    /// Create a loader with caller-provided collaborators.
    pub fn with_parts(
        settings: LoaderSettings,
        fetcher: Arc<dyn ResourceFetcher>,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self, LoaderInitError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(settings.worker_threads.max(1))
            .thread_name("strata-loader")
            .enable_all()
            .build()?;

        info!(
            "Asset loader started ({} workers, {} concurrent fetches)",
            settings.worker_threads.max(1),
            settings.max_concurrent_fetches
        );

        let inner = Arc::new(Inner {
            pipeline: Pipeline {
                fetcher,
                codec,
                max_concurrent_fetches: settings.max_concurrent_fetches.max(1),
            },
            in_flight: Mutex::new(HashMap::new()),
        });

        Ok(Self {
            runtime: Some(runtime),
            inner,
            settings,
        })
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Start a load; `handler` is called exactly once with its result, always
    /// on a loader thread.
    ///
    /// A non-forced request whose key matches a running non-forced load joins
    /// it instead of starting another pipeline.
    pub fn load_from_source<F>(&self, request: LoadRequest, handler: F) -> RequestId
    where
        F: FnOnce(LoadResult) + Send + 'static,
    {
        let id = next_request_id();
        let waiter = Waiter::new(id, Box::new(handler));

        let Some(runtime) = &self.runtime else {
            return id;
        };

        match request.validate() {
            Ok(request) => self.start(runtime, id, request, waiter),
            Err(e) => {
                debug!("request {} rejected: {}", id, e);
                runtime.spawn(async move { waiter.deliver(Err(e)) });
            }
        }
        id
    }

    /// Start a load and get a handle to poll or wait on.
    pub fn submit(&self, request: LoadRequest) -> PendingLoad {
        let (tx, rx) = mpsc::channel();
        let id = self.load_from_source(request, move |result| {
            let _ = tx.send(result);
        });
        PendingLoad::new(id, rx)
    }

    /// Number of deduplicable loads currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    fn start(&self, runtime: &Runtime, id: RequestId, mut request: ValidatedRequest, waiter: Waiter) {
        let key = request.key;
        let source = request.source.describe();
        let observer = request.progress.take();

        if request.override_cache {
            debug!("request {} ({}) forces a fresh load", id, source);
            let progress = ProgressSink::default();
            if let Some(observer) = observer {
                progress.attach(observer);
            }
            let pipeline = self.inner.pipeline.clone();
            runtime.spawn(async move {
                let result = contained(pipeline, request, progress).await;
                waiter.deliver_guarded(result);
            });
            return;
        }

        let progress = {
            let mut in_flight = self.inner.in_flight.lock();
            if let Some(running) = in_flight.get_mut(&key) {
                debug!("request {} ({}) joined the running load for {:?}", id, source, key);
                if let Some(observer) = observer {
                    running.progress.attach(observer);
                }
                running.waiters.push(waiter);
                return;
            }
            let progress = ProgressSink::default();
            if let Some(observer) = observer {
                progress.attach(observer);
            }
            in_flight.insert(
                key,
                InFlight {
                    waiters: vec![waiter],
                    progress: progress.clone(),
                },
            );
            progress
        };

        debug!("request {} ({}) started a load for {:?}", id, source, key);
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let result = contained(inner.pipeline.clone(), request, progress).await;
            let waiters = inner
                .in_flight
                .lock()
                .remove(&key)
                .map(|running| running.waiters)
                .unwrap_or_default();
            if waiters.len() > 1 {
                debug!("delivering shared result for {:?} to {} callers", key, waiters.len());
            }
            for waiter in waiters {
                waiter.deliver_guarded(result.clone());
            }
        });
    }
}

/// Run a pipeline as its own task so a panic is reported instead of lost.
async fn contained(pipeline: Pipeline, request: ValidatedRequest, progress: ProgressSink) -> LoadResult {
    match tokio::spawn(pipeline.run(request, progress)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            warn!("load pipeline panicked");
            Err(LoadError::new(ErrorKind::Assembly, "load pipeline panicked"))
        }
        Err(_) => Err(LoadError::new(ErrorKind::Shutdown, "load pipeline was cancelled")),
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            info!("Shutting down asset loader");
            runtime.shutdown_timeout(self.settings.shutdown_grace());
        }
    }
}
