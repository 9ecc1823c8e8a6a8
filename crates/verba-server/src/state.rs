//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use verba_core::PipelineCache;

/// Shared application state with request backpressure.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline cache, built once at the composition root.
    pub pipelines: Arc<PipelineCache>,
    /// Concurrency limiter to prevent resource exhaustion.
    pub request_semaphore: Arc<Semaphore>,
    /// Per-request timeout (seconds), also bounds waits on in-flight builds.
    pub request_timeout_secs: u64,
}

impl AppState {
    pub fn new(pipelines: PipelineCache) -> Self {
        let max_concurrent = std::env::var("MAX_CONCURRENT_REQUESTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        let timeout = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Self {
            pipelines: Arc::new(pipelines),
            request_semaphore: Arc::new(Semaphore::new(max_concurrent)),
            request_timeout_secs: timeout,
        }
    }

    /// Acquire a permit for concurrent request processing.
    pub async fn acquire_permit(&self) -> tokio::sync::SemaphorePermit<'_> {
        self.request_semaphore
            .acquire()
            .await
            .expect("Semaphore should never be closed")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
