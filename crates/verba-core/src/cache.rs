//! Pipeline lifecycle management.
//!
//! [`PipelineCache`] owns the expensive pipeline handles, one per
//! [`Capability`]. A pipeline is built lazily on first request, at most once
//! per process lifetime: concurrent callers racing on a cold capability all
//! wait on the single in-flight build and observe the same outcome. A failed
//! build is terminal until explicitly invalidated, so a model that is known
//! to be broken is not hammered on every request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{error, info};

use crate::capability::Capability;
use crate::config::{Device, ResourceDescriptor};
use crate::error::{Error, Result};
use crate::pipelines::Handle;

/// Build routine supplied at construction: descriptor in, handle out.
/// Runs on the blocking pool; may be slow and may fail.
pub type BuildRoutine = dyn Fn(Capability, &ResourceDescriptor) -> Result<Handle> + Send + Sync;

/// Outcome published to waiters once a build resolves.
type BuildOutcome = Option<Result<Handle>>;

/// Lifecycle state of one capability's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    NotLoaded,
    Building,
    Ready,
    Failed,
}

/// Status report for one capability, as surfaced by the API.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityInfo {
    pub capability: Capability,
    pub model_id: String,
    pub device: Device,
    pub status: PipelineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

enum Entry {
    /// A build is in flight; later callers subscribe to its outcome.
    Building(watch::Receiver<BuildOutcome>),
    Ready(Handle),
    Failed(Error),
}

/// Lazy, keyed, single-flight cache of pipeline handles.
///
/// Constructed once at the composition root and shared behind `Arc`. The
/// entry table lock is held only for state transitions, never across a
/// build, so a slow build for one capability cannot delay requests for
/// another.
pub struct PipelineCache {
    descriptors: HashMap<Capability, ResourceDescriptor>,
    build: Arc<BuildRoutine>,
    entries: Arc<RwLock<HashMap<Capability, Entry>>>,
}

impl PipelineCache {
    pub fn new(
        descriptors: HashMap<Capability, ResourceDescriptor>,
        build: impl Fn(Capability, &ResourceDescriptor) -> Result<Handle> + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptors,
            build: Arc::new(build),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The handle for `capability`, building it first if this is the first
    /// request. Blocks only while a build for this same capability is in
    /// flight.
    pub async fn get(&self, capability: Capability) -> Result<Handle> {
        let descriptor = self
            .descriptors
            .get(&capability)
            .ok_or(Error::UnknownCapability(capability))?;

        // Hot path: a resolved entry needs only the read lock.
        {
            let entries = self.entries.read().await;
            match entries.get(&capability) {
                Some(Entry::Ready(handle)) => return Ok(Arc::clone(handle)),
                Some(Entry::Failed(stored)) => return Err(stored.clone()),
                _ => {}
            }
        }

        let rx = {
            let mut entries = self.entries.write().await;
            match entries.get(&capability) {
                // The build resolved between the two lock acquisitions.
                Some(Entry::Ready(handle)) => return Ok(Arc::clone(handle)),
                Some(Entry::Failed(stored)) => return Err(stored.clone()),
                Some(Entry::Building(rx)) => rx.clone(),
                None => {
                    let (tx, rx) = watch::channel(None);
                    entries.insert(capability, Entry::Building(rx.clone()));
                    self.spawn_build(capability, descriptor.clone(), tx);
                    rx
                }
            }
        };

        Self::await_outcome(capability, rx).await
    }

    /// Like [`get`](Self::get), but the wait on an in-flight build is
    /// bounded. Expiry fails this caller with [`Error::Timeout`] and leaves
    /// the build and its other waiters untouched.
    pub async fn get_timeout(&self, capability: Capability, timeout: Duration) -> Result<Handle> {
        match tokio::time::timeout(timeout, self.get(capability)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                capability,
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Drop a Ready or Failed entry so the next `get` rebuilds it. Returns
    /// whether an entry was cleared. An in-flight build is left to finish:
    /// interrupting it would hand its waiters divergent outcomes.
    pub async fn invalidate(&self, capability: Capability) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get(&capability) {
            Some(Entry::Ready(_)) | Some(Entry::Failed(_)) => {
                info!("Invalidating {} pipeline", capability);
                entries.remove(&capability);
                true
            }
            _ => false,
        }
    }

    /// Current lifecycle state for one capability.
    pub async fn status(&self, capability: Capability) -> PipelineStatus {
        let entries = self.entries.read().await;
        match entries.get(&capability) {
            None => PipelineStatus::NotLoaded,
            Some(Entry::Building(_)) => PipelineStatus::Building,
            Some(Entry::Ready(_)) => PipelineStatus::Ready,
            Some(Entry::Failed(_)) => PipelineStatus::Failed,
        }
    }

    /// Status of every configured capability.
    pub async fn snapshot(&self) -> Vec<CapabilityInfo> {
        let entries = self.entries.read().await;
        Capability::all()
            .iter()
            .filter_map(|capability| {
                let descriptor = self.descriptors.get(capability)?;
                let (status, error) = match entries.get(capability) {
                    None => (PipelineStatus::NotLoaded, None),
                    Some(Entry::Building(_)) => (PipelineStatus::Building, None),
                    Some(Entry::Ready(_)) => (PipelineStatus::Ready, None),
                    Some(Entry::Failed(stored)) => {
                        (PipelineStatus::Failed, Some(stored.to_string()))
                    }
                };
                Some(CapabilityInfo {
                    capability: *capability,
                    model_id: descriptor.model_id.clone(),
                    device: descriptor.device,
                    status,
                    error,
                })
            })
            .collect()
    }

    /// Run the build on a detached task. The winning caller waits on the
    /// watch channel like everyone else, so dropping its request cannot
    /// strand the other waiters mid-build.
    fn spawn_build(
        &self,
        capability: Capability,
        descriptor: ResourceDescriptor,
        tx: watch::Sender<BuildOutcome>,
    ) {
        let build = Arc::clone(&self.build);
        let entries = Arc::clone(&self.entries);

        tokio::spawn(async move {
            info!(
                "Building {} pipeline from '{}' on {}",
                capability, descriptor.model_id, descriptor.device
            );
            let started = Instant::now();
            let model_id = descriptor.model_id.clone();

            let result = tokio::task::spawn_blocking(move || build(capability, &descriptor))
                .await
                .unwrap_or_else(|join_error| {
                    Err(Error::ConstructionFailed {
                        capability,
                        cause: format!("build routine panicked: {join_error}"),
                    })
                });

            match &result {
                Ok(_) => info!(
                    "Pipeline {} ('{}') ready in {:?}",
                    capability,
                    model_id,
                    started.elapsed()
                ),
                Err(err) => error!(
                    "Pipeline {} ('{}') failed to build: {}",
                    capability, model_id, err
                ),
            }

            let entry = match &result {
                Ok(handle) => Entry::Ready(Arc::clone(handle)),
                Err(err) => Entry::Failed(err.clone()),
            };

            // Finalize the table before waking waiters so a waiter and a
            // fresh caller can never observe different outcomes.
            {
                let mut entries = entries.write().await;
                entries.insert(capability, entry);
            }
            let _ = tx.send(Some(result));
        });
    }

    async fn await_outcome(
        capability: Capability,
        mut rx: watch::Receiver<BuildOutcome>,
    ) -> Result<Handle> {
        loop {
            if let Some(outcome) = rx.borrow_and_update().as_ref() {
                return outcome.clone();
            }
            if rx.changed().await.is_err() {
                // Builder task dropped without publishing (runtime teardown).
                return Err(Error::ConstructionFailed {
                    capability,
                    cause: "pipeline build task was dropped before completing".to_string(),
                });
            }
        }
    }
}
