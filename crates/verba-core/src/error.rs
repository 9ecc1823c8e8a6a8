//! Engine error taxonomy.

use thiserror::Error;

use crate::capability::Capability;

/// Errors surfaced by the engine.
///
/// `Clone` matters here: a construction failure is stored once in the
/// pipeline cache and replayed verbatim to every later caller.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The capability is not present in the engine configuration.
    #[error("Unknown capability: {0}")]
    UnknownCapability(Capability),

    /// The build routine for a capability failed. Terminal for the process
    /// lifetime unless the entry is explicitly invalidated.
    #[error("Failed to build {capability} pipeline: {cause}")]
    ConstructionFailed {
        capability: Capability,
        cause: String,
    },

    /// A caller-side wait bound elapsed before the in-flight build resolved.
    #[error("Timed out after {waited_ms}ms waiting for {capability} pipeline")]
    Timeout {
        capability: Capability,
        waited_ms: u64,
    },

    /// A constructed pipeline failed on a specific call. Per-request, never
    /// cached.
    #[error("{capability} inference failed: {cause}")]
    InvocationFailed {
        capability: Capability,
        cause: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
