//! verba-core - NLP pipeline engine
//!
//! This crate provides the engine behind the verba HTTP API: the capability
//! taxonomy, the configuration types, the built-in lexical pipelines, and
//! the pipeline cache that owns the expensive pipeline handles.
//!
//! # Architecture
//!
//! Pipelines are built lazily, exactly once per capability, by
//! [`PipelineCache`], a single-flight keyed cache safe under concurrent
//! access. The cache is constructed once at the composition root from an
//! immutable capability→descriptor map and a build routine, then shared
//! behind `Arc`.
//!
//! # Example
//!
//! ```ignore
//! use verba_core::{pipelines, Capability, EngineConfig, PipelineCache};
//!
//! let config = EngineConfig::default();
//! let cache = PipelineCache::new(
//!     config.descriptors(),
//!     pipelines::builder(config.models_dir.clone()),
//! );
//!
//! let handle = cache.get(Capability::Sentiment).await?;
//! ```

pub mod cache;
pub mod capability;
pub mod config;
pub mod error;
pub mod pipelines;

pub use cache::{BuildRoutine, CapabilityInfo, PipelineCache, PipelineStatus};
pub use capability::Capability;
pub use config::{Device, EngineConfig, ResourceDescriptor};
pub use error::{Error, Result};
pub use pipelines::{
    GeneratedText, Handle, LabelScore, PipelineInput, PipelineOutput, SpanAnswer, TextPipeline,
};
