//! Pipeline abstraction and the built-in lexical implementations.
//!
//! A pipeline is an opaque callable built from a [`ResourceDescriptor`]:
//! task-shaped input in, task-shaped output out. The engine only ever talks
//! to [`TextPipeline`], so the built-in implementations can be swapped for
//! anything else by injecting a different build routine at the composition
//! root.

mod generation;
mod qa;
mod sentiment;

pub use generation::GenerationPipeline;
pub use qa::QaPipeline;
pub use sentiment::SentimentPipeline;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::config::ResourceDescriptor;
use crate::error::{Error, Result};

/// One label with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// An extractive answer with char offsets into the original context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanAnswer {
    pub answer: String,
    pub score: f64,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

/// Task-specific pipeline input.
#[derive(Debug, Clone)]
pub enum PipelineInput {
    Sentiment {
        text: String,
    },
    QuestionAnswering {
        question: String,
        context: String,
    },
    Generation {
        prompt: String,
        max_length: usize,
        temperature: f64,
    },
}

/// Task-specific pipeline output.
#[derive(Debug, Clone)]
pub enum PipelineOutput {
    Sentiment(Vec<LabelScore>),
    Answer(SpanAnswer),
    Generation(GeneratedText),
}

/// Shared, read-only handle to a constructed pipeline.
pub type Handle = Arc<dyn TextPipeline>;

/// A constructed inference capability. Implementations must be immutable
/// after construction (or lock internally): handles are shared across all
/// concurrent requests without further synchronization.
pub trait TextPipeline: Send + Sync + std::fmt::Debug {
    fn capability(&self) -> Capability;

    fn model_id(&self) -> &str;

    /// Run one inference. Input not matching the pipeline's task is an
    /// [`Error::InvocationFailed`], never a panic.
    fn run(&self, input: PipelineInput) -> Result<PipelineOutput>;
}

/// The default build routine: constructs the built-in pipeline for each
/// capability, reading per-model data files from `models_dir` when present.
pub fn builder(
    models_dir: PathBuf,
) -> impl Fn(Capability, &ResourceDescriptor) -> Result<Handle> + Send + Sync + 'static {
    move |capability, descriptor| {
        let handle: Handle = match capability {
            Capability::Sentiment => Arc::new(SentimentPipeline::load(descriptor, &models_dir)?),
            Capability::QuestionAnswering => {
                Arc::new(QaPipeline::load(descriptor, &models_dir)?)
            }
            Capability::Generation => Arc::new(GenerationPipeline::load(descriptor, &models_dir)?),
        };
        Ok(handle)
    }
}

pub(crate) fn input_mismatch(capability: Capability) -> Error {
    Error::InvocationFailed {
        capability,
        cause: "input does not match the pipeline task".to_string(),
    }
}

/// Lowercased word tokens; apostrophes stay inside words.
pub(crate) fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_lowercases_and_strips_punctuation() {
        assert_eq!(
            words("Hello, World! It's fine."),
            vec!["hello", "world", "it's", "fine"]
        );
    }

    #[test]
    fn words_of_symbols_only_is_empty() {
        assert!(words("?! …").is_empty());
    }
}
