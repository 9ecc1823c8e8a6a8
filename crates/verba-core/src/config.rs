//! Configuration types for the verba engine.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;

/// Target execution device for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(index) => write!(f, "cuda:{index}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    /// Accepts `cpu`, `cuda` (device 0), or `cuda:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        if trimmed == "cpu" {
            return Ok(Device::Cpu);
        }
        if trimmed == "cuda" {
            return Ok(Device::Cuda(0));
        }
        if let Some(index) = trimmed.strip_prefix("cuda:") {
            return index
                .parse::<usize>()
                .map(Device::Cuda)
                .map_err(|_| format!("Invalid CUDA device index: '{index}'"));
        }
        Err(format!("Unsupported device: '{s}'"))
    }
}

/// Everything needed to build the pipeline backing one capability.
/// Immutable once the process starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub model_id: String,
    pub device: Device,
}

/// Main engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding per-model data files (lexicons, corpora).
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Device forwarded to every pipeline build.
    #[serde(default = "default_device")]
    pub device: Device,

    #[serde(default = "default_sentiment_model")]
    pub sentiment_model: String,

    #[serde(default = "default_qa_model")]
    pub qa_model: String,

    #[serde(default = "default_generation_model")]
    pub generation_model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            device: default_device(),
            sentiment_model: default_sentiment_model(),
            qa_model: default_qa_model(),
            generation_model: default_generation_model(),
        }
    }
}

impl EngineConfig {
    /// The model id configured for a capability.
    pub fn model_id(&self, capability: Capability) -> &str {
        match capability {
            Capability::Sentiment => &self.sentiment_model,
            Capability::QuestionAnswering => &self.qa_model,
            Capability::Generation => &self.generation_model,
        }
    }

    /// Immutable capability -> descriptor map consumed by the pipeline cache.
    pub fn descriptors(&self) -> HashMap<Capability, ResourceDescriptor> {
        Capability::all()
            .iter()
            .map(|capability| {
                (
                    *capability,
                    ResourceDescriptor {
                        model_id: self.model_id(*capability).to_string(),
                        device: self.device,
                    },
                )
            })
            .collect()
    }
}

fn default_models_dir() -> PathBuf {
    if let Ok(from_env) = std::env::var("VERBA_MODELS_DIR") {
        let trimmed = from_env.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("verba")
        .join("models")
}

fn default_device() -> Device {
    std::env::var("VERBA_DEVICE")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(Device::Cpu)
}

fn default_sentiment_model() -> String {
    env_or(
        "VERBA_SENTIMENT_MODEL",
        "distilbert-base-uncased-finetuned-sst-2-english",
    )
}

fn default_qa_model() -> String {
    env_or("VERBA_QA_MODEL", "distilroberta-base-squad-v2")
}

fn default_generation_model() -> String {
    env_or("VERBA_GENERATION_MODEL", "gpt2")
}

fn env_or(key: &str, fallback: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => fallback.to_string(),
    }
}
