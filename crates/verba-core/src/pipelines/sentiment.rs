//! Valence-lexicon sentiment scorer.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::capability::Capability;
use crate::config::ResourceDescriptor;
use crate::error::{Error, Result};
use crate::pipelines::{input_mismatch, words, LabelScore, PipelineInput, PipelineOutput, TextPipeline};

const DEFAULT_LEXICON: &str = include_str!("../../data/sentiment_lexicon.tsv");

/// Tokens that flip the valence of the word right after them.
const NEGATORS: &[&str] = &["not", "no", "never", "cannot", "without", "hardly", "barely"];

/// Sentiment classifier backed by a token valence lexicon.
///
/// The lexicon is `<models_dir>/<model_id>/lexicon.tsv` when present
/// (`token<TAB>weight` rows, `#` comments), otherwise the built-in default.
/// Token valences are summed (negation flips the following token) and
/// squashed through a logistic into POSITIVE/NEGATIVE scores that sum to 1.
#[derive(Debug)]
pub struct SentimentPipeline {
    model_id: String,
    lexicon: HashMap<String, f64>,
}

impl SentimentPipeline {
    pub fn load(descriptor: &ResourceDescriptor, models_dir: &Path) -> Result<Self> {
        let lexicon_path = models_dir.join(&descriptor.model_id).join("lexicon.tsv");
        let raw = if lexicon_path.is_file() {
            std::fs::read_to_string(&lexicon_path).map_err(|err| Error::ConstructionFailed {
                capability: Capability::Sentiment,
                cause: format!("failed to read {}: {err}", lexicon_path.display()),
            })?
        } else {
            debug!(
                "No lexicon at {:?}, falling back to the built-in one",
                lexicon_path
            );
            DEFAULT_LEXICON.to_string()
        };

        Ok(Self {
            model_id: descriptor.model_id.clone(),
            lexicon: parse_lexicon(&raw)?,
        })
    }

    fn valence(&self, tokens: &[String]) -> f64 {
        let mut total = 0.0;
        let mut negated = false;
        for token in tokens {
            if NEGATORS.contains(&token.as_str()) {
                negated = true;
                continue;
            }
            if let Some(weight) = self.lexicon.get(token) {
                total += if negated { -weight } else { *weight };
            }
            negated = false;
        }
        total
    }
}

impl TextPipeline for SentimentPipeline {
    fn capability(&self) -> Capability {
        Capability::Sentiment
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn run(&self, input: PipelineInput) -> Result<PipelineOutput> {
        let text = match input {
            PipelineInput::Sentiment { text } => text,
            _ => return Err(input_mismatch(Capability::Sentiment)),
        };

        let tokens = words(&text);
        let valence = self.valence(&tokens);
        let positive = 1.0 / (1.0 + (-valence).exp());

        let mut scores = vec![
            LabelScore {
                label: "POSITIVE".to_string(),
                score: positive,
            },
            LabelScore {
                label: "NEGATIVE".to_string(),
                score: 1.0 - positive,
            },
        ];
        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(PipelineOutput::Sentiment(scores))
    }
}

fn parse_lexicon(raw: &str) -> Result<HashMap<String, f64>> {
    let mut lexicon = HashMap::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (token, weight) = line.split_once('\t').ok_or_else(|| Error::ConstructionFailed {
            capability: Capability::Sentiment,
            cause: format!("lexicon line {}: expected token<TAB>weight", index + 1),
        })?;
        let weight: f64 = weight.trim().parse().map_err(|_| Error::ConstructionFailed {
            capability: Capability::Sentiment,
            cause: format!("lexicon line {}: invalid weight '{}'", index + 1, weight.trim()),
        })?;
        lexicon.insert(token.trim().to_lowercase(), weight);
    }

    if lexicon.is_empty() {
        return Err(Error::ConstructionFailed {
            capability: Capability::Sentiment,
            cause: "lexicon contains no entries".to_string(),
        });
    }
    Ok(lexicon)
}
