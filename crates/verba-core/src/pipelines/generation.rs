//! Deterministic text continuation over a word-bigram chain.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use tracing::debug;

use crate::capability::Capability;
use crate::config::ResourceDescriptor;
use crate::error::{Error, Result};
use crate::pipelines::{input_mismatch, words, GeneratedText, PipelineInput, PipelineOutput, TextPipeline};

const DEFAULT_CORPUS: &str = include_str!("../../data/generation_corpus.txt");

type State = (String, String);

/// Order-2 Markov continuation model.
///
/// The chain is built from `<models_dir>/<model_id>/corpus.txt` when
/// present, otherwise from the built-in corpus. Candidate selection hashes
/// the prompt and step, so a given (prompt, max_length, temperature) always
/// produces the same text: temperature 0 is greedy, higher values widen the
/// candidate pool that the hash indexes into.
#[derive(Debug)]
pub struct GenerationPipeline {
    model_id: String,
    /// Next-word candidates per state, most frequent first.
    chain: HashMap<State, Vec<String>>,
    /// All states, sorted, for deterministic dead-end restarts.
    states: Vec<State>,
}

impl GenerationPipeline {
    pub fn load(descriptor: &ResourceDescriptor, models_dir: &Path) -> Result<Self> {
        let corpus_path = models_dir.join(&descriptor.model_id).join("corpus.txt");
        let raw = if corpus_path.is_file() {
            std::fs::read_to_string(&corpus_path).map_err(|err| Error::ConstructionFailed {
                capability: Capability::Generation,
                cause: format!("failed to read {}: {err}", corpus_path.display()),
            })?
        } else {
            debug!(
                "No corpus at {:?}, falling back to the built-in one",
                corpus_path
            );
            DEFAULT_CORPUS.to_string()
        };

        let corpus_words = words(&raw);
        if corpus_words.len() < 3 {
            return Err(Error::ConstructionFailed {
                capability: Capability::Generation,
                cause: "corpus is too small to build a bigram chain".to_string(),
            });
        }

        let chain = build_chain(&corpus_words);
        let mut states: Vec<State> = chain.keys().cloned().collect();
        states.sort();

        Ok(Self {
            model_id: descriptor.model_id.clone(),
            chain,
            states,
        })
    }

    fn continuation(&self, prompt: &str, max_length: usize, temperature: f64) -> Vec<String> {
        let prompt_words = words(prompt);
        let mut generated = Vec::new();
        let mut total = prompt_words.len();
        if total == 0 || total >= max_length {
            return generated;
        }

        let mut state = match prompt_words.as_slice() {
            [.., a, b] => (a.clone(), b.clone()),
            [only] => {
                // Single-word prompt: pick the first state led by that word,
                // or restart deterministically if the word is unknown.
                match self.states.iter().find(|(first, _)| first == only) {
                    Some(found) => found.clone(),
                    None => self.restart_state(prompt, 0),
                }
            }
            [] => unreachable!("empty prompts return early"),
        };

        let mut step = 0;
        while total < max_length {
            let next = match self.chain.get(&state) {
                Some(candidates) => {
                    let index = pick(prompt, step, candidates.len(), temperature);
                    candidates[index].clone()
                }
                None => {
                    // Dead end: jump to a hash-chosen state and keep going.
                    state = self.restart_state(prompt, step);
                    step += 1;
                    continue;
                }
            };
            state = (state.1.clone(), next.clone());
            generated.push(next);
            total += 1;
            step += 1;
        }
        generated
    }

    fn restart_state(&self, prompt: &str, step: usize) -> State {
        let index = hash_of(prompt, step) as usize % self.states.len();
        self.states[index].clone()
    }
}

impl TextPipeline for GenerationPipeline {
    fn capability(&self) -> Capability {
        Capability::Generation
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn run(&self, input: PipelineInput) -> Result<PipelineOutput> {
        let (prompt, max_length, temperature) = match input {
            PipelineInput::Generation {
                prompt,
                max_length,
                temperature,
            } => (prompt, max_length, temperature),
            _ => return Err(input_mismatch(Capability::Generation)),
        };

        if words(&prompt).is_empty() {
            return Err(Error::InvocationFailed {
                capability: Capability::Generation,
                cause: "prompt contains no words".to_string(),
            });
        }

        let continuation = self.continuation(&prompt, max_length, temperature);
        let generated_text = if continuation.is_empty() {
            prompt.trim().to_string()
        } else {
            format!("{} {}", prompt.trim(), continuation.join(" "))
        };
        Ok(PipelineOutput::Generation(GeneratedText { generated_text }))
    }
}

fn build_chain(corpus_words: &[String]) -> HashMap<State, Vec<String>> {
    let mut counts: HashMap<State, HashMap<String, usize>> = HashMap::new();
    for window in corpus_words.windows(3) {
        counts
            .entry((window[0].clone(), window[1].clone()))
            .or_default()
            .entry(window[2].clone())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    counts
        .into_iter()
        .map(|(state, followers)| {
            let mut ordered: Vec<(String, usize)> = followers.into_iter().collect();
            // Most frequent first; ties broken alphabetically for determinism.
            ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            (state, ordered.into_iter().map(|(word, _)| word).collect())
        })
        .collect()
}

/// Deterministic candidate pick: temperature scales how deep into the
/// frequency-ranked candidate list the hash may reach.
fn pick(prompt: &str, step: usize, candidates: usize, temperature: f64) -> usize {
    if candidates <= 1 {
        return 0;
    }
    let spread = temperature.clamp(0.0, 2.0) / 2.0;
    let pool = 1 + (spread * (candidates - 1) as f64).round() as usize;
    (hash_of(prompt, step) as usize) % pool
}

fn hash_of(prompt: &str, step: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    prompt.hash(&mut hasher);
    step.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Device;

    fn pipeline() -> GenerationPipeline {
        GenerationPipeline::load(
            &ResourceDescriptor {
                model_id: "test-generation".to_string(),
                device: Device::Cpu,
            },
            Path::new("/nonexistent"),
        )
        .unwrap()
    }

    fn generate(prompt: &str, max_length: usize, temperature: f64) -> String {
        match pipeline()
            .run(PipelineInput::Generation {
                prompt: prompt.to_string(),
                max_length,
                temperature,
            })
            .unwrap()
        {
            PipelineOutput::Generation(out) => out.generated_text,
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn continuation_is_deterministic() {
        let first = generate("language models are", 30, 0.9);
        let second = generate("language models are", 30, 0.9);
        assert_eq!(first, second);
    }

    #[test]
    fn output_starts_with_the_prompt() {
        let out = generate("A language model", 25, 0.9);
        assert!(out.starts_with("A language model"));
        assert!(words(&out).len() > 3);
    }

    #[test]
    fn max_length_bounds_total_words() {
        let out = generate("language models", 10, 0.9);
        assert!(words(&out).len() <= 10);
    }

    #[test]
    fn prompt_at_max_length_is_returned_unchanged() {
        let out = generate("one two three four five", 5, 0.9);
        assert_eq!(out, "one two three four five");
    }

    #[test]
    fn unknown_prompt_words_still_generate() {
        let out = generate("zyxxy quorble", 12, 1.0);
        assert!(words(&out).len() > 2);
    }

    #[test]
    fn zero_temperature_is_greedy_and_stable() {
        let first = generate("the model", 20, 0.0);
        let second = generate("the model", 20, 0.0);
        assert_eq!(first, second);
    }

    #[test]
    fn corpus_from_model_dir_wins() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("test-generation");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(
            model_dir.join("corpus.txt"),
            "alpha beta gamma alpha beta gamma alpha beta gamma",
        )
        .unwrap();

        let pipeline = GenerationPipeline::load(
            &ResourceDescriptor {
                model_id: "test-generation".to_string(),
                device: Device::Cpu,
            },
            dir.path(),
        )
        .unwrap();
        let out = match pipeline
            .run(PipelineInput::Generation {
                prompt: "alpha beta".to_string(),
                max_length: 6,
                temperature: 0.0,
            })
            .unwrap()
        {
            PipelineOutput::Generation(out) => out.generated_text,
            other => panic!("unexpected output: {other:?}"),
        };
        assert_eq!(out, "alpha beta gamma alpha beta gamma");
    }

    #[test]
    fn tiny_corpus_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("test-generation");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("corpus.txt"), "too small").unwrap();

        let err = GenerationPipeline::load(
            &ResourceDescriptor {
                model_id: "test-generation".to_string(),
                device: Device::Cpu,
            },
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConstructionFailed { .. }));
    }

    #[test]
    fn wordless_prompt_is_an_invocation_error() {
        let err = pipeline()
            .run(PipelineInput::Generation {
                prompt: "?!".to_string(),
                max_length: 10,
                temperature: 0.9,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvocationFailed { .. }));
    }
}
