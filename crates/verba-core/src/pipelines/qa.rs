//! Extractive question answering over a provided context.

use std::collections::HashSet;
use std::path::Path;

use crate::capability::Capability;
use crate::config::ResourceDescriptor;
use crate::error::Result;
use crate::pipelines::{input_mismatch, words, PipelineInput, PipelineOutput, SpanAnswer, TextPipeline};

/// Question words and glue that carry no content for overlap scoring.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "do", "does", "did", "what",
    "which", "who", "whom", "whose", "when", "where", "why", "how", "of", "in", "on", "at", "to",
    "for", "by", "with", "and", "or", "it", "its", "this", "that", "there",
];

/// Lexical-overlap reader: scores each context sentence by the fraction of
/// the question's content words it contains and answers with the best
/// sentence as a span into the original context. No overlap yields an empty
/// answer with score 0 rather than an error.
#[derive(Debug)]
pub struct QaPipeline {
    model_id: String,
    stopwords: HashSet<&'static str>,
}

impl QaPipeline {
    pub fn load(descriptor: &ResourceDescriptor, _models_dir: &Path) -> Result<Self> {
        Ok(Self {
            model_id: descriptor.model_id.clone(),
            stopwords: STOPWORDS.iter().copied().collect(),
        })
    }

    fn content_words(&self, question: &str) -> Vec<String> {
        words(question)
            .into_iter()
            .filter(|word| !self.stopwords.contains(word.as_str()))
            .collect()
    }

    fn answer(&self, question: &str, context: &str) -> SpanAnswer {
        let no_answer = SpanAnswer {
            answer: String::new(),
            score: 0.0,
            start: 0,
            end: 0,
        };

        let question_words = self.content_words(question);
        if question_words.is_empty() {
            return no_answer;
        }

        let mut best: Option<(f64, usize, usize)> = None;
        for (start, end) in sentences(context) {
            let sentence_words: HashSet<String> = words(&context[start..end]).into_iter().collect();
            let matched = question_words
                .iter()
                .filter(|word| sentence_words.contains(*word))
                .count();
            let score = matched as f64 / question_words.len() as f64;
            if score > best.map_or(0.0, |(s, _, _)| s) {
                best = Some((score, start, end));
            }
        }

        match best {
            Some((score, start, end)) => {
                let (start, end) = strip_terminal_punctuation(context, start, end);
                SpanAnswer {
                    answer: context[start..end].to_string(),
                    score,
                    start,
                    end,
                }
            }
            None => no_answer,
        }
    }
}

impl TextPipeline for QaPipeline {
    fn capability(&self) -> Capability {
        Capability::QuestionAnswering
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn run(&self, input: PipelineInput) -> Result<PipelineOutput> {
        let (question, context) = match input {
            PipelineInput::QuestionAnswering { question, context } => (question, context),
            _ => return Err(input_mismatch(Capability::QuestionAnswering)),
        };
        Ok(PipelineOutput::Answer(self.answer(&question, &context)))
    }
}

/// Char-offset spans of the context's sentences, trimmed of surrounding
/// whitespace.
fn sentences(context: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (index, c) in context.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let end = index + c.len_utf8();
            if let Some(span) = trim_span(context, start, end) {
                spans.push(span);
            }
            start = end;
        }
    }
    if let Some(span) = trim_span(context, start, context.len()) {
        spans.push(span);
    }
    spans
}

fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let new_start = start + leading;
    Some((new_start, new_start + trimmed.len()))
}

fn strip_terminal_punctuation(text: &str, start: usize, end: usize) -> (usize, usize) {
    let slice = &text[start..end];
    let stripped = slice
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .trim_end();
    (start, start + stripped.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Device;
    use crate::error::Error;

    fn pipeline() -> QaPipeline {
        QaPipeline::load(
            &ResourceDescriptor {
                model_id: "test-qa".to_string(),
                device: Device::Cpu,
            },
            Path::new("/nonexistent"),
        )
        .unwrap()
    }

    fn answer_of(question: &str, context: &str) -> SpanAnswer {
        match pipeline()
            .run(PipelineInput::QuestionAnswering {
                question: question.to_string(),
                context: context.to_string(),
            })
            .unwrap()
        {
            PipelineOutput::Answer(answer) => answer,
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn picks_the_sentence_with_the_most_overlap() {
        let context =
            "The Eiffel Tower stands in Paris. The Colosseum was built in Rome long ago.";
        let answer = answer_of("Where does the Eiffel Tower stand?", context);
        assert!(answer.answer.contains("Paris"));
        assert!(answer.score > 0.5);
    }

    #[test]
    fn span_offsets_slice_the_original_context() {
        let context = "Rust is a systems language. It was started at Mozilla.";
        let answer = answer_of("Who started Rust?", context);
        assert!(!answer.answer.is_empty());
        assert_eq!(&context[answer.start..answer.end], answer.answer);
    }

    #[test]
    fn answer_drops_the_trailing_period() {
        let context = "Water boils at one hundred degrees.";
        let answer = answer_of("At what temperature does water boil?", context);
        assert_eq!(answer.answer, "Water boils at one hundred degrees");
    }

    #[test]
    fn no_overlap_yields_empty_answer_with_zero_score() {
        let answer = answer_of("What is the capital of France?", "Bananas are yellow fruit.");
        assert_eq!(answer.answer, "");
        assert_eq!(answer.score, 0.0);
    }

    #[test]
    fn stopword_only_question_yields_no_answer() {
        let answer = answer_of("What is it?", "Something happened somewhere.");
        assert_eq!(answer.score, 0.0);
    }

    #[test]
    fn mismatched_input_is_an_invocation_error() {
        let err = pipeline()
            .run(PipelineInput::Sentiment {
                text: "hi".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvocationFailed { .. }));
    }
}
