//! Capability taxonomy and identifier parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Logical name of an inference task served by the engine.
///
/// The set of capabilities is closed at compile time; configuration decides
/// which model backs each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Sentiment,
    QuestionAnswering,
    Generation,
}

impl Capability {
    pub fn all() -> &'static [Capability] {
        &[
            Capability::Sentiment,
            Capability::QuestionAnswering,
            Capability::Generation,
        ]
    }

    /// Canonical identifier used in routes, logs, and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Sentiment => "sentiment",
            Capability::QuestionAnswering => "question-answering",
            Capability::Generation => "generation",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ParseCapabilityError {
    input: String,
}

impl ParseCapabilityError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl fmt::Display for ParseCapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.input.trim().is_empty() {
            "<empty>"
        } else {
            self.input.trim()
        };
        write!(f, "Unsupported capability identifier: {shown}")
    }
}

impl std::error::Error for ParseCapabilityError {}

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    /// Accepts the canonical names plus the upstream task aliases
    /// (`sentiment-analysis`, `qa`, `text-generation`, `generate`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentiment" | "sentiment-analysis" => Ok(Capability::Sentiment),
            "question-answering" | "qa" => Ok(Capability::QuestionAnswering),
            "generation" | "text-generation" | "generate" => Ok(Capability::Generation),
            _ => Err(ParseCapabilityError::new(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_names() {
        for capability in Capability::all() {
            let parsed: Capability = capability.as_str().parse().unwrap();
            assert_eq!(parsed, *capability);
        }
    }

    #[test]
    fn parse_upstream_aliases() {
        assert_eq!(
            "sentiment-analysis".parse::<Capability>().unwrap(),
            Capability::Sentiment
        );
        assert_eq!(
            "qa".parse::<Capability>().unwrap(),
            Capability::QuestionAnswering
        );
        assert_eq!(
            "text-generation".parse::<Capability>().unwrap(),
            Capability::Generation
        );
    }

    #[test]
    fn parse_is_case_and_whitespace_tolerant() {
        assert_eq!(
            "  Sentiment ".parse::<Capability>().unwrap(),
            Capability::Sentiment
        );
    }

    #[test]
    fn parse_rejects_unknown_identifier() {
        let err = "summarization".parse::<Capability>().unwrap_err();
        assert!(err.to_string().contains("summarization"));
    }

    #[test]
    fn parse_rejects_empty_input() {
        let err = "   ".parse::<Capability>().unwrap_err();
        assert!(err.to_string().contains("<empty>"));
    }
}
