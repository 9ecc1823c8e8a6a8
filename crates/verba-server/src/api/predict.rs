//! Prediction endpoints.

use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use verba_core::{Capability, GeneratedText, PipelineInput, PipelineOutput, SpanAnswer};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SentimentRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SentimentResponse {
    /// label -> score, every score in [0, 1].
    pub prediction: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct QaRequest {
    pub question: String,
    pub context: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_max_length() -> usize {
    50
}

fn default_temperature() -> f64 {
    0.9
}

fn clamp_max_length(value: usize) -> usize {
    value.clamp(1, 512)
}

pub async fn sentiment(
    State(state): State<AppState>,
    Json(req): Json<SentimentRequest>,
) -> Result<Json<SentimentResponse>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("The 'text' field must not be empty"));
    }

    let _permit = state.acquire_permit().await;
    let pipeline = state
        .pipelines
        .get_timeout(Capability::Sentiment, state.request_timeout())
        .await?;

    let output = pipeline.run(PipelineInput::Sentiment { text: req.text })?;
    let PipelineOutput::Sentiment(scores) = output else {
        return Err(ApiError::internal("unexpected pipeline output"));
    };

    Ok(Json(SentimentResponse {
        prediction: scores.into_iter().map(|s| (s.label, s.score)).collect(),
    }))
}

pub async fn qa(
    State(state): State<AppState>,
    Json(req): Json<QaRequest>,
) -> Result<Json<SpanAnswer>, ApiError> {
    if req.question.trim().is_empty() || req.context.trim().is_empty() {
        return Err(ApiError::bad_request(
            "The 'question' and 'context' fields must not be empty",
        ));
    }

    let _permit = state.acquire_permit().await;
    let pipeline = state
        .pipelines
        .get_timeout(Capability::QuestionAnswering, state.request_timeout())
        .await?;

    let output = pipeline.run(PipelineInput::QuestionAnswering {
        question: req.question,
        context: req.context,
    })?;
    let PipelineOutput::Answer(answer) = output else {
        return Err(ApiError::internal("unexpected pipeline output"));
    };

    Ok(Json(answer))
}

pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GeneratedText>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("The 'prompt' field must not be empty"));
    }

    let _permit = state.acquire_permit().await;
    let pipeline = state
        .pipelines
        .get_timeout(Capability::Generation, state.request_timeout())
        .await?;

    let output = pipeline.run(PipelineInput::Generation {
        prompt: req.prompt,
        max_length: clamp_max_length(req.max_length),
        temperature: req.temperature,
    })?;
    let PipelineOutput::Generation(generated) = output else {
        return Err(ApiError::internal("unexpected pipeline output"));
    };

    Ok(Json(generated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_length_is_clamped_to_sane_bounds() {
        assert_eq!(clamp_max_length(0), 1);
        assert_eq!(clamp_max_length(50), 50);
        assert_eq!(clamp_max_length(10_000), 512);
    }
}
