//! API routes and handlers.

mod capabilities;
mod health;
mod predict;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // API index
        .route("/api", get(index))
        // Health check
        .route("/health", get(health::check))
        // Prediction endpoints
        .route("/predict/sentiment", post(predict::sentiment))
        .route("/predict/qa", post(predict::qa))
        .route("/predict/generate", post(predict::generate))
        // Capability management
        .route("/capabilities", get(capabilities::list))
        .route("/capabilities/:capability/load", post(capabilities::load))
        .route("/capabilities/:capability/reset", post(capabilities::reset))
        // Browsers ask for this on every visit; keep it out of the UI fallback
        .route("/favicon.ico", get(favicon))
        // Serve the static demo UI
        .fallback_service(
            tower_http::services::ServeDir::new("ui")
                .fallback(tower_http::services::ServeFile::new("ui/index.html")),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Welcome document listing the endpoints.
async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the verba NLP API.",
        "endpoints": {
            "sentiment_analysis": "POST /predict/sentiment",
            "question_answering": "POST /predict/qa",
            "text_generation": "POST /predict/generate",
            "capabilities": "GET /capabilities",
            "health": "GET /health"
        }
    }))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::util::ServiceExt;
    use verba_core::{
        Capability, Error, GeneratedText, Handle, LabelScore, PipelineCache, PipelineInput,
        PipelineOutput, SpanAnswer, TextPipeline,
    };

    #[derive(Debug)]
    struct EchoPipeline {
        capability: Capability,
    }

    impl TextPipeline for EchoPipeline {
        fn capability(&self) -> Capability {
            self.capability
        }

        fn model_id(&self) -> &str {
            "echo"
        }

        fn run(&self, input: PipelineInput) -> verba_core::Result<PipelineOutput> {
            Ok(match input {
                PipelineInput::Sentiment { .. } => PipelineOutput::Sentiment(vec![LabelScore {
                    label: "POSITIVE".to_string(),
                    score: 1.0,
                }]),
                PipelineInput::QuestionAnswering { context, .. } => {
                    PipelineOutput::Answer(SpanAnswer {
                        end: context.len(),
                        answer: context,
                        score: 1.0,
                        start: 0,
                    })
                }
                PipelineInput::Generation { prompt, .. } => {
                    PipelineOutput::Generation(GeneratedText {
                        generated_text: prompt,
                    })
                }
            })
        }
    }

    fn echo_router() -> Router {
        let config = verba_core::EngineConfig::default();
        let cache = PipelineCache::new(config.descriptors(), |capability, _| {
            let handle: Handle = Arc::new(EchoPipeline { capability });
            Ok(handle)
        });
        create_router(AppState::new(cache))
    }

    fn failing_router() -> Router {
        let config = verba_core::EngineConfig::default();
        let cache = PipelineCache::new(config.descriptors(), |capability, _| {
            Err(Error::ConstructionFailed {
                capability,
                cause: "model file missing".to_string(),
            })
        });
        create_router(AppState::new(cache))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn sentiment_round_trip_returns_ok() {
        let response = echo_router()
            .oneshot(post_json("/predict/sentiment", r#"{"text":"lovely"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let response = echo_router()
            .oneshot(post_json("/predict/sentiment", r#"{"text":"   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn qa_requires_both_fields() {
        let response = echo_router()
            .oneshot(post_json(
                "/predict/qa",
                r#"{"question":"?","context":"  "}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_round_trip_returns_ok() {
        let response = echo_router()
            .oneshot(post_json("/predict/generate", r#"{"prompt":"once upon"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn failed_construction_maps_to_service_unavailable() {
        let router = failing_router();
        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(post_json("/predict/sentiment", r#"{"text":"hello"}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    #[tokio::test]
    async fn unknown_capability_name_is_not_found() {
        let response = echo_router()
            .oneshot(post_json("/capabilities/summarization/load", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn capability_list_and_health_respond() {
        let router = echo_router();
        for uri in ["/capabilities", "/health", "/api"] {
            let response = router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        }
    }

    #[tokio::test]
    async fn reset_before_first_build_reports_nothing_cleared() {
        let response = echo_router()
            .oneshot(post_json("/capabilities/sentiment/reset", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn favicon_is_no_content() {
        let response = echo_router()
            .oneshot(
                Request::builder()
                    .uri("/favicon.ico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
