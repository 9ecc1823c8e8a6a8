//! Capability management endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use verba_core::{Capability, CapabilityInfo, PipelineStatus};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CapabilityList {
    pub capabilities: Vec<CapabilityInfo>,
}

#[derive(Debug, Serialize)]
pub struct LoadResponse {
    pub capability: Capability,
    pub status: PipelineStatus,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub capability: Capability,
    /// Whether a Ready or Failed entry was actually cleared.
    pub reset: bool,
}

fn parse_capability(raw: &str) -> Result<Capability, ApiError> {
    raw.parse()
        .map_err(|err: verba_core::capability::ParseCapabilityError| {
            ApiError::not_found(err.to_string())
        })
}

/// List every configured capability with its model and lifecycle state.
pub async fn list(State(state): State<AppState>) -> Json<CapabilityList> {
    Json(CapabilityList {
        capabilities: state.pipelines.snapshot().await,
    })
}

/// Warm a capability's pipeline without running any inference.
pub async fn load(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<LoadResponse>, ApiError> {
    let capability = parse_capability(&raw)?;
    state
        .pipelines
        .get_timeout(capability, state.request_timeout())
        .await?;

    Ok(Json(LoadResponse {
        capability,
        status: state.pipelines.status(capability).await,
    }))
}

/// Clear a Ready or Failed entry so the next request rebuilds it.
pub async fn reset(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let capability = parse_capability(&raw)?;
    let reset = state.pipelines.invalidate(capability).await;
    Ok(Json(ResetResponse { capability, reset }))
}
