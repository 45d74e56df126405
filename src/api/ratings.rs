//! Rating command endpoints.
//!
//! Each endpoint validates a typed payload, appends a task to the registry,
//! schedules the matching gateway call, and acknowledges immediately with
//! `ok`. Outcomes are observable only through the polling surface.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::core::{Task, spawn_supervised};

use super::SharedState;

/// Payload for a rating fetch.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GetRatingRequest {
    /// Requesting GUI session.
    pub app_id: i64,
    /// Asset to look up.
    pub asset_id: String,
    /// Marketplace API key; empty means anonymous.
    pub api_key: String,
}

/// Payload for a rating submission.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SendRatingRequest {
    /// Requesting GUI session.
    pub app_id: i64,
    /// Asset being rated.
    pub asset_id: String,
    /// Rating dimension, e.g. `overall` or `working_hours`.
    pub rating_type: String,
    /// Score; integers and fractional values are both accepted.
    #[schema(value_type = f64)]
    pub rating_value: serde_json::Number,
    /// Marketplace API key.
    pub api_key: String,
}

/// Payload for a bookmark listing.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GetBookmarksRequest {
    /// Requesting GUI session.
    pub app_id: i64,
    /// Marketplace API key.
    pub api_key: String,
}

/// Enqueue a rating fetch for one asset.
#[utoipa::path(
    post,
    path = "/ratings/get_rating",
    request_body = GetRatingRequest,
    responses((status = 200, description = "Task accepted", body = String))
)]
pub(super) async fn get_rating(
    State(state): State<SharedState>,
    Json(req): Json<GetRatingRequest>,
) -> &'static str {
    let data = serde_json::to_value(&req).unwrap_or_default();
    let task = Task::new(data, req.app_id, "ratings/get_rating", "Getting rating data");
    let task_id = state.registry.insert(task);

    let worker_state = Arc::clone(&state);
    let worker_id = task_id.clone();
    spawn_supervised(Arc::clone(&state.registry), task_id, async move {
        run_get_rating(worker_state, worker_id, req).await;
    });

    "ok"
}

/// Enqueue a rating submission.
#[utoipa::path(
    post,
    path = "/ratings/send_rating",
    request_body = SendRatingRequest,
    responses((status = 200, description = "Task accepted", body = String))
)]
pub(super) async fn send_rating(
    State(state): State<SharedState>,
    Json(req): Json<SendRatingRequest>,
) -> &'static str {
    let data = serde_json::to_value(&req).unwrap_or_default();
    let task = Task::new(
        data,
        req.app_id,
        "ratings/send_rating",
        format!("Sending {} rating", req.rating_type),
    );
    let task_id = state.registry.insert(task);

    let worker_state = Arc::clone(&state);
    let worker_id = task_id.clone();
    spawn_supervised(Arc::clone(&state.registry), task_id, async move {
        run_send_rating(worker_state, worker_id, req).await;
    });

    "ok"
}

/// Enqueue a bookmark listing.
#[utoipa::path(
    post,
    path = "/ratings/get_bookmarks",
    request_body = GetBookmarksRequest,
    responses((status = 200, description = "Task accepted", body = String))
)]
pub(super) async fn get_bookmarks(
    State(state): State<SharedState>,
    Json(req): Json<GetBookmarksRequest>,
) -> &'static str {
    let data = serde_json::to_value(&req).unwrap_or_default();
    let task = Task::new(
        data,
        req.app_id,
        "ratings/get_bookmarks",
        "Getting bookmarks data",
    );
    let task_id = state.registry.insert(task);

    let worker_state = Arc::clone(&state);
    let worker_id = task_id.clone();
    spawn_supervised(Arc::clone(&state.registry), task_id, async move {
        run_get_bookmarks(worker_state, worker_id, req).await;
    });

    "ok"
}

async fn run_get_rating(state: SharedState, task_id: String, req: GetRatingRequest) {
    state.registry.start(&task_id);
    match state.gateway.get_rating(&req.asset_id, &req.api_key).await {
        Ok(result) => {
            state
                .registry
                .finish(&task_id, "Rating data obtained", result);
        }
        Err(err) => {
            state
                .registry
                .fail(&task_id, format!("Getting rating failed: {err}"));
        }
    }
}

async fn run_send_rating(state: SharedState, task_id: String, req: SendRatingRequest) {
    state.registry.start(&task_id);
    match state
        .gateway
        .send_rating(&req.asset_id, &req.rating_type, &req.rating_value, &req.api_key)
        .await
    {
        Ok(result) => {
            state.registry.finish(&task_id, "Rating uploaded", result);
        }
        Err(err) => {
            state
                .registry
                .fail(&task_id, format!("Sending rating failed: {err}"));
        }
    }
}

async fn run_get_bookmarks(state: SharedState, task_id: String, req: GetBookmarksRequest) {
    state.registry.start(&task_id);
    match state.gateway.get_bookmarks(&req.api_key).await {
        Ok(result) => {
            state
                .registry
                .finish(&task_id, "Bookmarks data obtained", result);
        }
        Err(err) => {
            state
                .registry
                .fail(&task_id, format!("Getting bookmarks failed: {err}"));
        }
    }
}
