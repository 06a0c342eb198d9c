use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::disk::DiskContent;
use crate::error::MemdiskError;
use crate::pipeline::{QueryRequest, QueryResponse};
use crate::server::{AppState, ApiError, ENCRYPTION_KEY_HEADER};

/// Health check endpoint - returns JSON status
pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListDisksQuery {
    #[serde(default)]
    pub detailed: bool,
}

pub async fn list_disks_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDisksQuery>,
) -> Result<Json<Value>, ApiError> {
    let disks = if query.detailed {
        serde_json::to_value(state.pipeline.list_disks_detailed().await?)
            .map_err(MemdiskError::from)?
    } else {
        json!(state.pipeline.list_disks().await?)
    };
    Ok(Json(json!({ "disks": disks })))
}

pub async fn load_disk_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DiskContent>, ApiError> {
    let key = headers
        .get(ENCRYPTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    let content = state.pipeline.load_disk_raw(&name, key).await?;
    Ok(Json(content))
}

pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let response = state.pipeline.handle_query(request).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelBody {
    pub model: String,
}

pub async fn get_model_handler(State(state): State<Arc<AppState>>) -> Json<ModelBody> {
    Json(ModelBody {
        model: state.pipeline.active_model(),
    })
}

pub async fn set_model_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ModelBody>, JsonRejection>,
) -> Result<Json<ModelBody>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    state.pipeline.set_active_model(&body.model)?;
    Ok(Json(ModelBody {
        model: state.pipeline.active_model(),
    }))
}
