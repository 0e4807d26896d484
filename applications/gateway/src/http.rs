// Copyright 2024 The Gateway Contributors
// SPDX-License-Identifier: BSD-3-Clause

use std::{sync::Arc, time::Instant};

use axum::{
    body::StreamBody,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json,
    Router,
};
use chrono::Utc;
use futures::StreamExt;
use gateway_client::types::is_valid_id;
use gateway_data_source::{DataStreamError, TxChunksDataSource};
use gateway_db::ChainDatabase;
use log::*;
use serde::Serialize;

const LOG_TARGET: &str = "gateway::http";

pub struct AppState {
    pub db: Arc<dyn ChainDatabase>,
    pub data_source: Arc<TxChunksDataSource>,
    pub started_at: Instant,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/debug", get(debug))
        .route("/gateway_metrics", get(not_implemented))
        .route("/graphql", get(not_implemented))
        .route("/:tx_id", get(stream_tx))
        .route("/:tx_id/*subpath", get(stream_tx))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthcheckResponse {
    uptime: u64,
    message: &'static str,
    date: String,
}

async fn healthcheck(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthcheckResponse {
        uptime: state.started_at.elapsed().as_secs(),
        message: "OK",
        date: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
struct DebugResponse {
    db: gateway_db::DebugCounts,
}

async fn debug(State(state): State<Arc<AppState>>) -> Response {
    match state.db.get_debug_info().await {
        Ok(db) => Json(DebugResponse { db }).into_response(),
        Err(e) => {
            error!(target: LOG_TARGET, "failed to read debug info: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        },
    }
}

/// `subpath` is accepted but unused: the full payload is always streamed back, matching
/// the upstream gateway's behavior of treating `/{txId}/{subpath}` as an alias of
/// `/{txId}` rather than a manifest-relative lookup (manifest resolution is out of scope).
async fn stream_tx(State(state): State<Arc<AppState>>, Path(tx_id): Path<String>) -> Response {
    if !is_valid_id(&tx_id) {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    }

    let stream = state.data_source.stream(tx_id.clone()).map(|item| {
        item.map_err(|e| {
            warn!(target: LOG_TARGET, "tx {tx_id} stream terminated: {e}");
            e
        })
    });

    let mut peekable = Box::pin(stream.peekable());
    match peekable.as_mut().peek().await {
        Some(Err(DataStreamError::TxNotFound { .. })) => (StatusCode::NOT_FOUND, "not found").into_response(),
        Some(Err(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "failed to stream transaction").into_response(),
        _ => {
            let body = StreamBody::new(peekable);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(axum::body::boxed(body))
                .expect("static response parts are always valid")
        },
    }
}

async fn not_implemented() -> impl IntoResponse {
    (StatusCode::NOT_IMPLEMENTED, "not implemented")
}
