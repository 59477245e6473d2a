// Copyright (c) 2025 - Cowboy AI, Inc.
//! Trigger Endpoint
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/` | POST | Run the provisioning workflow |
//! | `/call` | POST | Same, function-runtime path |
//! | `/health` | GET | Liveness |
//!
//! Workflow responses are always `200 {"status": "Success"}`, with the
//! report embedded when the workflow is configured to do so.

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;
use crate::workflow::{ProvisionResponse, ProvisioningWorkflow};

/// Build the trigger router
pub fn router(workflow: Arc<ProvisioningWorkflow>) -> Router {
    Router::new()
        .route("/", post(invoke))
        .route("/call", post(invoke))
        .route("/health", get(health))
        .with_state(workflow)
}

async fn invoke(
    State(workflow): State<Arc<ProvisioningWorkflow>>,
    body: Bytes,
) -> Json<ProvisionResponse> {
    Json(workflow.handle(&body).await)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Serve the trigger endpoint until the listener fails
pub async fn serve(config: &ServerConfig, workflow: Arc<ProvisioningWorkflow>) -> std::io::Result<()> {
    let app = router(workflow);

    info!("Starting trigger endpoint on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await
}
