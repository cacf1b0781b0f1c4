use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::error::ApiError;
use crate::{
    metrics,
    workflow::{GraphEngine, NodeDef, RunStatus},
    Error,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGraphRequest {
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub edges: HashMap<String, String>,
    pub start_node_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGraphResponse {
    pub graph_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunGraphRequest {
    pub graph_id: String,
    #[serde(default)]
    pub initial_state: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunGraphResponse {
    pub run_id: String,
    pub final_state: Value,
    pub execution_log: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunStateResponse {
    pub run_id: String,
    pub status: RunStatus,
    pub state: Value,
    pub execution_log: Vec<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn export_metrics() -> Result<String, ApiError> {
    Ok(metrics::gather_metrics()?)
}

pub async fn create_graph<S>(
    State(engine): State<Arc<GraphEngine<S>>>,
    Json(req): Json<CreateGraphRequest>,
) -> Json<CreateGraphResponse>
where
    S: Clone + Send + Sync + 'static,
{
    info!("Creating graph");
    let nodes = req
        .nodes
        .into_iter()
        .map(|n| (n.id, n.fn_name))
        .collect();
    let graph_id = engine.register(nodes, req.edges, req.start_node_id).await;
    Json(CreateGraphResponse { graph_id })
}

pub async fn run_graph<S>(
    State(engine): State<Arc<GraphEngine<S>>>,
    Json(req): Json<RunGraphRequest>,
) -> Result<Json<RunGraphResponse>, ApiError>
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    if !engine.graph_exists(&req.graph_id).await {
        return Err(Error::GraphNotFound(req.graph_id).into());
    }

    let run_id = engine.create_run_placeholder(&req.graph_id).await?;
    let state: S = serde_json::from_value(req.initial_state)
        .map_err(|e| ApiError::bad_request(format!("Invalid initial state: {}", e)))?;

    let output = engine
        .execute(&req.graph_id, state, Some(run_id), None)
        .await?;

    Ok(Json(RunGraphResponse {
        run_id: output.run_id,
        final_state: serde_json::to_value(&output.state)?,
        execution_log: output.log,
    }))
}

pub async fn get_run_state<S>(
    State(engine): State<Arc<GraphEngine<S>>>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStateResponse>, ApiError>
where
    S: Clone + Send + Sync + Serialize + 'static,
{
    let run = engine.run_state(&run_id).await?;
    let state = match &run.state {
        Some(state) => serde_json::to_value(state)?,
        None => Value::Null,
    };

    Ok(Json(RunStateResponse {
        run_id: run.id,
        status: run.status,
        state,
        execution_log: run.log,
    }))
}
