use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    metrics,
    tools::ToolRegistry,
    workflow::{
        outcome::resolve_next, GraphDefinition, GraphSpec, RunRecord, RunStatus, Step,
        StepOutcome, StepRegistry,
    },
    Error, Result,
};

pub const DEFAULT_MAX_STEPS: usize = 100;

/// Final state and log of a finished run.
#[derive(Debug, Clone)]
pub struct ExecutionOutput<S> {
    pub run_id: String,
    pub state: S,
    pub log: Vec<String>,
}

/// Owns registered graphs and run records and drives runs step by step.
///
/// Steps are registered while the engine is still exclusively owned; once
/// wrapped in an `Arc` the engine is shared by all callers and supports
/// concurrent runs, each with its own record.
pub struct GraphEngine<S> {
    steps: StepRegistry<S>,
    tools: Arc<ToolRegistry>,
    graphs: RwLock<HashMap<String, Arc<GraphDefinition>>>,
    runs: RwLock<HashMap<String, RunRecord<S>>>,
    default_max_steps: usize,
}

impl<S> GraphEngine<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(tools: ToolRegistry) -> Self {
        Self::with_steps(StepRegistry::new(), tools)
    }

    pub fn with_steps(steps: StepRegistry<S>, tools: ToolRegistry) -> Self {
        Self {
            steps,
            tools: Arc::new(tools),
            graphs: RwLock::new(HashMap::new()),
            runs: RwLock::new(HashMap::new()),
            default_max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Budget applied when `execute` is called without one.
    pub fn with_default_max_steps(mut self, max_steps: usize) -> Self {
        self.default_max_steps = max_steps;
        self
    }

    pub fn register_step(&mut self, name: impl Into<String>, step: Arc<dyn Step<S>>) {
        self.steps.register(name, step);
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut S, &ToolRegistry) -> Result<StepOutcome> + Send + Sync + 'static,
    {
        self.steps.register_fn(name, f);
    }

    pub fn register_async_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: for<'a> Fn(&'a mut S, &'a ToolRegistry) -> BoxFuture<'a, Result<StepOutcome>>
            + Send
            + Sync
            + 'static,
    {
        self.steps.register_async_fn(name, f);
    }

    /// Store a graph verbatim under a fresh id.
    pub async fn register(
        &self,
        nodes: HashMap<String, String>,
        edges: HashMap<String, String>,
        start_node_id: impl Into<String>,
    ) -> String {
        self.create_graph(nodes, edges, start_node_id, true).await
    }

    /// With `overwrite_if_exists` unset, ids are regenerated until one is unused.
    pub async fn create_graph(
        &self,
        nodes: HashMap<String, String>,
        edges: HashMap<String, String>,
        start_node_id: impl Into<String>,
        overwrite_if_exists: bool,
    ) -> String {
        let mut graphs = self.graphs.write().await;

        let mut graph_id = Uuid::new_v4().to_string();
        if !overwrite_if_exists {
            while graphs.contains_key(&graph_id) {
                graph_id = Uuid::new_v4().to_string();
            }
        }

        let mut node_ids: Vec<&String> = nodes.keys().collect();
        node_ids.sort();
        info!("Graph created: {} with nodes {:?}", graph_id, node_ids);

        let graph = GraphDefinition {
            id: graph_id.clone(),
            nodes,
            edges,
            start_node_id: start_node_id.into(),
        };
        graphs.insert(graph_id.clone(), Arc::new(graph));
        metrics::GRAPHS_CREATED_TOTAL.inc();

        graph_id
    }

    pub async fn register_spec(&self, spec: &GraphSpec, overwrite_if_exists: bool) -> String {
        self.create_graph(
            spec.node_map(),
            spec.edges.clone(),
            spec.start_node_id.clone(),
            overwrite_if_exists,
        )
        .await
    }

    pub async fn graph_exists(&self, graph_id: &str) -> bool {
        self.graphs.read().await.contains_key(graph_id)
    }

    pub async fn get_graph(&self, graph_id: &str) -> Option<Arc<GraphDefinition>> {
        self.graphs.read().await.get(graph_id).cloned()
    }

    pub async fn list_graphs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.graphs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Reserve a run id before the initial state is available.
    pub async fn create_run_placeholder(&self, graph_id: &str) -> Result<String> {
        if !self.graph_exists(graph_id).await {
            return Err(Error::GraphNotFound(graph_id.to_string()));
        }

        let run_id = Uuid::new_v4().to_string();
        self.runs
            .write()
            .await
            .insert(run_id.clone(), RunRecord::placeholder(run_id.clone(), graph_id));
        debug!("Run placeholder {} created for graph {}", run_id, graph_id);

        Ok(run_id)
    }

    pub async fn get_run(&self, run_id: &str) -> Option<RunRecord<S>> {
        self.runs.read().await.get(run_id).cloned()
    }

    pub async fn run_state(&self, run_id: &str) -> Result<RunRecord<S>> {
        self.get_run(run_id)
            .await
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    pub async fn list_runs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run `graph_id` against `state` until no next node remains or the step
    /// budget is spent.
    ///
    /// `run_id` may name a placeholder from [`create_run_placeholder`]; when
    /// omitted a fresh id is generated. `max_steps` defaults to the engine's
    /// budget. Running out of budget completes the run normally.
    ///
    /// [`create_run_placeholder`]: GraphEngine::create_run_placeholder
    pub async fn execute(
        &self,
        graph_id: &str,
        state: S,
        run_id: Option<String>,
        max_steps: Option<usize>,
    ) -> Result<ExecutionOutput<S>> {
        let max_steps = max_steps.unwrap_or(self.default_max_steps);
        if max_steps == 0 {
            return Err(Error::Validation("max_steps must be greater than zero".to_string()));
        }

        let graph = self
            .get_graph(graph_id)
            .await
            .ok_or_else(|| Error::GraphNotFound(graph_id.to_string()))?;

        let run_id = self.start_run(&graph, run_id, &state).await?;
        metrics::RUNS_STARTED_TOTAL.inc();
        info!("Starting execution run {} for graph {}", run_id, graph_id);

        let mut state = state;
        let mut log = Vec::new();

        match self.dispatch(&graph, &run_id, &mut state, &mut log, max_steps).await {
            Ok(steps_taken) => {
                self.finish_run(&run_id, RunStatus::Completed, &state, &log, steps_taken)
                    .await;
                metrics::RUNS_COMPLETED_TOTAL.inc();
                info!("Run {} completed in {} steps", run_id, steps_taken);

                Ok(ExecutionOutput { run_id, state, log })
            }
            Err(e) => {
                error!("Execution of run {} failed: {}", run_id, e);
                log.push(format!("error: {}", e));
                let steps_taken = self
                    .get_run(&run_id)
                    .await
                    .map(|r| r.steps_taken)
                    .unwrap_or_default();
                self.finish_run(&run_id, RunStatus::Failed, &state, &log, steps_taken)
                    .await;
                metrics::RUNS_FAILED_TOTAL.inc();

                Err(e)
            }
        }
    }

    async fn start_run(
        &self,
        graph: &GraphDefinition,
        run_id: Option<String>,
        state: &S,
    ) -> Result<String> {
        let run_id = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut runs = self.runs.write().await;

        let run = runs
            .entry(run_id.clone())
            .or_insert_with(|| RunRecord::placeholder(run_id.clone(), graph.id.clone()));

        if run.graph_id != graph.id {
            return Err(Error::Validation(format!(
                "Run '{}' belongs to graph '{}', not '{}'",
                run_id, run.graph_id, graph.id
            )));
        }
        if !run.advance(RunStatus::Running) {
            return Err(Error::Validation(format!(
                "Run '{}' is already {}",
                run_id, run.status
            )));
        }
        run.snapshot(state, &[], 0);

        Ok(run_id)
    }

    async fn dispatch(
        &self,
        graph: &GraphDefinition,
        run_id: &str,
        state: &mut S,
        log: &mut Vec<String>,
        max_steps: usize,
    ) -> Result<usize> {
        let mut current = Some(graph.start_node_id.clone());
        let mut steps_taken = 0;

        while let Some(node_id) = current {
            if steps_taken >= max_steps {
                warn!(
                    "Run {} reached its step budget of {} at node '{}', stopping",
                    run_id, max_steps, node_id
                );
                break;
            }
            steps_taken += 1;

            log.push(format!("Executing node: {}", node_id));
            self.record_progress(run_id, state, log, steps_taken).await;

            let step_name = graph
                .step_for(&node_id)
                .ok_or_else(|| Error::UnmappedNode(node_id.clone()))?;
            let step = self.steps.get(step_name)?;

            debug!("Calling node function '{}' for node id '{}'", step_name, node_id);
            let outcome = AssertUnwindSafe(step.run(state, &self.tools))
                .catch_unwind()
                .await
                .map_err(|panic| Error::step(step_name, panic_message(panic.as_ref())))?
                .map_err(|e| match e {
                    Error::StepExecution { .. } => e,
                    other => Error::step(step_name, other),
                })?;
            metrics::STEPS_EXECUTED_TOTAL.inc();

            let transition = resolve_next(graph, &node_id, outcome);
            if let (true, Some(next)) = (transition.requested, transition.next.as_deref()) {
                log.push(format!("Node '{}' requested next node '{}'", node_id, next));
            }

            let next_label = transition.next.as_deref().unwrap_or("None");
            debug!("Transitioning from '{}' to '{}'", node_id, next_label);
            log.push(format!("Transitioning from '{}' to '{}'", node_id, next_label));

            current = transition.next;
        }

        Ok(steps_taken)
    }

    async fn record_progress(&self, run_id: &str, state: &S, log: &[String], steps_taken: usize) {
        if let Some(run) = self.runs.write().await.get_mut(run_id) {
            run.snapshot(state, log, steps_taken);
        }
    }

    async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        state: &S,
        log: &[String],
        steps_taken: usize,
    ) {
        if let Some(run) = self.runs.write().await.get_mut(run_id) {
            run.snapshot(state, log, steps_taken);
            run.advance(status);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
