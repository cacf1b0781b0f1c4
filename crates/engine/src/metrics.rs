use lazy_static::lazy_static;
use prometheus::{register_int_counter_with_registry, Encoder, IntCounter, Registry, TextEncoder};

use crate::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref GRAPHS_CREATED_TOTAL: IntCounter = register_int_counter_with_registry!(
        "stepgraph_graphs_created_total",
        "Total number of registered graphs.",
        REGISTRY
    )
    .expect("Failed to register GRAPHS_CREATED_TOTAL");
    pub static ref RUNS_STARTED_TOTAL: IntCounter = register_int_counter_with_registry!(
        "stepgraph_runs_started_total",
        "Total number of runs that entered the running state.",
        REGISTRY
    )
    .expect("Failed to register RUNS_STARTED_TOTAL");
    pub static ref RUNS_COMPLETED_TOTAL: IntCounter = register_int_counter_with_registry!(
        "stepgraph_runs_completed_total",
        "Total number of completed runs.",
        REGISTRY
    )
    .expect("Failed to register RUNS_COMPLETED_TOTAL");
    pub static ref RUNS_FAILED_TOTAL: IntCounter = register_int_counter_with_registry!(
        "stepgraph_runs_failed_total",
        "Total number of failed runs.",
        REGISTRY
    )
    .expect("Failed to register RUNS_FAILED_TOTAL");
    pub static ref STEPS_EXECUTED_TOTAL: IntCounter = register_int_counter_with_registry!(
        "stepgraph_steps_executed_total",
        "Total number of step invocations across all runs.",
        REGISTRY
    )
    .expect("Failed to register STEPS_EXECUTED_TOTAL");
}

/// Force registration so every counter shows up in the exposition, even at zero.
pub fn register_metrics() {
    lazy_static::initialize(&GRAPHS_CREATED_TOTAL);
    lazy_static::initialize(&RUNS_STARTED_TOTAL);
    lazy_static::initialize(&RUNS_COMPLETED_TOTAL);
    lazy_static::initialize(&RUNS_FAILED_TOTAL);
    lazy_static::initialize(&STEPS_EXECUTED_TOTAL);
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> Result<String> {
    register_metrics();
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| Error::Internal(format!("Failed to convert metrics to string: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_lists_all_counters() {
        let text = gather_metrics().unwrap();
        assert!(text.contains("stepgraph_graphs_created_total"));
        assert!(text.contains("stepgraph_runs_started_total"));
        assert!(text.contains("stepgraph_runs_completed_total"));
        assert!(text.contains("stepgraph_runs_failed_total"));
        assert!(text.contains("stepgraph_steps_executed_total"));
    }
}
