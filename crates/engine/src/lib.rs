pub mod agents;
pub mod config;
pub mod metrics;
#[cfg(feature = "server")]
pub mod server;
pub mod tools;
pub mod workflow;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Graph not found: {0}")]
    GraphNotFound(String),
    #[error("No function mapped for node id '{0}'")]
    UnmappedNode(String),
    #[error("Function '{0}' not registered in node registry")]
    UnregisteredStep(String),
    #[error("Step '{step}' failed: {message}")]
    StepExecution { step: String, message: String },
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("Tool '{0}' is not registered")]
    ToolNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap a failure raised inside a step body.
    pub fn step(step: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::StepExecution {
            step: step.into(),
            message: err.to_string(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::GraphNotFound(_) => "graph_not_found",
            Error::UnmappedNode(_) => "unmapped_node",
            Error::UnregisteredStep(_) => "unregistered_step",
            Error::StepExecution { .. } => "step_execution_error",
            Error::RunNotFound(_) => "run_not_found",
            Error::ToolNotFound(_) => "tool_not_found",
            Error::Config(_) => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Io(_) => "io_error",
            Error::SerdeJson(_) => "json_error",
            Error::SerdeYaml(_) => "yaml_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_carries_step_name() {
        let err = Error::step("detect_issues", "boom");
        assert_eq!(err.to_string(), "Step 'detect_issues' failed: boom");
        assert_eq!(err.kind(), "step_execution_error");
    }

    #[test]
    fn lookup_errors_match_log_wording() {
        assert_eq!(
            Error::UnmappedNode("x".into()).to_string(),
            "No function mapped for node id 'x'"
        );
        assert_eq!(
            Error::UnregisteredStep("f".into()).to_string(),
            "Function 'f' not registered in node registry"
        );
    }
}
