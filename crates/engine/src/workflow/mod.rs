//! Graph execution engine.
//!
//! A graph binds node ids to step names and gives each node an optional
//! default successor. The engine walks a graph from its start node, running
//! each step against a shared state value, until a step ends the run or the
//! step budget is spent.

pub mod engine;
pub mod graph;
pub mod outcome;
pub mod run;
pub mod state;
pub mod step;

pub use engine::{ExecutionOutput, GraphEngine, DEFAULT_MAX_STEPS};
pub use graph::{load_graph_specs, parse_graph_specs, GraphDefinition, GraphSpec, NodeDef};
pub use outcome::{resolve_next, StepOutcome, Transition};
pub use run::RunRecord;
pub use state::RunStatus;
pub use step::{AsyncFnStep, FnStep, Step, StepRegistry};
