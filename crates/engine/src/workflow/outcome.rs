use serde_json::Value;

use super::graph::GraphDefinition;

/// What a step tells the engine about where to go next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StepOutcome {
    /// No instruction: follow the default edge, or stop if there is none.
    #[default]
    Continue,
    /// Jump to the given node, overriding the default edge.
    Goto(String),
    /// Structured result carrying an explicit `next` field. `None` or an
    /// empty id ends the run.
    Route(Option<String>),
}

impl StepOutcome {
    pub fn goto(node_id: impl Into<String>) -> Self {
        StepOutcome::Goto(node_id.into())
    }

    pub fn stop() -> Self {
        StepOutcome::Route(None)
    }

    /// Interpret a loosely-typed step result.
    ///
    /// `null` is no instruction, a non-empty string is an explicit jump, an
    /// object with a `next` key routes on that key, anything else falls back
    /// to the default edge.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => StepOutcome::Continue,
            Value::String(s) if !s.is_empty() => StepOutcome::Goto(s.clone()),
            Value::Object(map) if map.contains_key("next") => {
                StepOutcome::Route(map.get("next").and_then(Value::as_str).map(str::to_string))
            }
            _ => StepOutcome::Continue,
        }
    }
}

/// Where the run goes after `current` finished with `outcome`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: Option<String>,
    /// Set when the step asked for `next` itself instead of using the graph.
    pub requested: bool,
}

pub fn resolve_next(graph: &GraphDefinition, current: &str, outcome: StepOutcome) -> Transition {
    match outcome {
        StepOutcome::Goto(id) if !id.is_empty() => Transition {
            next: Some(id),
            requested: true,
        },
        StepOutcome::Goto(_) | StepOutcome::Continue => Transition {
            next: graph.default_edge(current).map(str::to_string),
            requested: false,
        },
        StepOutcome::Route(next) => Transition {
            next: next.filter(|id| !id.is_empty()),
            requested: false,
        },
    }
}
