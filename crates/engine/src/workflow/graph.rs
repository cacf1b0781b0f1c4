use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A registered graph. Immutable once stored in the engine.
///
/// `nodes` binds node ids to step names and `edges` holds the default
/// successor of each node. Neither map is validated against the other:
/// a missing binding surfaces as an error only when the run reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub id: String,
    pub nodes: HashMap<String, String>,
    pub edges: HashMap<String, String>,
    pub start_node_id: String,
}

impl GraphDefinition {
    pub fn step_for(&self, node_id: &str) -> Option<&str> {
        self.nodes.get(node_id).map(String::as_str)
    }

    pub fn default_edge(&self, node_id: &str) -> Option<&str> {
        self.edges.get(node_id).map(String::as_str)
    }
}

/// Node binding as it arrives over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDef {
    pub id: String,
    pub fn_name: String,
}

impl NodeDef {
    pub fn new(id: impl Into<String>, fn_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fn_name: fn_name.into(),
        }
    }
}

/// Graph description used by the HTTP layer and by seed files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub edges: HashMap<String, String>,
    pub start_node_id: String,
}

impl GraphSpec {
    /// Collapse the node list into an id -> step map. Duplicate ids keep the
    /// last binding.
    pub fn node_map(&self) -> HashMap<String, String> {
        self.nodes
            .iter()
            .map(|n| (n.id.clone(), n.fn_name.clone()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GraphSeedFile {
    #[serde(default)]
    graphs: Vec<GraphSpec>,
}

/// Read graph definitions from a YAML file of the form `graphs: [...]`.
pub fn load_graph_specs(path: impl AsRef<Path>) -> Result<Vec<GraphSpec>> {
    let raw = std::fs::read_to_string(path)?;
    parse_graph_specs(&raw)
}

pub fn parse_graph_specs(raw: &str) -> Result<Vec<GraphSpec>> {
    let file: GraphSeedFile = serde_yaml::from_str(raw)?;
    Ok(file.graphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_node_ids_keep_last_binding() {
        let spec = GraphSpec {
            name: None,
            nodes: vec![NodeDef::new("a", "first"), NodeDef::new("a", "second")],
            edges: HashMap::new(),
            start_node_id: "a".into(),
        };
        let nodes = spec.node_map();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes["a"], "second");
    }

    #[test]
    fn parses_seed_yaml() {
        let raw = r#"
graphs:
  - name: review
    nodes:
      - { id: extract, fn_name: extract_functions }
      - { id: end, fn_name: finalize }
    edges:
      extract: end
    start_node_id: extract
"#;
        let specs = parse_graph_specs(raw).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name.as_deref(), Some("review"));
        assert_eq!(specs[0].edges["extract"], "end");
        assert_eq!(specs[0].node_map()["end"], "finalize");
    }

    #[test]
    fn lookups_on_definition() {
        let graph = GraphDefinition {
            id: "g".into(),
            nodes: HashMap::from([("a".to_string(), "step_a".to_string())]),
            edges: HashMap::from([("a".to_string(), "b".to_string())]),
            start_node_id: "a".into(),
        };
        assert_eq!(graph.step_for("a"), Some("step_a"));
        assert_eq!(graph.step_for("b"), None);
        assert_eq!(graph.default_edge("a"), Some("b"));
        assert_eq!(graph.default_edge("b"), None);
    }
}
