//! Code Review Workflow
//!
//! A small static-analysis pipeline used as the bundled sample graph:
//! extract functions, score their complexity, detect issues, suggest fixes
//! and loop back to the complexity check until the quality score is high
//! enough.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    tools::{Tool, ToolRegistry},
    workflow::{GraphEngine, GraphSpec, NodeDef, StepOutcome},
    Error, Result,
};

/// Score at which `suggest_improvements` stops looping back to `check`.
pub const QUALITY_THRESHOLD: f64 = 0.9;

lazy_static! {
    static ref FUNCTION_DEF: Regex = Regex::new(r"^def\s+([^(\s]+)").expect("valid function regex");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMeta {
    pub name: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
}

/// Shared state for the code review graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeReviewState {
    /// Raw code to be reviewed
    pub code_text: String,
    pub functions: Vec<FunctionMeta>,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
    /// Overall quality score (0-1)
    pub quality_score: f64,
    pub metadata: Map<String, Value>,
}

impl CodeReviewState {
    pub fn new(code_text: impl Into<String>) -> Self {
        Self {
            code_text: code_text.into(),
            ..Default::default()
        }
    }
}

pub struct ComplexityEstimator;

#[async_trait]
impl Tool for ComplexityEstimator {
    fn name(&self) -> &str {
        "complexity_estimator"
    }

    fn description(&self) -> &str {
        "Estimate a function's complexity in [0, 1] from its body length."
    }

    async fn call(&self, input: Value) -> anyhow::Result<Value> {
        let function: FunctionMeta = serde_json::from_value(input)?;
        let complexity = (function.body.len() as f64 / 200.0).min(1.0);
        Ok(Value::from(complexity))
    }
}

pub struct IssueDetector;

#[async_trait]
impl Tool for IssueDetector {
    fn name(&self) -> &str {
        "issue_detector"
    }

    fn description(&self) -> &str {
        "Flag TODO/FIXME markers and overly long function bodies."
    }

    async fn call(&self, input: Value) -> anyhow::Result<Value> {
        let function: FunctionMeta = serde_json::from_value(input)?;
        let mut issues = Vec::new();
        if function.body.contains("TODO") || function.body.contains("FIXME") {
            issues.push(Issue {
                function: None,
                kind: "todo".to_string(),
                detail: "Found TODO/FIXME comment".to_string(),
            });
        }
        if function.body.lines().count() > 50 {
            issues.push(Issue {
                function: None,
                kind: "long_function".to_string(),
                detail: "Function body too long".to_string(),
            });
        }
        Ok(serde_json::to_value(issues)?)
    }
}

pub struct SuggestionGenerator;

#[async_trait]
impl Tool for SuggestionGenerator {
    fn name(&self) -> &str {
        "suggestion_generator"
    }

    fn description(&self) -> &str {
        "Turn detected issues into numbered suggestions."
    }

    async fn call(&self, input: Value) -> anyhow::Result<Value> {
        let issues: Vec<Issue> = serde_json::from_value(input)?;
        let suggestions: Vec<String> = issues
            .iter()
            .enumerate()
            .map(|(i, issue)| {
                format!(
                    "Suggestion {}: Address issue {} - {}",
                    i + 1,
                    issue.kind,
                    issue.detail
                )
            })
            .collect();
        Ok(serde_json::to_value(suggestions)?)
    }
}

async fn call_tool<I, O>(tools: &ToolRegistry, name: &str, input: &I) -> Result<O>
where
    I: Serialize + ?Sized,
    O: DeserializeOwned,
{
    let tool = tools.get_tool(name)?;
    let output = tool
        .call(serde_json::to_value(input)?)
        .await
        .map_err(|e| Error::step(name, e))?;
    Ok(serde_json::from_value(output)?)
}

pub fn extract_functions(state: &mut CodeReviewState, _tools: &ToolRegistry) -> Result<StepOutcome> {
    let mut functions = Vec::new();
    let mut current: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();

    for line in state.code_text.lines() {
        if let Some(caps) = FUNCTION_DEF.captures(line.trim()) {
            if let Some(name) = current.take() {
                functions.push(FunctionMeta {
                    name,
                    body: body.join("\n"),
                });
            }
            current = Some(caps[1].to_string());
            body.clear();
        } else if current.is_some() {
            body.push(line);
        }
    }
    if let Some(name) = current {
        functions.push(FunctionMeta {
            name,
            body: body.join("\n"),
        });
    }
    if functions.is_empty() {
        functions.push(FunctionMeta {
            name: "synthetic_main".to_string(),
            body: state.code_text.clone(),
        });
    }

    debug!("extract_functions -> found {} functions", functions.len());
    state
        .metadata
        .insert("extracted".to_string(), Value::from(functions.len()));
    state.functions = functions;
    Ok(StepOutcome::Continue)
}

/// Sets the baseline score on the first pass. Later passes, reached through
/// the loop from `suggest_improvements`, keep the improved score.
pub async fn check_complexity(state: &mut CodeReviewState, tools: &ToolRegistry) -> Result<StepOutcome> {
    if state.metadata.contains_key("checked") {
        debug!("check_complexity -> re-check, keeping quality_score={:.3}", state.quality_score);
        return Ok(StepOutcome::Continue);
    }

    let mut scores = Vec::with_capacity(state.functions.len());
    for function in &state.functions {
        let complexity: f64 = call_tool(tools, "complexity_estimator", function).await?;
        scores.push(1.0 - complexity);
    }
    state.quality_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    state.metadata.insert("checked".to_string(), Value::Bool(true));

    debug!("check_complexity -> quality_score={:.3}", state.quality_score);
    Ok(StepOutcome::Continue)
}

pub async fn detect_issues(state: &mut CodeReviewState, tools: &ToolRegistry) -> Result<StepOutcome> {
    let mut all_issues = Vec::new();
    for function in &state.functions {
        let issues: Vec<Issue> = call_tool(tools, "issue_detector", function).await?;
        all_issues.extend(issues.into_iter().map(|issue| Issue {
            function: Some(function.name.clone()),
            ..issue
        }));
    }

    debug!("detect_issues -> found {} issues", all_issues.len());
    state
        .metadata
        .insert("issues_found".to_string(), Value::from(all_issues.len()));
    state.issues = all_issues;
    Ok(StepOutcome::Continue)
}

pub async fn suggest_improvements(state: &mut CodeReviewState, tools: &ToolRegistry) -> Result<StepOutcome> {
    let suggestions: Vec<String> = call_tool(tools, "suggestion_generator", &state.issues).await?;
    state.suggestions.extend(suggestions);

    let weight = if state.issues.is_empty() { 0.5 } else { 1.0 };
    state.quality_score = (state.quality_score + 0.15 * weight).min(1.0);
    debug!("suggest_improvements -> new quality_score={:.3}", state.quality_score);

    if state.quality_score < QUALITY_THRESHOLD {
        debug!("Quality below threshold, looping back to 'check' node");
        return Ok(StepOutcome::goto("check"));
    }
    Ok(StepOutcome::Continue)
}

pub async fn finalize(state: &mut CodeReviewState, _tools: &ToolRegistry) -> Result<StepOutcome> {
    state.metadata.insert("finalized".to_string(), Value::Bool(true));
    Ok(StepOutcome::Continue)
}

pub fn default_tools() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register_tool(Arc::new(ComplexityEstimator));
    tools.register_tool(Arc::new(IssueDetector));
    tools.register_tool(Arc::new(SuggestionGenerator));
    tools
}

pub fn register_steps(engine: &mut GraphEngine<CodeReviewState>) {
    engine.register_fn("extract_functions", extract_functions);
    engine.register_async_fn("check_complexity", |state, tools| check_complexity(state, tools).boxed());
    engine.register_async_fn("detect_issues", |state, tools| detect_issues(state, tools).boxed());
    engine.register_async_fn("suggest_improvements", |state, tools| {
        suggest_improvements(state, tools).boxed()
    });
    engine.register_async_fn("finalize", |state, tools| finalize(state, tools).boxed());
}

/// Engine with the code review tools and steps registered.
pub fn build_engine() -> GraphEngine<CodeReviewState> {
    let mut engine = GraphEngine::new(default_tools());
    register_steps(&mut engine);
    engine
}

/// extract -> check -> detect -> suggest -> end
pub fn sample_graph() -> GraphSpec {
    GraphSpec {
        name: Some("code-review".to_string()),
        nodes: vec![
            NodeDef::new("extract", "extract_functions"),
            NodeDef::new("check", "check_complexity"),
            NodeDef::new("detect", "detect_issues"),
            NodeDef::new("suggest", "suggest_improvements"),
            NodeDef::new("end", "finalize"),
        ],
        edges: HashMap::from([
            ("extract".to_string(), "check".to_string()),
            ("check".to_string(), "detect".to_string()),
            ("detect".to_string(), "suggest".to_string()),
            ("suggest".to_string(), "end".to_string()),
        ]),
        start_node_id: "extract".to_string(),
    }
}
