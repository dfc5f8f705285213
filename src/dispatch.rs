use async_trait::async_trait;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::node::FlowNodeKind;
use crate::runtime::RuntimeGraph;

/// How an invocation runs. `Test` unlocks the internal node trace for the
/// owning team; everything else behaves identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Normal,
    Test,
}

/// Identity and mode for one invocation, passed explicitly on every call so
/// nested plugin runs observe the same identity as their parent. `variables`
/// carries whatever pass-through fields the parent's own invocation held.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvocationContext {
    /// Correlation id shared by a workflow run and every plugin nested
    /// under it.
    pub run_id: String,
    pub team_id: String,
    /// Team-membership id of the calling principal.
    pub tmb_id: String,
    pub mode: RunMode,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
    /// Plugin nesting depth, starting at 0 for a top-level workflow.
    #[serde(default)]
    pub depth: usize,
}

impl InvocationContext {
    pub fn new(team_id: impl Into<String>, tmb_id: impl Into<String>, mode: RunMode) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            team_id: team_id.into(),
            tmb_id: tmb_id.into(),
            mode,
            variables: Map::new(),
            depth: 0,
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// The context a nested dispatch runs under: same identity, same mode,
    /// one level deeper.
    pub fn nested(&self) -> Self {
        let mut ctx = self.clone();
        ctx.depth += 1;
        ctx
    }
}

/// What the dispatcher reports back for one executed node.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NodeResponse {
    pub node_id: String,
    pub kind: FlowNodeKind,
    pub name: String,
    /// Cost charged for this node. Non-negative by contract.
    #[serde(default)]
    pub total_points: f64,
    /// Present only on `PluginOutput` nodes: the value the plugin returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_output: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_logo: Option<String>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl NodeResponse {
    pub fn new(node_id: impl Into<String>, kind: FlowNodeKind, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            node_id: node_id.into(),
            kind,
            name: name.into(),
            total_points: 0.0,
            plugin_output: None,
            module_logo: None,
            started: now,
            finished: now,
        }
    }

    pub fn with_points(mut self, points: f64) -> Self {
        self.total_points = points;
        self
    }

    pub fn with_output(mut self, output: Map<String, Value>) -> Self {
        self.plugin_output = Some(output);
        self
    }
}

/// One accounting entry attributing cost to a named unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UsageRecord {
    pub module_name: String,
    pub total_points: f64,
    pub model: String,
    pub tokens: u64,
}

/// Everything a completed dispatch yields: per-node responses in execution
/// order, the usage ledger, and any assistant-visible partial responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DispatchResult {
    pub node_responses: Vec<NodeResponse>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<UsageRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assistant_responses: Vec<Value>,
}

/// Failure of a whole graph run. There is no partial success: the first
/// unrecovered node failure aborts the invocation.
#[derive(Debug, Clone, Error, Serialize, Deserialize, JsonSchema)]
pub enum DispatchError {
    #[error("node `{node_id}` failed: {message}")]
    NodeFailed { node_id: String, message: String },

    #[error("graph run timed out after {0}s")]
    Timeout(u64),

    #[error("dispatch error: {0}")]
    Internal(String),
}

/// The generic graph-execution engine this layer delegates to. It owns
/// scheduling, per-node retries, timeouts and cancellation; when it meets a
/// nested plugin node it calls back into
/// [`PluginRunner::run_plugin`](crate::runner::PluginRunner::run_plugin),
/// which is how plugins recurse.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn execute(
        &self,
        graph: RuntimeGraph,
        ctx: &InvocationContext,
    ) -> Result<DispatchResult, DispatchError>;
}
