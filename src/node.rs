use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node kinds this layer can observe. Only `PluginInput` and `PluginOutput`
/// carry semantics here; the rest pass through to the dispatcher untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum FlowNodeKind {
    PluginInput,
    PluginOutput,
    Tool,
    Agent,
    Answer,
}

impl FlowNodeKind {
    /// Kinds that start a graph even when edges point at them.
    pub fn is_entry(&self) -> bool {
        matches!(self, FlowNodeKind::PluginInput)
    }
}

/// One declared input on a node: a key and its current (default) value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NodeInput {
    pub key: String,
    pub value: Value,
}

impl NodeInput {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self { key: key.into(), value }
    }
}

/// A node as persisted inside a [`PluginDefinition`](crate::plugin::PluginDefinition).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoredNode {
    pub id: String,
    pub kind: FlowNodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<NodeInput>,
    /// Explicitly marked entry point, independent of the edge set.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_entry: bool,
}

impl StoredNode {
    pub fn new(id: impl Into<String>, kind: FlowNodeKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            inputs: Vec::new(),
            is_entry: false,
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inputs.push(NodeInput::new(key, value));
        self
    }

    pub fn as_entry(mut self) -> Self {
        self.is_entry = true;
        self
    }
}

/// Directed activation dependency between two stored nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoredEdge {
    pub source: String,
    pub target: String,
}

impl StoredEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }
}

/// Activation state of a runtime edge. Every invocation starts from
/// `Waiting`; no status survives across invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    Waiting,
    Active,
    Skipped,
}

/// One-shot projection of a [`StoredNode`] for a single invocation. Inputs
/// are copied in, never aliased, and `show_status` is forced off so nested
/// runs do not leak progress chrome to the end user.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeNode {
    pub id: String,
    pub kind: FlowNodeKind,
    pub name: String,
    pub show_status: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<NodeInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeEdge {
    pub source: String,
    pub target: String,
    pub status: EdgeStatus,
}
