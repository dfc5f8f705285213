use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::node::{FlowNodeKind, StoredEdge, StoredNode};

/// Immutable stored snapshot of a plugin: its node graph plus the metadata
/// the aggregator needs (owning team, display name, avatar). Loaded fresh
/// per invocation; this layer never caches definitions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PluginDefinition {
    pub id: String,
    pub team_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub nodes: Vec<StoredNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<StoredEdge>,
}

impl PluginDefinition {
    pub fn new(
        id: impl Into<String>,
        team_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            team_id: team_id.into(),
            name: name.into(),
            avatar: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_node(mut self, node: StoredNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: StoredEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// The node caller parameters bind onto. A well-formed definition has at
    /// most one; the first match wins.
    pub fn input_node(&self) -> Option<&StoredNode> {
        self.nodes.iter().find(|n| n.kind == FlowNodeKind::PluginInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_node_lookup() {
        let plugin = PluginDefinition::new("p1", "team-a", "demo")
            .with_node(StoredNode::new("t1", FlowNodeKind::Tool, "tool"))
            .with_node(
                StoredNode::new("in1", FlowNodeKind::PluginInput, "input")
                    .with_input("query", json!("")),
            );
        assert_eq!(plugin.input_node().unwrap().id, "in1");
    }

    #[test]
    fn no_input_node_is_none() {
        let plugin = PluginDefinition::new("p1", "team-a", "demo")
            .with_node(StoredNode::new("t1", FlowNodeKind::Tool, "tool"));
        assert!(plugin.input_node().is_none());
    }

    #[test]
    fn definitions_round_trip_as_json() {
        let plugin = PluginDefinition::new("p1", "team-a", "demo")
            .with_avatar("/icons/demo.svg")
            .with_node(StoredNode::new("in1", FlowNodeKind::PluginInput, "input"))
            .with_node(StoredNode::new("out1", FlowNodeKind::PluginOutput, "output"))
            .with_edge(StoredEdge::new("in1", "out1"));
        let json = serde_json::to_string(&plugin).unwrap();
        let back: PluginDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes.len(), 2);
        assert_eq!(back.edges[0].target, "out1");
        assert_eq!(back.avatar.as_deref(), Some("/icons/demo.svg"));
    }
}
