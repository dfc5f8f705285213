use std::collections::HashMap;

use petgraph::{Direction::Incoming, graph::NodeIndex, prelude::StableDiGraph};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::PluginError;
use crate::node::{EdgeStatus, NodeInput, RuntimeEdge, RuntimeNode, StoredEdge, StoredNode};
use crate::plugin::PluginDefinition;

/// One-shot executable instance of a plugin graph: runtime nodes with bound
/// inputs, freshly initialized edges, and the resolved entry node ids.
/// Built, dispatched, discarded.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeGraph {
    pub nodes: Vec<RuntimeNode>,
    pub edges: Vec<RuntimeEdge>,
    pub entry_ids: Vec<String>,
}

/// Turn a stored definition plus caller parameters into a [`RuntimeGraph`].
///
/// Fails with [`PluginError::PluginHasNoInput`] when the definition declares
/// no `PluginInput` node and with [`PluginError::GraphCyclic`] when its edge
/// set is cyclic. Caller parameters are overlaid onto the input node's
/// declared inputs; keys the node does not declare are ignored.
pub fn build_runtime_graph(
    plugin: &PluginDefinition,
    params: &Map<String, Value>,
) -> Result<RuntimeGraph, PluginError> {
    let input_node = plugin
        .input_node()
        .ok_or_else(|| PluginError::PluginHasNoInput(plugin.id.clone()))?;
    let input_id = input_node.id.clone();

    let entry_ids = default_entry_ids(plugin)?;

    let nodes = plugin
        .nodes
        .iter()
        .map(|node| {
            let inputs = if node.id == input_id {
                overlay_inputs(&node.inputs, params)
            } else {
                node.inputs.clone()
            };
            RuntimeNode {
                id: node.id.clone(),
                kind: node.kind,
                name: node.name.clone(),
                // the parent node reports progress, nested runs stay silent
                show_status: false,
                inputs,
            }
        })
        .collect();

    let edges = init_edge_status(&plugin.edges);

    trace!(plugin = %plugin.id, entries = entry_ids.len(), "runtime graph built");
    Ok(RuntimeGraph { nodes, edges, entry_ids })
}

/// Entry nodes of a definition: nodes of an entry kind or explicitly marked
/// as entries, plus every node without an inbound edge. Also rejects cyclic
/// edge sets, since the dispatcher expects a DAG.
pub fn default_entry_ids(plugin: &PluginDefinition) -> Result<Vec<String>, PluginError> {
    let mut graph: StableDiGraph<&StoredNode, ()> = StableDiGraph::new();
    let mut index_of: HashMap<&str, NodeIndex> = HashMap::new();

    for node in &plugin.nodes {
        let idx = graph.add_node(node);
        index_of.insert(node.id.as_str(), idx);
    }
    // edges pointing at unknown node ids carry no activation dependency
    for edge in &plugin.edges {
        if let (Some(&from), Some(&to)) = (
            index_of.get(edge.source.as_str()),
            index_of.get(edge.target.as_str()),
        ) {
            graph.add_edge(from, to, ());
        }
    }

    if petgraph::algo::is_cyclic_directed(&graph) {
        return Err(PluginError::GraphCyclic(plugin.id.clone()));
    }

    let mut entries = Vec::new();
    for node in &plugin.nodes {
        let idx = index_of[node.id.as_str()];
        let has_inbound = graph.neighbors_directed(idx, Incoming).next().is_some();
        if node.kind.is_entry() || node.is_entry || !has_inbound {
            entries.push(node.id.clone());
        }
    }
    Ok(entries)
}

/// Reset every stored edge to `Waiting`. Nothing carries over from a
/// previous invocation.
pub fn init_edge_status(edges: &[StoredEdge]) -> Vec<RuntimeEdge> {
    edges
        .iter()
        .map(|edge| RuntimeEdge {
            source: edge.source.clone(),
            target: edge.target.clone(),
            status: EdgeStatus::Waiting,
        })
        .collect()
}

/// Overlay caller parameters onto the inputs a node declares. Declared keys
/// the caller supplied are substituted, the rest keep the plugin's own
/// defaults. Caller keys with no declared counterpart are dropped, so a
/// caller may pass a superset of fields.
pub fn overlay_inputs(declared: &[NodeInput], params: &Map<String, Value>) -> Vec<NodeInput> {
    declared
        .iter()
        .map(|input| match params.get(&input.key) {
            Some(value) => NodeInput::new(input.key.clone(), value.clone()),
            None => input.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FlowNodeKind;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn demo_plugin() -> PluginDefinition {
        PluginDefinition::new("p1", "team-a", "demo")
            .with_node(
                StoredNode::new("in1", FlowNodeKind::PluginInput, "input")
                    .with_input("query", json!(""))
                    .with_input("limit", json!(10)),
            )
            .with_node(StoredNode::new("t1", FlowNodeKind::Tool, "search"))
            .with_node(StoredNode::new("out1", FlowNodeKind::PluginOutput, "output"))
            .with_edge(StoredEdge::new("in1", "t1"))
            .with_edge(StoredEdge::new("t1", "out1"))
    }

    #[test]
    fn overlay_substitutes_declared_keys_only() {
        let declared = vec![
            NodeInput::new("query", json!("")),
            NodeInput::new("limit", json!(10)),
        ];
        let bound = overlay_inputs(&declared, &params(&[("query", json!("x")), ("extra", json!(1))]));
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].value, json!("x"));
        assert_eq!(bound[1].value, json!(10));
        assert!(!bound.iter().any(|i| i.key == "extra"));
    }

    #[test]
    fn overlay_is_idempotent_on_undeclared_keys() {
        let declared = vec![NodeInput::new("query", json!("default"))];
        let without = overlay_inputs(&declared, &params(&[]));
        let with_extras = overlay_inputs(&declared, &params(&[("noise", json!(true))]));
        assert_eq!(without, with_extras);
    }

    #[test]
    fn builds_graph_with_bound_input_and_quiet_nodes() {
        let graph =
            build_runtime_graph(&demo_plugin(), &params(&[("query", json!("x"))])).unwrap();

        assert!(graph.nodes.iter().all(|n| !n.show_status));
        let input = graph.nodes.iter().find(|n| n.id == "in1").unwrap();
        assert_eq!(input.inputs[0].value, json!("x"));
        assert_eq!(input.inputs[1].value, json!(10));
    }

    #[test]
    fn every_edge_starts_waiting() {
        let graph = build_runtime_graph(&demo_plugin(), &Map::new()).unwrap();
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edges.iter().all(|e| e.status == EdgeStatus::Waiting));
    }

    #[test]
    fn entry_ids_cover_entry_kinds_and_unreferenced_nodes() {
        let plugin = demo_plugin()
            .with_node(StoredNode::new("lone", FlowNodeKind::Tool, "isolated"));
        let graph = build_runtime_graph(&plugin, &Map::new()).unwrap();
        assert!(graph.entry_ids.contains(&"in1".to_string()));
        assert!(graph.entry_ids.contains(&"lone".to_string()));
        assert!(!graph.entry_ids.contains(&"t1".to_string()));
        assert!(!graph.entry_ids.contains(&"out1".to_string()));
    }

    #[test]
    fn explicit_entry_flag_wins_over_inbound_edges() {
        let plugin = demo_plugin()
            .with_node(StoredNode::new("t2", FlowNodeKind::Tool, "boot").as_entry())
            .with_edge(StoredEdge::new("in1", "t2"));
        let ids = default_entry_ids(&plugin).unwrap();
        assert!(ids.contains(&"t2".to_string()));
    }

    #[test]
    fn missing_input_node_fails() {
        let plugin = PluginDefinition::new("p1", "team-a", "demo")
            .with_node(StoredNode::new("t1", FlowNodeKind::Tool, "tool"));
        let err = build_runtime_graph(&plugin, &Map::new()).unwrap_err();
        assert!(matches!(err, PluginError::PluginHasNoInput(id) if id == "p1"));
    }

    #[test]
    fn cyclic_edges_fail() {
        let plugin = PluginDefinition::new("p1", "team-a", "demo")
            .with_node(StoredNode::new("in1", FlowNodeKind::PluginInput, "input"))
            .with_node(StoredNode::new("a", FlowNodeKind::Tool, "a"))
            .with_node(StoredNode::new("b", FlowNodeKind::Tool, "b"))
            .with_edge(StoredEdge::new("a", "b"))
            .with_edge(StoredEdge::new("b", "a"));
        let err = build_runtime_graph(&plugin, &Map::new()).unwrap_err();
        assert!(matches!(err, PluginError::GraphCyclic(_)));
    }

    #[test]
    fn edges_to_unknown_nodes_are_ignored() {
        let plugin = PluginDefinition::new("p1", "team-a", "demo")
            .with_node(StoredNode::new("in1", FlowNodeKind::PluginInput, "input"))
            .with_edge(StoredEdge::new("in1", "ghost"));
        let graph = build_runtime_graph(&plugin, &Map::new()).unwrap();
        assert_eq!(graph.entry_ids, vec!["in1".to_string()]);
    }
}
