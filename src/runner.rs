use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::dispatch::{
    DispatchResult, Dispatcher, InvocationContext, NodeResponse, RunMode, UsageRecord,
};
use crate::error::PluginError;
use crate::identity::{PluginSource, split_plugin_id};
use crate::node::FlowNodeKind;
use crate::permission::{Capability, PermissionGate};
use crate::plugin::PluginDefinition;
use crate::runtime::build_runtime_graph;
use crate::store::PluginStore;

/// Hard ceiling on plugin-in-plugin nesting. Mutual recursion between
/// stored definitions terminates here even when the store has no cycle
/// detection of its own.
pub const MAX_PLUGIN_DEPTH: usize = 20;

/// The parent node's view of one plugin invocation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PluginNodeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_logo: Option<String>,
    /// Sum of cost over every node executed inside the plugin.
    pub total_points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_output: Option<Map<String, Value>>,
    /// Internal node responses, present only for test-mode runs by the
    /// owning team. `Some(vec![])` means a trace was produced but the graph
    /// had no internal nodes; `None` means no trace was produced at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_detail: Option<Vec<NodeResponse>>,
}

/// Aggregated result of one plugin invocation, reshaped for the parent
/// node's result contract.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PluginRunResult {
    /// User-facing streamed content, passed through unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assistant_responses: Vec<Value>,
    pub node_response: PluginNodeResponse,
    /// One entry attributing the whole plugin run to the plugin by name.
    pub usages: Vec<UsageRecord>,
    /// The output payload as a tool response, `{}` when the plugin has no
    /// output node.
    pub tool_responses: Map<String, Value>,
    /// The output payload spread flat for downstream nodes to reference by
    /// field name.
    pub outputs: Map<String, Value>,
}

/// Runs stored plugins as nested workflows: authorize, load, build a
/// runtime graph, dispatch, fold the result back into the parent's shape.
pub struct PluginRunner {
    permissions: Arc<dyn PermissionGate>,
    store: Arc<dyn PluginStore>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl PluginRunner {
    pub fn new(
        permissions: Arc<dyn PermissionGate>,
        store: Arc<dyn PluginStore>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Arc<Self> {
        Arc::new(Self { permissions, store, dispatcher })
    }

    /// Execute the plugin behind `plugin_id` with the caller's parameters.
    ///
    /// Personal plugins require read capability for `ctx.tmb_id`; the
    /// permission check always runs before the store is read. The dispatch
    /// happens under `ctx.nested()`, so nested plugins observe the caller's
    /// identity and mode one level deeper.
    #[tracing::instrument(skip(self, params, ctx), fields(plugin_id = %plugin_id, run_id = %ctx.run_id, depth = ctx.depth))]
    pub async fn run_plugin(
        &self,
        plugin_id: &str,
        params: &Map<String, Value>,
        ctx: &InvocationContext,
    ) -> Result<PluginRunResult, PluginError> {
        if ctx.depth >= MAX_PLUGIN_DEPTH {
            return Err(PluginError::NestingTooDeep(MAX_PLUGIN_DEPTH));
        }

        let identity = split_plugin_id(plugin_id)?;
        if identity.source == PluginSource::Personal {
            self.permissions
                .authorize(&ctx.tmb_id, plugin_id, Capability::Read)
                .await
                .map_err(|e| PluginError::Unauthorized(e.to_string()))?;
        }

        let plugin = self
            .store
            .load(&identity.lookup_key)
            .await
            .ok_or_else(|| PluginError::PluginNotFound(identity.lookup_key.clone()))?;

        let graph = build_runtime_graph(&plugin, params)?;
        let dispatched = self.dispatcher.execute(graph, &ctx.nested()).await?;

        let result = aggregate(&plugin, ctx, dispatched);
        info!(
            plugin = %plugin.id,
            total_points = result.node_response.total_points,
            "plugin run finished"
        );
        Ok(result)
    }
}

/// Fold a dispatch result back into the parent node's shape: find the
/// output node's response, total up cost, and expose the internal trace to
/// the owning team in test mode.
fn aggregate(
    plugin: &PluginDefinition,
    ctx: &InvocationContext,
    dispatched: DispatchResult,
) -> PluginRunResult {
    let DispatchResult { mut node_responses, usages, assistant_responses } = dispatched;

    let output = node_responses
        .iter_mut()
        .find(|r| r.kind == FlowNodeKind::PluginOutput)
        .map(|r| {
            r.module_logo = plugin.avatar.clone();
            r.clone()
        });
    let plugin_output = output.and_then(|o| o.plugin_output);

    // per-node detail feeds the parent's cost total...
    let total_points = node_responses
        .iter()
        .map(|r| {
            if r.total_points < 0.0 {
                warn!(node = %r.node_id, points = r.total_points, "negative node cost");
            }
            r.total_points
        })
        .sum();
    // ...while the usage ledger totals separately into one entry naming the
    // plugin as its own unit of work
    let usage_points = usages.iter().map(|u| u.total_points).sum();

    let plugin_detail = (ctx.mode == RunMode::Test && plugin.team_id == ctx.team_id).then(|| {
        node_responses
            .iter()
            .filter(|r| r.kind != FlowNodeKind::PluginOutput)
            .cloned()
            .collect::<Vec<_>>()
    });

    let outputs = plugin_output.clone().unwrap_or_default();

    PluginRunResult {
        assistant_responses,
        node_response: PluginNodeResponse {
            module_logo: plugin.avatar.clone(),
            total_points,
            plugin_output,
            plugin_detail,
        },
        usages: vec![UsageRecord {
            module_name: plugin.name.clone(),
            total_points: usage_points,
            model: plugin.name.clone(),
            tokens: 0,
        }],
        tool_responses: outputs.clone(),
        outputs,
    }
}
