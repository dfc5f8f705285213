//! Plugin-as-subworkflow execution.
//!
//! A plugin is a stored node graph exposed as a callable unit. Invoking one
//! inside a parent workflow means resolving and authorizing its identifier,
//! loading the stored definition, materializing a one-shot runtime graph
//! with the caller's parameters bound onto the plugin's input node, handing
//! that graph to the generic [`dispatch::Dispatcher`], and folding the
//! dispatch result back into the parent node's result shape. Plugins nest:
//! the dispatcher calls back into [`runner::PluginRunner`] when it meets a
//! plugin node, bounded by [`runner::MAX_PLUGIN_DEPTH`].

pub mod dispatch;
pub mod error;
pub mod identity;
pub mod node;
pub mod permission;
pub mod plugin;
pub mod runner;
pub mod runtime;
pub mod store;

pub use dispatch::{
    DispatchError, DispatchResult, Dispatcher, InvocationContext, NodeResponse, RunMode,
    UsageRecord,
};
pub use error::PluginError;
pub use identity::{PluginIdentity, PluginSource, split_plugin_id};
pub use node::{EdgeStatus, FlowNodeKind, NodeInput, RuntimeEdge, RuntimeNode, StoredEdge, StoredNode};
pub use permission::{AllowAllPermissions, Capability, InMemoryPermissions, PermissionGate};
pub use plugin::PluginDefinition;
pub use runner::{MAX_PLUGIN_DEPTH, PluginNodeResponse, PluginRunResult, PluginRunner};
pub use runtime::{RuntimeGraph, build_runtime_graph};
pub use store::{InMemoryPluginStore, PluginStore};
