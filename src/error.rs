use thiserror::Error;

use crate::dispatch::DispatchError;

/// Everything that can abort a plugin invocation. All of these are fatal for
/// the invocation that hit them; none are retried by this layer.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("malformed plugin identifier: {0}")]
    MalformedIdentifier(String),

    #[error("not allowed to read plugin `{0}`")]
    Unauthorized(String),

    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// The stored definition declares no `PluginInput` node. A plugin must
    /// expose an explicit input contract even when it takes zero parameters,
    /// so this points at a broken definition, not at the caller.
    #[error("plugin `{0}` has no input node")]
    PluginHasNoInput(String),

    #[error("plugin `{0}` graph contains a cycle")]
    GraphCyclic(String),

    #[error("plugin nesting exceeded {0} levels")]
    NestingTooDeep(usize),

    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}
