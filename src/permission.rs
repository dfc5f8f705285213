use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Capability levels on an application object, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Write,
    Manage,
}

impl Capability {
    fn rank(&self) -> u8 {
        match self {
            Capability::Read => 0,
            Capability::Write => 1,
            Capability::Manage => 2,
        }
    }

    /// Whether a grant of `self` satisfies a requirement of `required`.
    pub fn covers(&self, required: Capability) -> bool {
        self.rank() >= required.rank()
    }
}

#[derive(Debug, Clone, Error)]
#[error("member `{tmb_id}` lacks {cap:?} on `{object_id}`")]
pub struct PermissionError {
    pub tmb_id: String,
    pub object_id: String,
    pub cap: Capability,
}

/// Identity/permission service seam. `authorize` either passes or fails;
/// it returns nothing on success.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn authorize(
        &self,
        tmb_id: &str,
        object_id: &str,
        cap: Capability,
    ) -> Result<(), PermissionError>;
}

/// Gate that admits everyone. For deployments without per-object ACLs and
/// for wiring up tests.
#[derive(Debug, Clone, Default)]
pub struct AllowAllPermissions;

#[async_trait]
impl PermissionGate for AllowAllPermissions {
    async fn authorize(
        &self,
        _tmb_id: &str,
        _object_id: &str,
        _cap: Capability,
    ) -> Result<(), PermissionError> {
        Ok(())
    }
}

/// In-memory grant table keyed by `(member, object)`.
#[derive(Debug, Default)]
pub struct InMemoryPermissions {
    grants: DashMap<(String, String), Capability>,
}

impl InMemoryPermissions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { grants: DashMap::new() })
    }

    pub fn grant(&self, tmb_id: impl Into<String>, object_id: impl Into<String>, cap: Capability) {
        self.grants.insert((tmb_id.into(), object_id.into()), cap);
    }

    pub fn revoke(&self, tmb_id: &str, object_id: &str) {
        self.grants.remove(&(tmb_id.to_string(), object_id.to_string()));
    }
}

#[async_trait]
impl PermissionGate for InMemoryPermissions {
    async fn authorize(
        &self,
        tmb_id: &str,
        object_id: &str,
        cap: Capability,
    ) -> Result<(), PermissionError> {
        let held = self
            .grants
            .get(&(tmb_id.to_string(), object_id.to_string()))
            .map(|entry| *entry.value());
        match held {
            Some(held) if held.covers(cap) => {
                debug!(tmb_id, object_id, "authorized");
                Ok(())
            }
            _ => Err(PermissionError {
                tmb_id: tmb_id.to_string(),
                object_id: object_id.to_string(),
                cap,
            }),
        }
    }
}
