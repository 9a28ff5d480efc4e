use crate::types::{EnvName, OwnerId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the running instance an environment belongs to.
///
/// Created once when a workspace starts and passed by reference to every
/// provisioner; workspace-unique resource names are derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeIdentity {
    pub workspace_id: WorkspaceId,
    pub env_name: EnvName,
    pub owner: OwnerId,
}

impl RuntimeIdentity {
    pub fn new(
        workspace_id: impl Into<WorkspaceId>,
        env_name: impl Into<EnvName>,
        owner: impl Into<OwnerId>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            env_name: env_name.into(),
            owner: owner.into(),
        }
    }
}

impl fmt::Display for RuntimeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.workspace_id, self.env_name, self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_all_parts() {
        let identity = RuntimeIdentity::new("ws1", "default", "alice");
        assert_eq!(identity.to_string(), "ws1:default:alice");
    }

    #[test]
    fn deserializes_from_plain_strings() {
        let identity: RuntimeIdentity = serde_json::from_str(
            r#"{"workspace_id":"ws1","env_name":"default","owner":"alice"}"#,
        )
        .unwrap();
        assert_eq!(identity.workspace_id, "ws1");
        assert_eq!(identity.owner, "alice");
    }
}
