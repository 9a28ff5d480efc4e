use serde::{Deserialize, Serialize};

/// `[provisioning]` section of the runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// `host:container` pairs separated by `;`, mounted into every container.
    pub extra_volumes: Option<String>,
    /// Memory limit for machines without `memoryLimitBytes`.
    pub default_memory_limit_mb: u64,
    /// Host directory holding workspace projects. Unset disables the
    /// projects volume.
    pub projects_root: Option<String>,
    pub projects_container_path: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            extra_volumes: None,
            default_memory_limit_mb: 2048,
            projects_root: None,
            projects_container_path: "/projects".to_owned(),
        }
    }
}

impl ProvisioningConfig {
    pub fn default_memory_limit_bytes(&self) -> u64 {
        self.default_memory_limit_mb.saturating_mul(1024 * 1024)
    }
}
