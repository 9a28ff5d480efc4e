use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Machine attribute holding the memory limit in bytes.
pub const MEMORY_LIMIT_ATTRIBUTE: &str = "memoryLimitBytes";
/// Machine attribute holding the memory request in bytes.
pub const MEMORY_REQUEST_ATTRIBUTE: &str = "memoryRequestBytes";
/// Installer property listing environment variables as `k1=v1,k2=v2`.
pub const ENVIRONMENT_PROPERTY: &str = "environment";

/// A server a machine or installer exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port with optional transport, e.g. `4401/tcp` or `1111/udp`.
    pub port: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ServerConfig {
    pub fn new(port: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            protocol: protocol.into(),
            path: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Logical volume a machine wants mounted at `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub path: String,
}

/// Startup unit that configures a machine once its container runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallerConfig {
    pub id: String,
    #[serde(default)]
    pub script: String,
    /// Names of installers that must run before this one, in order.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl InstallerConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InternalMachineConfig {
    #[serde(default)]
    pub installers: Vec<InstallerConfig>,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub volumes: BTreeMap<String, VolumeConfig>,
}

impl InternalMachineConfig {
    /// Whether the machine itself declares the server reference.
    ///
    /// Installer-declared servers are not considered.
    pub fn declares_server(&self, reference: &str) -> bool {
        self.servers.contains_key(reference)
    }

    /// Parsed memory limit attribute, `None` when absent or not a number.
    pub fn memory_limit(&self) -> Option<u64> {
        self.attributes
            .get(MEMORY_LIMIT_ATTRIBUTE)
            .and_then(|v| v.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_server_ignores_installer_servers() {
        let mut installer = InstallerConfig::new("ws-agent");
        installer
            .servers
            .insert("wsagent".to_owned(), ServerConfig::new("4401/tcp", "http"));
        let machine = InternalMachineConfig {
            installers: vec![installer],
            ..InternalMachineConfig::default()
        };
        assert!(!machine.declares_server("wsagent"));
    }

    #[test]
    fn memory_limit_attribute_parses() {
        let mut machine = InternalMachineConfig::default();
        machine
            .attributes
            .insert(MEMORY_LIMIT_ATTRIBUTE.to_owned(), "2147483648".to_owned());
        assert_eq!(machine.memory_limit(), Some(2_147_483_648));

        machine
            .attributes
            .insert(MEMORY_LIMIT_ATTRIBUTE.to_owned(), "lots".to_owned());
        assert_eq!(machine.memory_limit(), None);
    }

    #[test]
    fn machine_config_deserializes_with_defaults() {
        let machine: InternalMachineConfig = serde_json::from_str(
            r#"{"servers":{"ide":{"port":"8080/tcp","protocol":"http","path":"/ide"}}}"#,
        )
        .unwrap();
        assert!(machine.installers.is_empty());
        assert_eq!(machine.servers["ide"].path.as_deref(), Some("/ide"));
    }
}
