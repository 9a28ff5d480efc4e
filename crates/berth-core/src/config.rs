use crate::RuntimeError;
use berth_docker::ProvisioningConfig;
use berth_model::EnvironmentFactory;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `[factory]` section. Zero disables a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub default_memory_limit_bytes: u64,
    pub default_memory_request_bytes: u64,
}

impl FactoryConfig {
    pub fn factory(&self) -> EnvironmentFactory {
        EnvironmentFactory::new(
            self.default_memory_limit_bytes,
            self.default_memory_request_bytes,
        )
    }
}

/// Upper bound for `readiness.timeout_secs`: one day.
pub const MAX_READINESS_TIMEOUT_SECS: u64 = 86_400;

/// `[readiness]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub period_ms: u64,
    pub timeout_secs: u64,
    /// Host name used in server URLs of started machines.
    pub server_host: String,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            timeout_secs: 180,
            server_host: "127.0.0.1".to_owned(),
        }
    }
}

impl ReadinessConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub factory: FactoryConfig,
    pub provisioning: ProvisioningConfig,
    pub readiness: ReadinessConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, RuntimeError> {
        let config: Self =
            toml::from_str(input).map_err(|e| RuntimeError::Config(e.to_string()))?;
        if config.readiness.period_ms == 0 {
            return Err(RuntimeError::Config(
                "readiness.period_ms must be greater than zero".to_owned(),
            ));
        }
        if config.readiness.timeout_secs > MAX_READINESS_TIMEOUT_SECS {
            return Err(RuntimeError::Config(format!(
                "readiness.timeout_secs must not exceed {MAX_READINESS_TIMEOUT_SECS}"
            )));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `~/.config/berth/config.toml`, or defaults when it does not exist.
    pub fn load_default() -> Result<Self, RuntimeError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/berth/config.toml"))
}
