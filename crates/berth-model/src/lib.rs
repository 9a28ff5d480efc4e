//! Infrastructure-agnostic environment model for Berth workspaces.
//!
//! This crate defines the inputs of the provisioning pipeline: recipes
//! (`InternalRecipe`), machine configurations with their installers and
//! servers, the runtime identity of a workspace start, and the normalized
//! `Environment` produced by the `EnvironmentFactory`. It also hosts the
//! compose document model, workspace-scoped volume naming, and the error
//! taxonomy shared by every other crate.

pub mod compose;
pub mod environment;
pub mod factory;
pub mod identity;
pub mod machine;
pub mod recipe;
pub mod server;
pub mod types;
pub mod volumes;

pub use compose::{parse_compose, ComposeBuild, ComposeRecipe, ComposeService};
pub use environment::{
    ComposeEnvironment, DockerImageEnvironment, DockerfileEnvironment, Environment,
    InternalEnvironment, Warning,
};
pub use factory::EnvironmentFactory;
pub use identity::RuntimeIdentity;
pub use machine::{
    InstallerConfig, InternalMachineConfig, ServerConfig, VolumeConfig, ENVIRONMENT_PROPERTY,
    MEMORY_LIMIT_ATTRIBUTE, MEMORY_REQUEST_ATTRIBUTE,
};
pub use recipe::{InternalRecipe, RecipeKind};
pub use server::{MachineStatus, Server, ServerStatus};
pub use types::{EnvName, OwnerId, WorkspaceId};

use thiserror::Error;

/// Malformed or unsupported input. Caller error, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Backend or environment-level failure. The orchestrator may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InfrastructureError(String);

impl InfrastructureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_message_verbatim() {
        let e = ValidationError::new("Recipe content must not be empty");
        assert_eq!(e.to_string(), "Recipe content must not be empty");

        let wrapped = EnvironmentError::from(InfrastructureError::new("network down"));
        assert_eq!(wrapped.to_string(), "network down");
    }
}
