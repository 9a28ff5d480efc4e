//! Environment provisioners.
//!
//! A provisioner mutates a `DockerEnvironment` in place to add
//! infrastructure-specific concerns. `ProvisionerChain::from_config` is the
//! single place that decides which provisioners run and in what order.

mod env;
mod extra_volumes;
mod installer;
mod machine_labels;
mod memory;
mod naming;
mod servers;
mod volumes;
mod wsagent;

pub use env::{EnvVarsConverter, RuntimeIdentityEnvVarsProvisioner};
pub use extra_volumes::ExtraVolumesProvisioner;
pub use installer::InstallerConfigProvisioner;
pub use machine_labels::MachineLabelsProvisioner;
pub use memory::MemoryAttributeConverter;
pub use naming::{container_name, ContainerNamesProvisioner, WorkspaceNetworkProvisioner};
pub use servers::ServersConverter;
pub use volumes::VolumesConverter;
pub use wsagent::{
    HostProjectsBindingProvider, ProjectsBinding, ProjectsBindingProvider,
    ProjectsVolumeForWsAgentProvisioner, PROJECTS_ROOT_ENV, WSAGENT_REFERENCE,
};

use crate::config::ProvisioningConfig;
use crate::container::DockerEnvironment;
use berth_model::{InfrastructureError, RuntimeIdentity};
use tracing::debug;

pub trait Provisioner: Send + Sync {
    fn name(&self) -> &'static str;

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError>;
}

/// Ordered list of provisioners run one after another.
#[derive(Default)]
pub struct ProvisionerChain {
    steps: Vec<Box<dyn Provisioner>>,
}

impl ProvisionerChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, step: impl Provisioner + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn push(&mut self, step: Box<dyn Provisioner>) {
        self.steps.push(step);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order. The first error stops the chain and is
    /// returned unchanged.
    pub fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for step in &self.steps {
            debug!(provisioner = step.name(), workspace = %identity.workspace_id, "provisioning");
            step.provision(env, identity)?;
        }
        Ok(())
    }

    /// The standard chain.
    ///
    /// Names and network come first so later steps see final container
    /// names; volumes come last so the projects volume is appended after
    /// machine-declared ones.
    pub fn from_config(config: &ProvisioningConfig) -> Self {
        let mut chain = Self::new()
            .with(ContainerNamesProvisioner)
            .with(WorkspaceNetworkProvisioner)
            .with(MachineLabelsProvisioner)
            .with(ServersConverter)
            .with(InstallerConfigProvisioner)
            .with(EnvVarsConverter)
            .with(RuntimeIdentityEnvVarsProvisioner)
            .with(MemoryAttributeConverter::new(
                config.default_memory_limit_bytes(),
            ))
            .with(VolumesConverter)
            .with(ExtraVolumesProvisioner::new(config.extra_volumes.as_deref()));
        if let Some(root) = &config.projects_root {
            chain.push(Box::new(ProjectsVolumeForWsAgentProvisioner::new(
                HostProjectsBindingProvider::new(root, &config.projects_container_path),
            )));
        }
        chain
    }
}
