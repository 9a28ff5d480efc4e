use super::Provisioner;
use crate::container::DockerEnvironment;
use berth_model::{InfrastructureError, RuntimeIdentity};
use tracing::debug;

/// Server reference of the workspace agent.
pub const WSAGENT_REFERENCE: &str = "wsagent";
pub const PROJECTS_ROOT_ENV: &str = "CHE_PROJECTS_ROOT";

/// Where a workspace's projects live on the host and in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectsBinding {
    pub host_path: String,
    pub container_path: String,
}

impl ProjectsBinding {
    pub fn volume(&self) -> String {
        format!("{}:{}", self.host_path, self.container_path)
    }
}

pub trait ProjectsBindingProvider: Send + Sync {
    /// `None` means the workspace has no projects volume.
    fn binding(&self, identity: &RuntimeIdentity) -> Option<ProjectsBinding>;
}

/// One directory per workspace under a host root.
#[derive(Debug, Clone)]
pub struct HostProjectsBindingProvider {
    root: String,
    container_path: String,
}

impl HostProjectsBindingProvider {
    pub fn new(root: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            container_path: container_path.into(),
        }
    }
}

impl ProjectsBindingProvider for HostProjectsBindingProvider {
    fn binding(&self, identity: &RuntimeIdentity) -> Option<ProjectsBinding> {
        let root = self.root.trim_end_matches('/');
        if root.is_empty() {
            return None;
        }
        Some(ProjectsBinding {
            host_path: format!("{root}/{}", identity.workspace_id),
            container_path: self.container_path.clone(),
        })
    }
}

/// Mounts the projects volume into the machine running the workspace agent.
pub struct ProjectsVolumeForWsAgentProvisioner<P> {
    provider: P,
}

impl<P: ProjectsBindingProvider> ProjectsVolumeForWsAgentProvisioner<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ProjectsBindingProvider> Provisioner for ProjectsVolumeForWsAgentProvisioner<P> {
    fn name(&self) -> &'static str {
        "projects-volume"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        let declaring: Vec<String> = env
            .machines()
            .iter()
            .filter(|(_, machine)| machine.declares_server(WSAGENT_REFERENCE))
            .map(|(name, _)| name.clone())
            .collect();
        let machine = match declaring.as_slice() {
            [] => return Ok(()),
            [machine] => machine,
            _ => {
                return Err(InfrastructureError::new(format!(
                    "Environment should contain exactly 1 machine with server '{WSAGENT_REFERENCE}', but contains {}: {}",
                    declaring.len(),
                    declaring.join(", ")
                )))
            }
        };

        let Some(binding) = self.provider.binding(identity) else {
            debug!(workspace = %identity.workspace_id, "no projects binding");
            return Ok(());
        };
        if let Some(container) = env.container_mut(machine) {
            container.add_volume(binding.volume());
            container
                .environment
                .insert(PROJECTS_ROOT_ENV.to_owned(), binding.container_path);
        }
        Ok(())
    }
}
