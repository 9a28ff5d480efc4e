use super::Provisioner;
use crate::container::DockerEnvironment;
use berth_model::{InfrastructureError, RuntimeIdentity};

/// Workspace-unique container name, reduced to `[a-zA-Z0-9_.-]`.
pub fn container_name(identity: &RuntimeIdentity, machine: &str) -> String {
    sanitize(&format!(
        "{}_{machine}_{}",
        identity.workspace_id, identity.owner
    ))
}

fn sanitize(raw: &str) -> String {
    let name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    // Docker names must start with an alphanumeric character.
    if name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        name
    } else {
        format!("x{name}")
    }
}

pub struct ContainerNamesProvisioner;

impl Provisioner for ContainerNamesProvisioner {
    fn name(&self) -> &'static str {
        "container-names"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for (machine, container) in env.containers_mut() {
            container.container_name = Some(container_name(identity, machine));
        }
        Ok(())
    }
}

/// Puts every container on the `<workspace>_<env>` network.
pub struct WorkspaceNetworkProvisioner;

impl Provisioner for WorkspaceNetworkProvisioner {
    fn name(&self) -> &'static str {
        "workspace-network"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        let network = sanitize(&format!("{}_{}", identity.workspace_id, identity.env_name));
        for (_, container) in env.containers_mut() {
            if !container.networks.contains(&network) {
                container.networks.push(network.clone());
            }
        }
        env.set_network(network);
        Ok(())
    }
}
