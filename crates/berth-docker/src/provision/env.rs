use super::Provisioner;
use crate::container::DockerEnvironment;
use berth_model::{InfrastructureError, RuntimeIdentity};

pub const WORKSPACE_ID_ENV: &str = "CHE_WORKSPACE_ID";
pub const WORKSPACE_OWNER_ENV: &str = "CHE_WORKSPACE_OWNER";
pub const MACHINE_NAME_ENV: &str = "CHE_MACHINE_NAME";

/// Copies machine `env` into the container environment.
pub struct EnvVarsConverter;

impl Provisioner for EnvVarsConverter {
    fn name(&self) -> &'static str {
        "env-vars"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for (_, machine, container) in env.machines_and_containers_mut() {
            container
                .environment
                .extend(machine.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Ok(())
    }
}

/// Tells each container which workspace and machine it belongs to.
pub struct RuntimeIdentityEnvVarsProvisioner;

impl Provisioner for RuntimeIdentityEnvVarsProvisioner {
    fn name(&self) -> &'static str {
        "identity-env-vars"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for (machine, container) in env.containers_mut() {
            container.environment.insert(
                WORKSPACE_ID_ENV.to_owned(),
                identity.workspace_id.to_string(),
            );
            container
                .environment
                .insert(WORKSPACE_OWNER_ENV.to_owned(), identity.owner.to_string());
            container
                .environment
                .insert(MACHINE_NAME_ENV.to_owned(), machine.clone());
        }
        Ok(())
    }
}
