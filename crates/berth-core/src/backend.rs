use berth_docker::DockerContainerConfig;
use berth_model::{InfrastructureError, Server};
use serde::Serialize;
use std::collections::BTreeMap;

/// A container started for a machine, with the servers it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedMachine {
    pub container_id: String,
    pub servers: BTreeMap<String, Server>,
}

/// The collaborator that actually runs containers.
pub trait ContainerBackend: Send + Sync {
    fn name(&self) -> &str;

    fn create_network(&self, name: &str) -> Result<(), InfrastructureError>;

    fn start_container(
        &self,
        machine: &str,
        config: &DockerContainerConfig,
    ) -> Result<StartedMachine, InfrastructureError>;

    fn stop_container(&self, container_id: &str) -> Result<(), InfrastructureError>;

    fn remove_network(&self, name: &str) -> Result<(), InfrastructureError>;
}
