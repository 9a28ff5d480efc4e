use berth_model::{InternalMachineConfig, ValidationError, Warning};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerBuildContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    /// Inline Dockerfile, used instead of a context directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_content: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

/// Everything the container-start collaborator needs for one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerContainerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<DockerBuildContext>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub entrypoint: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Exposed ports such as `4401/tcp`. Duplicates are tolerated.
    #[serde(default)]
    pub expose: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// `source:target[:mode]` entries.
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub volumes_from: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<u64>,
}

impl DockerContainerConfig {
    /// Append a volume unless the identical entry is already present.
    pub fn add_volume(&mut self, volume: impl Into<String>) {
        let volume = volume.into();
        if !self.volumes.contains(&volume) {
            self.volumes.push(volume);
        }
    }
}

/// Docker view of an environment: machine configs plus one mutable
/// container config per machine.
///
/// The machine set is fixed at construction; provisioners can only mutate
/// existing container configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockerEnvironment {
    machines: BTreeMap<String, InternalMachineConfig>,
    containers: BTreeMap<String, DockerContainerConfig>,
    start_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<Warning>,
}

impl DockerEnvironment {
    pub fn new(
        machines: BTreeMap<String, InternalMachineConfig>,
        containers: BTreeMap<String, DockerContainerConfig>,
        start_order: Vec<String>,
        warnings: Vec<Warning>,
    ) -> Result<Self, ValidationError> {
        let machine_names: BTreeSet<&String> = machines.keys().collect();
        let container_names: BTreeSet<&String> = containers.keys().collect();
        if machine_names != container_names {
            return Err(ValidationError::new(
                "Every machine of the environment must have exactly one container",
            ));
        }
        let ordered: BTreeSet<&String> = start_order.iter().collect();
        if ordered != machine_names || start_order.len() != machines.len() {
            return Err(ValidationError::new(
                "Start order must list every machine of the environment exactly once",
            ));
        }
        Ok(Self {
            machines,
            containers,
            start_order,
            network: None,
            warnings,
        })
    }

    pub fn machines(&self) -> &BTreeMap<String, InternalMachineConfig> {
        &self.machines
    }

    pub fn containers(&self) -> &BTreeMap<String, DockerContainerConfig> {
        &self.containers
    }

    pub fn container(&self, machine: &str) -> Option<&DockerContainerConfig> {
        self.containers.get(machine)
    }

    pub fn container_mut(&mut self, machine: &str) -> Option<&mut DockerContainerConfig> {
        self.containers.get_mut(machine)
    }

    pub fn containers_mut(
        &mut self,
    ) -> impl Iterator<Item = (&String, &mut DockerContainerConfig)> + '_ {
        self.containers.iter_mut()
    }

    /// Machine configs paired with their container configs, in name order.
    pub fn machines_and_containers_mut(
        &mut self,
    ) -> impl Iterator<Item = (&String, &InternalMachineConfig, &mut DockerContainerConfig)> + '_
    {
        // Both maps share the same sorted key set, so zipping pairs them up.
        self.machines
            .iter()
            .zip(self.containers.values_mut())
            .map(|((name, machine), container)| (name, machine, container))
    }

    pub fn start_order(&self) -> &[String] {
        &self.start_order
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn set_network(&mut self, network: impl Into<String>) {
        self.network = Some(network.into());
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(names: &[&str]) -> (
        BTreeMap<String, InternalMachineConfig>,
        BTreeMap<String, DockerContainerConfig>,
    ) {
        let machines = names
            .iter()
            .map(|n| ((*n).to_owned(), InternalMachineConfig::default()))
            .collect();
        let containers = names
            .iter()
            .map(|n| ((*n).to_owned(), DockerContainerConfig::default()))
            .collect();
        (machines, containers)
    }

    #[test]
    fn rejects_mismatched_machine_sets() {
        let (machines, _) = pair(&["a", "b"]);
        let (_, containers) = pair(&["a"]);
        let err = DockerEnvironment::new(machines, containers, vec!["a".to_owned()], Vec::new())
            .unwrap_err();
        assert!(err.message().contains("exactly one container"));
    }

    #[test]
    fn rejects_incomplete_start_order() {
        let (machines, containers) = pair(&["a", "b"]);
        assert!(
            DockerEnvironment::new(machines, containers, vec!["a".to_owned()], Vec::new())
                .is_err()
        );
    }

    #[test]
    fn pairs_machines_with_their_containers() {
        let (mut machines, containers) = pair(&["b", "a"]);
        machines
            .get_mut("b")
            .unwrap()
            .env
            .insert("WHO".to_owned(), "b".to_owned());
        let mut env = DockerEnvironment::new(
            machines,
            containers,
            vec!["a".to_owned(), "b".to_owned()],
            Vec::new(),
        )
        .unwrap();

        for (name, machine, container) in env.machines_and_containers_mut() {
            if let Some(who) = machine.env.get("WHO") {
                assert_eq!(who, name);
                container.add_volume("/data:/data");
                container.add_volume("/data:/data");
            }
        }
        assert_eq!(env.container("b").unwrap().volumes, vec!["/data:/data"]);
        assert!(env.container("a").unwrap().volumes.is_empty());
    }
}
