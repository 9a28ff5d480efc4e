use crate::backend::{ContainerBackend, StartedMachine};
use berth_docker::{DockerContainerConfig, ServersMapper};
use berth_model::InfrastructureError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MockState {
    networks: BTreeSet<String>,
    running: BTreeMap<String, String>,
    started: Vec<(String, DockerContainerConfig)>,
    stopped: Vec<String>,
    next_id: u64,
}

/// In-memory backend. Nothing is executed; started configs are recorded.
///
/// Only ports registered with `publish` get host bindings, so only their
/// servers appear on the started machine.
pub struct MockBackend {
    mapper: ServersMapper,
    published: BTreeMap<String, BTreeMap<String, u16>>,
    failing: BTreeSet<String>,
    state: Mutex<MockState>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

impl MockBackend {
    pub fn new(hostname: &str) -> Self {
        Self {
            mapper: ServersMapper::new(hostname),
            published: BTreeMap::new(),
            failing: BTreeSet::new(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Bind container `port` of `machine` to `host_port`.
    #[must_use]
    pub fn publish(mut self, machine: &str, port: &str, host_port: u16) -> Self {
        self.published
            .entry(machine.to_owned())
            .or_default()
            .insert(port.to_owned(), host_port);
        self
    }

    /// Make starting `machine` fail.
    #[must_use]
    pub fn fail_start(mut self, machine: &str) -> Self {
        self.failing.insert(machine.to_owned());
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, InfrastructureError> {
        self.state
            .lock()
            .map_err(|e| InfrastructureError::new(format!("mock backend state poisoned: {e}")))
    }

    pub fn started(&self) -> Result<Vec<(String, DockerContainerConfig)>, InfrastructureError> {
        Ok(self.lock()?.started.clone())
    }

    pub fn running(&self) -> Result<Vec<String>, InfrastructureError> {
        Ok(self.lock()?.running.values().cloned().collect())
    }

    pub fn stopped(&self) -> Result<Vec<String>, InfrastructureError> {
        Ok(self.lock()?.stopped.clone())
    }

    pub fn networks(&self) -> Result<Vec<String>, InfrastructureError> {
        Ok(self.lock()?.networks.iter().cloned().collect())
    }
}

impl ContainerBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn create_network(&self, name: &str) -> Result<(), InfrastructureError> {
        self.lock()?.networks.insert(name.to_owned());
        Ok(())
    }

    fn start_container(
        &self,
        machine: &str,
        config: &DockerContainerConfig,
    ) -> Result<StartedMachine, InfrastructureError> {
        if self.failing.contains(machine) {
            return Err(InfrastructureError::new(format!(
                "Start of machine {machine} failed"
            )));
        }
        let mut state = self.lock()?;
        for network in &config.networks {
            if !state.networks.contains(network) {
                return Err(InfrastructureError::new(format!(
                    "Network {network} does not exist"
                )));
            }
        }
        state.next_id += 1;
        let container_id = format!("mock-{:04}", state.next_id);
        state.running.insert(container_id.clone(), machine.to_owned());
        state.started.push((machine.to_owned(), config.clone()));

        let bindings = self.published.get(machine).cloned().unwrap_or_default();
        let servers = self.mapper.map(&config.labels, &bindings);
        Ok(StartedMachine {
            container_id,
            servers,
        })
    }

    fn stop_container(&self, container_id: &str) -> Result<(), InfrastructureError> {
        let mut state = self.lock()?;
        if state.running.remove(container_id).is_none() {
            return Err(InfrastructureError::new(format!(
                "Container {container_id} is not running"
            )));
        }
        state.stopped.push(container_id.to_owned());
        Ok(())
    }

    fn remove_network(&self, name: &str) -> Result<(), InfrastructureError> {
        self.lock()?.networks.remove(name);
        Ok(())
    }
}
