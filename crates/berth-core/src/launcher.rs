use crate::backend::ContainerBackend;
use crate::config::RuntimeConfig;
use crate::events::{EventSink, RuntimeEvent};
use crate::lifecycle::validate_transition;
use crate::probe::{not_available, HttpProbeFactory, ProbeFactory};
use crate::readiness::{ServerReadinessChecker, READINESS_SERVERS};
use crate::RuntimeError;
use berth_docker::labels::parse_server_labels;
use berth_docker::{convert, DockerContainerConfig, DockerEnvironment, ProvisionerChain};
use berth_model::{
    EnvironmentFactory, InfrastructureError, InternalMachineConfig, InternalRecipe, MachineStatus,
    RuntimeIdentity, Server, ServerStatus,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningMachine {
    pub name: String,
    pub container_id: String,
    pub status: MachineStatus,
    pub servers: BTreeMap<String, Server>,
}

/// Result of a successful start: every machine is running and ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedRuntime {
    pub identity: RuntimeIdentity,
    pub network: Option<String>,
    /// Machines in start order.
    pub machines: Vec<RunningMachine>,
}

/// Runs the whole pipeline: factory, converter, provisioners, backend and
/// readiness checks.
pub struct RuntimeLauncher {
    factory: EnvironmentFactory,
    chain: ProvisionerChain,
    backend: Arc<dyn ContainerBackend>,
    probes: Arc<dyn ProbeFactory>,
    events: Arc<dyn EventSink>,
}

impl RuntimeLauncher {
    pub fn new(
        factory: EnvironmentFactory,
        chain: ProvisionerChain,
        backend: Arc<dyn ContainerBackend>,
        probes: Arc<dyn ProbeFactory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            factory,
            chain,
            backend,
            probes,
            events,
        }
    }

    /// Launcher with the standard provisioner chain and HTTP probes.
    pub fn from_config(
        config: &RuntimeConfig,
        backend: Arc<dyn ContainerBackend>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let probes = HttpProbeFactory::new(config.readiness.period(), config.readiness.timeout());
        Self::new(
            config.factory.factory(),
            ProvisionerChain::from_config(&config.provisioning),
            backend,
            Arc::new(probes),
            events,
        )
    }

    /// Create, convert and provision the environment without starting it.
    pub fn prepare(
        &self,
        recipe: &InternalRecipe,
        machines: BTreeMap<String, InternalMachineConfig>,
        identity: &RuntimeIdentity,
    ) -> Result<DockerEnvironment, RuntimeError> {
        let environment = self.factory.create(recipe, machines)?;
        for warning in environment.warnings() {
            warn!(workspace = %identity.workspace_id, code = warning.code, "{}", warning.message);
        }
        let mut docker = convert(&environment)?;
        self.chain.provision(&mut docker, identity)?;
        debug!(workspace = %identity.workspace_id, machines = docker.containers().len(), "environment provisioned");
        Ok(docker)
    }

    /// Start every machine in start order and wait for its servers.
    ///
    /// On failure the failing machine is reported `Failed`, machines
    /// started so far are stopped, and the original error is returned.
    pub fn start(
        &self,
        recipe: &InternalRecipe,
        machines: BTreeMap<String, InternalMachineConfig>,
        identity: &RuntimeIdentity,
    ) -> Result<StartedRuntime, RuntimeError> {
        let env = self.prepare(recipe, machines, identity)?;
        let network = env.network().map(str::to_owned);
        if let Some(network) = &network {
            self.backend.create_network(network)?;
        }

        let mut runtime = StartedRuntime {
            identity: identity.clone(),
            network,
            machines: Vec::new(),
        };
        for name in env.start_order() {
            if let Err(e) = self.start_machine(&env, name, &mut runtime) {
                self.cleanup(&mut runtime);
                return Err(e);
            }
        }
        info!(
            workspace = %identity.workspace_id,
            backend = self.backend.name(),
            machines = runtime.machines.len(),
            "runtime started"
        );
        Ok(runtime)
    }

    fn start_machine(
        &self,
        env: &DockerEnvironment,
        name: &str,
        runtime: &mut StartedRuntime,
    ) -> Result<(), RuntimeError> {
        let workspace_id = runtime.identity.workspace_id.to_string();
        let container = env.container(name).ok_or_else(|| {
            InfrastructureError::new(format!("Machine {name} has no container configuration"))
        })?;
        self.events.publish(RuntimeEvent::machine(
            &workspace_id,
            name,
            MachineStatus::Starting,
            None,
        ));

        let started = match self.backend.start_container(name, container) {
            Ok(started) => started,
            Err(e) => {
                self.machine_failed(&workspace_id, name, MachineStatus::Starting, &e.to_string())?;
                return Err(e.into());
            }
        };
        info!(workspace = %workspace_id, machine = name, container = %started.container_id, "machine started");
        let mut machine = RunningMachine {
            name: name.to_owned(),
            container_id: started.container_id,
            status: MachineStatus::Starting,
            servers: started.servers,
        };

        let mut checker =
            ServerReadinessChecker::new(name, &machine.servers, Arc::clone(&self.probes));
        let checked: Vec<String> = checker
            .checked_servers()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let urls: BTreeMap<String, String> = machine
            .servers
            .iter()
            .map(|(reference, server)| (reference.clone(), server.url.clone()))
            .collect();
        let events = Arc::clone(&self.events);
        let (ws, machine_name) = (workspace_id.clone(), name.to_owned());
        let readiness = match unmapped_readiness_server(name, container, &machine.servers) {
            Some(err) => Err(err),
            None => checker
                .start_async(move |reference| {
                    let url = urls.get(reference).map_or("", String::as_str);
                    events.publish(RuntimeEvent::server(
                        &ws,
                        &machine_name,
                        reference,
                        ServerStatus::Running,
                        url,
                    ));
                })
                .and_then(|()| checker.wait()),
        };

        if let Err(e) = readiness {
            self.machine_failed(&workspace_id, name, machine.status, &e.to_string())?;
            machine.status = MachineStatus::Failed;
            if let Err(stop) = self.backend.stop_container(&machine.container_id) {
                warn!(machine = name, "failed to stop machine after readiness failure: {stop}");
            }
            return Err(e.into());
        }

        for reference in &checked {
            if let Some(server) = machine.servers.get_mut(reference) {
                server.status = ServerStatus::Running;
            }
        }
        validate_transition(machine.status, MachineStatus::Running)?;
        machine.status = MachineStatus::Running;
        self.events.publish(RuntimeEvent::machine(
            &workspace_id,
            name,
            MachineStatus::Running,
            None,
        ));
        runtime.machines.push(machine);
        Ok(())
    }

    fn machine_failed(
        &self,
        workspace_id: &str,
        machine: &str,
        from: MachineStatus,
        error: &str,
    ) -> Result<(), RuntimeError> {
        validate_transition(from, MachineStatus::Failed)?;
        self.events.publish(RuntimeEvent::machine(
            workspace_id,
            machine,
            MachineStatus::Failed,
            Some(error.to_owned()),
        ));
        Ok(())
    }

    /// Best-effort stop of everything started so far.
    fn cleanup(&self, runtime: &mut StartedRuntime) {
        if let Err(e) = self.stop(runtime) {
            warn!(workspace = %runtime.identity.workspace_id, "cleanup after failed start: {e}");
        }
    }

    /// Stop running machines in reverse start order and remove the network.
    pub fn stop(&self, runtime: &mut StartedRuntime) -> Result<(), RuntimeError> {
        let workspace_id = runtime.identity.workspace_id.to_string();
        let mut first_error = None;
        for machine in runtime.machines.iter_mut().rev() {
            if machine.status != MachineStatus::Running {
                continue;
            }
            validate_transition(machine.status, MachineStatus::Stopped)?;
            match self.backend.stop_container(&machine.container_id) {
                Ok(()) => {
                    machine.status = MachineStatus::Stopped;
                    for server in machine.servers.values_mut() {
                        server.status = ServerStatus::Stopped;
                    }
                    self.events.publish(RuntimeEvent::machine(
                        &workspace_id,
                        &machine.name,
                        MachineStatus::Stopped,
                        None,
                    ));
                }
                Err(e) => {
                    warn!(machine = %machine.name, "failed to stop machine: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(network) = &runtime.network {
            if let Err(e) = self.backend.remove_network(network) {
                warn!(network = %network, "failed to remove network: {e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// A declared server that must be checked but got no address from the
/// backend. Such a machine can never be confirmed ready.
fn unmapped_readiness_server(
    machine: &str,
    container: &DockerContainerConfig,
    servers: &BTreeMap<String, Server>,
) -> Option<InfrastructureError> {
    parse_server_labels(&container.labels)
        .into_keys()
        .find(|reference| {
            READINESS_SERVERS.contains(&reference.as_str()) && !servers.contains_key(reference)
        })
        .map(|reference| not_available(&reference, machine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::mock::MockBackend;
    use crate::probe::ServerProbe;
    use berth_model::{InstallerConfig, ServerConfig};

    struct Always(bool);

    impl ServerProbe for Always {
        fn check(&self) -> Result<(), InfrastructureError> {
            if self.0 {
                Ok(())
            } else {
                Err(InfrastructureError::new("probe failed"))
            }
        }
    }

    struct StaticProbes(bool);

    impl ProbeFactory for StaticProbes {
        fn create(&self, _machine: &str, _reference: &str, _server: &Server) -> Box<dyn ServerProbe> {
            Box::new(Always(self.0))
        }
    }

    fn agent_machine() -> InternalMachineConfig {
        let mut machine = InternalMachineConfig::default();
        machine.servers.insert(
            "wsagent".to_owned(),
            ServerConfig::new("4401/tcp", "http").with_path("/api"),
        );
        machine
    }

    fn launcher(
        backend: Arc<MockBackend>,
        probes_ok: bool,
        sink: Arc<RecordingSink>,
    ) -> RuntimeLauncher {
        RuntimeLauncher::new(
            EnvironmentFactory::default(),
            ProvisionerChain::from_config(&RuntimeConfig::default().provisioning),
            backend,
            Arc::new(StaticProbes(probes_ok)),
            sink,
        )
    }

    const COMPOSE: &str = "services:\n  db:\n    image: postgres\n  dev:\n    image: eclipse/ubuntu_jdk8\n    depends_on:\n      - db\n";

    fn compose_machines() -> BTreeMap<String, InternalMachineConfig> {
        BTreeMap::from([
            ("db".to_owned(), InternalMachineConfig::default()),
            ("dev".to_owned(), agent_machine()),
        ])
    }

    fn identity() -> RuntimeIdentity {
        RuntimeIdentity::new("ws1", "default", "alice")
    }

    #[test]
    fn starts_machines_in_order_and_marks_servers_running() {
        let backend = Arc::new(MockBackend::default().publish("dev", "4401/tcp", 32801));
        let sink = Arc::new(RecordingSink::new());
        let launcher = launcher(Arc::clone(&backend), true, Arc::clone(&sink));

        let runtime = launcher
            .start(&InternalRecipe::new("compose", COMPOSE), compose_machines(), &identity())
            .unwrap();

        let names: Vec<&str> = runtime.machines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["db", "dev"]);
        assert_eq!(runtime.network.as_deref(), Some("ws1_default"));
        let dev = &runtime.machines[1];
        assert_eq!(dev.status, MachineStatus::Running);
        assert_eq!(dev.servers["wsagent"].status, ServerStatus::Running);
        assert_eq!(dev.servers["wsagent"].url, "http://127.0.0.1:32801/api");

        let started = backend.started().unwrap();
        assert_eq!(started[0].0, "db");
        assert_eq!(started[1].1.container_name.as_deref(), Some("ws1_dev_alice"));
        assert_eq!(
            sink.machine_statuses(),
            vec![
                ("db".to_owned(), MachineStatus::Starting),
                ("db".to_owned(), MachineStatus::Running),
                ("dev".to_owned(), MachineStatus::Starting),
                ("dev".to_owned(), MachineStatus::Running),
            ]
        );
    }

    #[test]
    fn readiness_failure_stops_started_machines() {
        let backend = Arc::new(MockBackend::default().publish("dev", "4401/tcp", 32801));
        let sink = Arc::new(RecordingSink::new());
        let launcher = launcher(Arc::clone(&backend), false, Arc::clone(&sink));

        let err = launcher
            .start(&InternalRecipe::new("compose", COMPOSE), compose_machines(), &identity())
            .unwrap_err();
        assert_eq!(err.to_string(), "probe failed");
        assert!(backend.running().unwrap().is_empty());
        assert!(backend.networks().unwrap().is_empty());
        let statuses = sink.machine_statuses();
        assert!(statuses.contains(&("dev".to_owned(), MachineStatus::Failed)));
        assert!(statuses.contains(&("db".to_owned(), MachineStatus::Stopped)));
    }

    #[test]
    fn backend_failure_is_returned_unchanged() {
        let backend = Arc::new(MockBackend::default().fail_start("dev"));
        let sink = Arc::new(RecordingSink::new());
        let launcher = launcher(Arc::clone(&backend), true, sink);

        let err = launcher
            .start(&InternalRecipe::new("compose", COMPOSE), compose_machines(), &identity())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Infrastructure(_)));
        assert_eq!(err.to_string(), "Start of machine dev failed");
        assert!(backend.running().unwrap().is_empty());
    }

    #[test]
    fn invalid_recipe_fails_before_touching_the_backend() {
        let backend = Arc::new(MockBackend::default());
        let launcher = launcher(Arc::clone(&backend), true, Arc::new(RecordingSink::new()));
        let err = launcher
            .start(&InternalRecipe::new("kubernetes", "kind: Pod"), compose_machines(), &identity())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Validation(_)));
        assert!(backend.started().unwrap().is_empty());
    }

    #[test]
    fn stop_stops_everything_once() {
        let backend = Arc::new(MockBackend::default().publish("dev", "4401/tcp", 32801));
        let launcher = launcher(Arc::clone(&backend), true, Arc::new(RecordingSink::new()));
        let mut runtime = launcher
            .start(&InternalRecipe::new("compose", COMPOSE), compose_machines(), &identity())
            .unwrap();

        launcher.stop(&mut runtime).unwrap();
        assert!(runtime
            .machines
            .iter()
            .all(|m| m.status == MachineStatus::Stopped));
        assert!(backend.running().unwrap().is_empty());
        launcher.stop(&mut runtime).unwrap();
        assert_eq!(backend.stopped().unwrap().len(), 2);
    }

    #[test]
    fn unmapped_agent_fails_the_machine() {
        let backend = Arc::new(MockBackend::default());
        let sink = Arc::new(RecordingSink::new());
        let launcher = launcher(Arc::clone(&backend), true, Arc::clone(&sink));

        let err = launcher
            .start(&InternalRecipe::new("compose", COMPOSE), compose_machines(), &identity())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Infrastructure(_)));
        assert_eq!(err.to_string(), "Server wsagent in machine dev not available.");
        assert!(backend.running().unwrap().is_empty());
        let statuses = sink.machine_statuses();
        assert!(statuses.contains(&("dev".to_owned(), MachineStatus::Failed)));
        assert!(statuses.contains(&("db".to_owned(), MachineStatus::Stopped)));
    }

    #[test]
    fn unmapped_installer_agent_fails_the_machine() {
        let mut installer = InstallerConfig::new("org.eclipse.che.exec");
        installer.servers.insert(
            "exec-agent".to_owned(),
            ServerConfig::new("4412/tcp", "http").with_path("/process"),
        );
        let machine = InternalMachineConfig {
            installers: vec![installer],
            ..InternalMachineConfig::default()
        };
        let backend = Arc::new(MockBackend::default());
        let launcher = launcher(Arc::clone(&backend), true, Arc::new(RecordingSink::new()));

        let err = launcher
            .start(
                &InternalRecipe::new("dockerimage", "eclipse/ubuntu_jdk8"),
                BTreeMap::from([("dev".to_owned(), machine)]),
                &identity(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Server exec-agent in machine dev not available.");
        assert!(backend.running().unwrap().is_empty());
    }

    #[test]
    fn unmapped_custom_server_does_not_block_start() {
        let mut machine = InternalMachineConfig::default();
        machine
            .servers
            .insert("ide".to_owned(), ServerConfig::new("8080/tcp", "http"));
        let launcher = launcher(
            Arc::new(MockBackend::default()),
            false,
            Arc::new(RecordingSink::new()),
        );

        let runtime = launcher
            .start(
                &InternalRecipe::new("dockerimage", "eclipse/ubuntu_jdk8"),
                BTreeMap::from([("dev".to_owned(), machine)]),
                &identity(),
            )
            .unwrap();
        assert_eq!(runtime.machines[0].status, MachineStatus::Running);
        assert!(runtime.machines[0].servers.is_empty());
    }

    #[test]
    fn compose_named_volumes_are_scoped_to_the_workspace() {
        let compose = "services:\n  db:\n    image: postgres\n    volumes:\n      - pgdata:/var/lib/postgresql/data\n      - /srv/backup:/backup:ro\n";
        let machines = BTreeMap::from([("db".to_owned(), InternalMachineConfig::default())]);
        let launcher = launcher(
            Arc::new(MockBackend::default()),
            true,
            Arc::new(RecordingSink::new()),
        );

        let mut seen = Vec::new();
        for workspace in ["wsA", "wsB"] {
            let env = launcher
                .prepare(
                    &InternalRecipe::new("compose", compose),
                    machines.clone(),
                    &RuntimeIdentity::new(workspace, "default", "alice"),
                )
                .unwrap();
            let volumes = env.container("db").unwrap().volumes.clone();
            assert_eq!(
                volumes,
                vec![
                    format!("{workspace}_pgdata:/var/lib/postgresql/data"),
                    "/srv/backup:/backup:ro".to_owned(),
                ]
            );
            seen.push(volumes[0].clone());
        }
        assert_ne!(seen[0], seen[1]);
    }
}
