use super::Provisioner;
use crate::container::DockerEnvironment;
use crate::labels::apply_server_labels;
use berth_model::{InfrastructureError, RuntimeIdentity};

/// Machine-level servers become server labels and exposed ports.
pub struct ServersConverter;

impl Provisioner for ServersConverter {
    fn name(&self) -> &'static str {
        "servers"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for (_, machine, container) in env.machines_and_containers_mut() {
            apply_server_labels(&mut container.labels, &machine.servers);
            for server in machine.servers.values() {
                if !container.expose.contains(&server.port) {
                    container.expose.push(server.port.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::parse_server_labels;
    use crate::provision::test_support::{environment, identity};
    use berth_model::{InternalMachineConfig, ServerConfig};

    #[test]
    fn servers_are_labelled_and_exposed_once() {
        let mut machine = InternalMachineConfig::default();
        machine
            .servers
            .insert("ide".to_owned(), ServerConfig::new("8080/tcp", "http"));
        machine
            .servers
            .insert("ide-dev".to_owned(), ServerConfig::new("8080/tcp", "http").with_path("/dev"));
        let servers = machine.servers.clone();
        let mut env = environment(vec![("dev", machine)]);
        ServersConverter.provision(&mut env, &identity()).unwrap();

        let container = env.container("dev").unwrap();
        assert_eq!(container.expose, vec!["8080/tcp"]);
        assert_eq!(parse_server_labels(&container.labels), servers);
    }
}
