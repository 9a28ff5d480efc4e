use super::Provisioner;
use crate::container::DockerEnvironment;
use crate::installer::InstallerConfigApplier;
use berth_model::{InfrastructureError, RuntimeIdentity};

pub struct InstallerConfigProvisioner;

impl Provisioner for InstallerConfigProvisioner {
    fn name(&self) -> &'static str {
        "installers"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for (_, machine, container) in env.machines_and_containers_mut() {
            InstallerConfigApplier::apply(machine, container);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::test_support::{environment, identity};
    use berth_model::{InstallerConfig, InternalMachineConfig, ServerConfig, ENVIRONMENT_PROPERTY};

    #[test]
    fn applies_installers_of_each_machine_to_its_container() {
        let mut exec = InstallerConfig::new("exec");
        exec.servers
            .insert("exec-agent".to_owned(), ServerConfig::new("4412/tcp", "http"));
        exec.properties
            .insert(ENVIRONMENT_PROPERTY.to_owned(), "EXEC=1".to_owned());
        let dev = InternalMachineConfig {
            installers: vec![exec],
            ..InternalMachineConfig::default()
        };
        let mut env = environment(vec![("db", InternalMachineConfig::default()), ("dev", dev)]);
        InstallerConfigProvisioner.provision(&mut env, &identity()).unwrap();

        let dev = env.container("dev").unwrap();
        assert_eq!(dev.expose, vec!["4412/tcp"]);
        assert_eq!(dev.environment["EXEC"], "1");
        let db = env.container("db").unwrap();
        assert!(db.labels.is_empty());
        assert!(db.environment.is_empty());
    }
}
