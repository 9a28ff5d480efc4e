use super::Provisioner;
use crate::container::DockerEnvironment;
use crate::labels::{MACHINE_NAME_LABEL, OWNER_LABEL, WORKSPACE_ID_LABEL};
use berth_model::{InfrastructureError, RuntimeIdentity};

pub struct MachineLabelsProvisioner;

impl Provisioner for MachineLabelsProvisioner {
    fn name(&self) -> &'static str {
        "machine-labels"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        for (machine, container) in env.containers_mut() {
            container
                .labels
                .insert(MACHINE_NAME_LABEL.to_owned(), machine.clone());
            container.labels.insert(
                WORKSPACE_ID_LABEL.to_owned(),
                identity.workspace_id.to_string(),
            );
            container
                .labels
                .insert(OWNER_LABEL.to_owned(), identity.owner.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::test_support::{environment, identity};
    use berth_model::InternalMachineConfig;

    #[test]
    fn labels_identify_machine_and_workspace() {
        let mut env = environment(vec![("dev", InternalMachineConfig::default())]);
        MachineLabelsProvisioner.provision(&mut env, &identity()).unwrap();
        let labels = &env.container("dev").unwrap().labels;
        assert_eq!(labels[MACHINE_NAME_LABEL], "dev");
        assert_eq!(labels[WORKSPACE_ID_LABEL], "ws1");
        assert_eq!(labels[OWNER_LABEL], "alice");
    }
}
