use super::Provisioner;
use crate::container::DockerEnvironment;
use berth_model::{InfrastructureError, RuntimeIdentity};

/// Mounts operator-configured volumes into every container.
#[derive(Debug, Clone, Default)]
pub struct ExtraVolumesProvisioner {
    volumes: Vec<String>,
}

impl ExtraVolumesProvisioner {
    /// `raw` is `host:container[:mode]` entries separated by `;`.
    pub fn new(raw: Option<&str>) -> Self {
        let volumes = raw
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .collect();
        Self { volumes }
    }

    pub fn volumes(&self) -> &[String] {
        &self.volumes
    }
}

impl Provisioner for ExtraVolumesProvisioner {
    fn name(&self) -> &'static str {
        "extra-volumes"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        _identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        if self.volumes.is_empty() {
            return Ok(());
        }
        for (_, container) in env.containers_mut() {
            for volume in &self.volumes {
                container.add_volume(volume.as_str());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::test_support::{environment, identity};
    use berth_model::InternalMachineConfig;

    fn two_machines() -> DockerEnvironment {
        environment(vec![
            ("db", InternalMachineConfig::default()),
            ("dev", InternalMachineConfig::default()),
        ])
    }

    #[test]
    fn adds_every_configured_volume_to_every_container() {
        let mut env = two_machines();
        ExtraVolumesProvisioner::new(Some("/a:/b;/c:/d"))
            .provision(&mut env, &identity())
            .unwrap();
        for (_, container) in env.containers() {
            assert_eq!(container.volumes, vec!["/a:/b", "/c:/d"]);
        }
    }

    #[test]
    fn empty_or_missing_configuration_adds_nothing() {
        for raw in [None, Some(""), Some(" ; ")] {
            let mut env = two_machines();
            let provisioner = ExtraVolumesProvisioner::new(raw);
            assert!(provisioner.volumes().is_empty());
            provisioner.provision(&mut env, &identity()).unwrap();
            assert!(env.containers().values().all(|c| c.volumes.is_empty()));
        }
    }
}
