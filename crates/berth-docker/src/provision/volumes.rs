use super::Provisioner;
use crate::container::DockerEnvironment;
use berth_model::{volumes, InfrastructureError, RuntimeIdentity};

/// Makes container volumes workspace-scoped.
///
/// Named sources of volumes already on the container (compose services)
/// are rewritten, then machine volumes are appended. Host paths are bind
/// mounts and are kept as they are, as are anonymous volumes.
pub struct VolumesConverter;

fn is_host_path(name: &str) -> bool {
    name.starts_with('/')
        || name.starts_with("./")
        || name.starts_with("../")
        || name.starts_with("~/")
        || name == "."
}

fn scoped_source(workspace_id: &str, name: &str) -> String {
    if is_host_path(name) {
        name.to_owned()
    } else {
        volumes::generate(workspace_id, name)
    }
}

/// Rewrite the source of a `source:target[:mode]` entry.
fn scope_entry(workspace_id: &str, entry: &str) -> String {
    match entry.split_once(':') {
        Some((source, rest)) => format!("{}:{rest}", scoped_source(workspace_id, source)),
        None => entry.to_owned(),
    }
}

impl Provisioner for VolumesConverter {
    fn name(&self) -> &'static str {
        "volumes"
    }

    fn provision(
        &self,
        env: &mut DockerEnvironment,
        identity: &RuntimeIdentity,
    ) -> Result<(), InfrastructureError> {
        let workspace_id = identity.workspace_id.as_str();
        for (_, machine, container) in env.machines_and_containers_mut() {
            for entry in &mut container.volumes {
                *entry = scope_entry(workspace_id, entry);
            }
            for (name, volume) in &machine.volumes {
                let source = scoped_source(workspace_id, name);
                container.add_volume(format!("{source}:{}", volume.path));
            }
        }
        Ok(())
    }
}
