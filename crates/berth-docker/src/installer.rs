use crate::container::DockerContainerConfig;
use crate::labels::apply_server_labels;
use berth_model::{InternalMachineConfig, ENVIRONMENT_PROPERTY};
use std::collections::BTreeMap;
use tracing::debug;

/// Copies installer-declared servers and environment into a container.
pub struct InstallerConfigApplier;

impl InstallerConfigApplier {
    /// Apply every installer of `machine` to `container`, in declaration order.
    ///
    /// Each installer server becomes three labels plus an exposed port.
    /// The `environment` property (`k=v,k2=v2`) is merged into the container
    /// environment; a later installer overrides an earlier one on the same key.
    pub fn apply(machine: &InternalMachineConfig, container: &mut DockerContainerConfig) {
        for installer in &machine.installers {
            apply_server_labels(&mut container.labels, &installer.servers);
            for server in installer.servers.values() {
                container.expose.push(server.port.clone());
            }

            let Some(raw) = installer.properties.get(ENVIRONMENT_PROPERTY) else {
                continue;
            };
            match parse_environment_property(raw) {
                Some(vars) => container.environment.extend(vars),
                None => debug!(
                    installer = %installer.id,
                    "ignoring malformed environment property"
                ),
            }
        }
    }
}

/// Parse `k=v,k2=v2`. Blank entries are skipped; any other entry without
/// `=` rejects the whole property.
pub fn parse_environment_property(raw: &str) -> Option<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry.split_once('=')?;
        vars.insert(key.to_owned(), value.to_owned());
    }
    Some(vars)
}
