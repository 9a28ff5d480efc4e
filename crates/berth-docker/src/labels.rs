//! Container label keys and the server-label codec.
//!
//! Each server `<ref>` is written as three labels
//! `org.eclipse.che.server.<ref>.port|protocol|path`, which lets the
//! server map be rebuilt from a running container without the original
//! machine config.

use berth_model::ServerConfig;
use std::collections::BTreeMap;

pub const MACHINE_NAME_LABEL: &str = "org.eclipse.che.machine.name";
pub const WORKSPACE_ID_LABEL: &str = "org.eclipse.che.workspace.id";
pub const OWNER_LABEL: &str = "org.eclipse.che.machine.owner";

const SERVER_LABEL_PREFIX: &str = "org.eclipse.che.server.";

fn key(reference: &str, field: &str) -> String {
    format!("{SERVER_LABEL_PREFIX}{reference}.{field}")
}

/// Write the labels describing `servers` into `labels`.
pub fn apply_server_labels(
    labels: &mut BTreeMap<String, String>,
    servers: &BTreeMap<String, ServerConfig>,
) {
    for (reference, server) in servers {
        labels.insert(key(reference, "port"), server.port.clone());
        labels.insert(key(reference, "protocol"), server.protocol.clone());
        labels.insert(
            key(reference, "path"),
            server.path.clone().unwrap_or_default(),
        );
    }
}

/// Rebuild server configs from container labels.
///
/// Entries missing a port are dropped. Empty paths become `None`.
pub fn parse_server_labels(labels: &BTreeMap<String, String>) -> BTreeMap<String, ServerConfig> {
    let mut partial: BTreeMap<&str, (Option<&str>, Option<&str>, Option<&str>)> = BTreeMap::new();
    for (label, value) in labels {
        let Some(rest) = label.strip_prefix(SERVER_LABEL_PREFIX) else {
            continue;
        };
        let Some((reference, field)) = rest.rsplit_once('.') else {
            continue;
        };
        let entry = partial.entry(reference).or_default();
        match field {
            "port" => entry.0 = Some(value),
            "protocol" => entry.1 = Some(value),
            "path" => entry.2 = Some(value),
            _ => {}
        }
    }

    partial
        .into_iter()
        .filter_map(|(reference, (port, protocol, path))| {
            let mut server = ServerConfig::new(port?, protocol.unwrap_or_default());
            server.path = path.filter(|p| !p.is_empty()).map(str::to_owned);
            Some((reference.to_owned(), server))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_three_labels_per_server() {
        let servers = BTreeMap::from([
            (
                "exec-agent".to_owned(),
                ServerConfig::new("4412/tcp", "http").with_path("/process"),
            ),
            ("ssh".to_owned(), ServerConfig::new("22/tcp", "ssh")),
        ]);
        let mut labels = BTreeMap::new();
        apply_server_labels(&mut labels, &servers);

        assert_eq!(labels.len(), 6);
        assert_eq!(labels["org.eclipse.che.server.exec-agent.port"], "4412/tcp");
        assert_eq!(labels["org.eclipse.che.server.exec-agent.protocol"], "http");
        assert_eq!(labels["org.eclipse.che.server.exec-agent.path"], "/process");
        assert_eq!(labels["org.eclipse.che.server.ssh.path"], "");
    }

    #[test]
    fn parsing_restores_written_servers() {
        let servers = BTreeMap::from([
            (
                "ws.agent".to_owned(),
                ServerConfig::new("4401/tcp", "http").with_path("/api"),
            ),
            ("ssh".to_owned(), ServerConfig::new("22/tcp", "ssh")),
        ]);
        let mut labels = BTreeMap::from([(MACHINE_NAME_LABEL.to_owned(), "dev".to_owned())]);
        apply_server_labels(&mut labels, &servers);

        assert_eq!(parse_server_labels(&labels), servers);
    }

    #[test]
    fn parsing_skips_entries_without_port() {
        let labels = BTreeMap::from([(
            "org.eclipse.che.server.broken.protocol".to_owned(),
            "http".to_owned(),
        )]);
        assert!(parse_server_labels(&labels).is_empty());
    }
}
