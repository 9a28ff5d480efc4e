use crate::labels::parse_server_labels;
use berth_model::Server;
use std::collections::BTreeMap;
use tracing::trace;

/// Turns server labels and published host ports into reachable servers.
#[derive(Debug, Clone)]
pub struct ServersMapper {
    hostname: String,
}

impl ServersMapper {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    /// Map every labelled server whose port was published.
    ///
    /// `bindings` is keyed by exposed port (`4401/tcp`, or bare `4401`
    /// meaning tcp) and holds the host port. Servers without a binding are
    /// left out. Returned servers are `Starting`.
    pub fn map(
        &self,
        labels: &BTreeMap<String, String>,
        bindings: &BTreeMap<String, u16>,
    ) -> BTreeMap<String, Server> {
        let bindings: BTreeMap<String, u16> = bindings
            .iter()
            .map(|(port, host)| (normalize_port(port), *host))
            .collect();

        let mut servers = BTreeMap::new();
        for (reference, config) in parse_server_labels(labels) {
            let Some(host_port) = bindings.get(&normalize_port(&config.port)) else {
                trace!(server = %reference, port = %config.port, "port not published");
                continue;
            };
            let path = match config.path.as_deref().map(str::trim) {
                Some(p) if !p.is_empty() && !p.starts_with('/') => format!("/{p}"),
                Some(p) => p.to_owned(),
                None => String::new(),
            };
            let url = format!(
                "{}://{}:{host_port}{path}",
                config.protocol, self.hostname
            );
            let mut server = Server::new(url);
            server.attributes = config.attributes;
            servers.insert(reference, server);
        }
        servers
    }
}

fn normalize_port(port: &str) -> String {
    let port = port.trim();
    if port.contains('/') {
        port.to_owned()
    } else {
        format!("{port}/tcp")
    }
}
