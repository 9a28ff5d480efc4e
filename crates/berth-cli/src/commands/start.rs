use super::{colorize_status, describe, json_pretty, spin_fail, spin_ok, spinner, WorkspaceFile, EXIT_SUCCESS};
use berth_core::{LogSink, MockBackend, RuntimeConfig, RuntimeLauncher};
use std::path::Path;
use std::sync::Arc;

/// A `machine=port:host_port` binding from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub machine: String,
    pub port: String,
    pub host_port: u16,
}

impl std::str::FromStr for Publish {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || format!("invalid binding '{s}', expected machine=port:host_port");
        let (machine, ports) = s.split_once('=').ok_or_else(malformed)?;
        let (port, host_port) = ports.rsplit_once(':').ok_or_else(malformed)?;
        let host_port = host_port.trim().parse().map_err(|_| malformed())?;
        if machine.trim().is_empty() || port.trim().is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            machine: machine.trim().to_owned(),
            port: port.trim().to_owned(),
            host_port,
        })
    }
}

pub fn run(
    config: &RuntimeConfig,
    workspace: &Path,
    publish: &[Publish],
    json: bool,
) -> Result<u8, String> {
    let workspace = WorkspaceFile::load(workspace)?;
    let backend = publish.iter().fold(
        MockBackend::new(&config.readiness.server_host),
        |backend, p| backend.publish(&p.machine, &p.port, p.host_port),
    );
    let launcher = RuntimeLauncher::from_config(config, Arc::new(backend), Arc::new(LogSink));

    let pb = if json {
        None
    } else {
        Some(spinner(&format!(
            "starting workspace {}...",
            workspace.identity.workspace_id
        )))
    };
    let runtime = match launcher.start(&workspace.recipe, workspace.machines, &workspace.identity) {
        Ok(runtime) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "workspace started");
            }
            runtime
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "start failed");
            }
            return Err(describe(&e));
        }
    };

    if json {
        println!("{}", json_pretty(&runtime)?);
    } else {
        for machine in &runtime.machines {
            println!(
                "{} [{}] {}",
                machine.name,
                colorize_status(machine.status),
                machine.container_id
            );
            for (reference, server) in &machine.servers {
                println!("  {reference}: {} ({})", server.url, server.status);
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
