use berth_model::{MachineStatus, ServerStatus};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineStatusEvent {
    pub workspace_id: String,
    pub machine: String,
    pub status: MachineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatusEvent {
    pub workspace_id: String,
    pub machine: String,
    pub server: String,
    pub status: ServerStatus,
    pub url: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    Machine(MachineStatusEvent),
    Server(ServerStatusEvent),
}

impl RuntimeEvent {
    pub fn machine(
        workspace_id: &str,
        machine: &str,
        status: MachineStatus,
        error: Option<String>,
    ) -> Self {
        RuntimeEvent::Machine(MachineStatusEvent {
            workspace_id: workspace_id.to_owned(),
            machine: machine.to_owned(),
            status,
            error,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn server(
        workspace_id: &str,
        machine: &str,
        server: &str,
        status: ServerStatus,
        url: &str,
    ) -> Self {
        RuntimeEvent::Server(ServerStatusEvent {
            workspace_id: workspace_id.to_owned(),
            machine: machine.to_owned(),
            server: server.to_owned(),
            status,
            url: url.to_owned(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Receives lifecycle events. Called from probe threads as well as the
/// launcher thread.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: RuntimeEvent);
}

/// Writes events to the tracing log.
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: RuntimeEvent) {
        match event {
            RuntimeEvent::Machine(e) => match e.error {
                Some(error) => {
                    warn!(workspace = %e.workspace_id, machine = %e.machine, status = %e.status, "{error}");
                }
                None => info!(workspace = %e.workspace_id, machine = %e.machine, status = %e.status, "machine status"),
            },
            RuntimeEvent::Server(e) => {
                info!(workspace = %e.workspace_id, machine = %e.machine, server = %e.server, status = %e.status, url = %e.url, "server status");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RuntimeEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RuntimeEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Machine statuses in publication order, as `(machine, status)`.
    pub fn machine_statuses(&self) -> Vec<(String, MachineStatus)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RuntimeEvent::Machine(e) => Some((e.machine, e.status)),
                RuntimeEvent::Server(_) => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: RuntimeEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
