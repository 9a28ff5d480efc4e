//! Runtime orchestration for Berth workspaces.
//!
//! This crate ties the environment model and the Docker provisioning layer
//! together into the `RuntimeLauncher`: it creates and provisions an
//! environment, starts its machines through a `ContainerBackend` in start
//! order, and waits for each machine's servers with the fail-fast
//! `ServerReadinessChecker`. Lifecycle transitions are validated and
//! reported to an `EventSink`.

pub mod backend;
pub mod config;
pub mod events;
pub mod launcher;
pub mod lifecycle;
pub mod mock;
pub mod probe;
pub mod readiness;

pub use backend::{ContainerBackend, StartedMachine};
pub use config::{FactoryConfig, ReadinessConfig, RuntimeConfig};
pub use events::{EventSink, LogSink, MachineStatusEvent, RecordingSink, RuntimeEvent, ServerStatusEvent};
pub use launcher::{RunningMachine, RuntimeLauncher, StartedRuntime};
pub use lifecycle::validate_transition;
pub use mock::MockBackend;
pub use probe::{HttpProbeFactory, HttpServerProbe, ProbeFactory, ServerProbe};
pub use readiness::{ServerReadinessChecker, READINESS_SERVERS};

use berth_model::{EnvironmentError, InfrastructureError, MachineStatus, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
    #[error("invalid machine status transition: {from} -> {to}")]
    InvalidTransition {
        from: MachineStatus,
        to: MachineStatus,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EnvironmentError> for RuntimeError {
    fn from(err: EnvironmentError) -> Self {
        match err {
            EnvironmentError::Validation(e) => RuntimeError::Validation(e),
            EnvironmentError::Infrastructure(e) => RuntimeError::Infrastructure(e),
        }
    }
}
