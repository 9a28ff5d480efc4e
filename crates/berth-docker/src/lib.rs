//! Docker infrastructure layer for Berth environments.
//!
//! This crate turns a normalized `Environment` into a `DockerEnvironment`
//! (one mutable `DockerContainerConfig` per machine), runs the ordered
//! `ProvisionerChain` over it (names, networks, labels, servers, installers,
//! environment variables, memory, volumes), and maps server labels plus
//! published ports back into reachable `Server` URLs.

pub mod config;
pub mod container;
pub mod convert;
pub mod installer;
pub mod labels;
pub mod provision;
pub mod servers;

pub use config::ProvisioningConfig;
pub use container::{DockerBuildContext, DockerContainerConfig, DockerEnvironment};
pub use convert::convert;
pub use installer::InstallerConfigApplier;
pub use provision::{Provisioner, ProvisionerChain};
pub use servers::ServersMapper;
