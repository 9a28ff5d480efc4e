use crate::container::{DockerBuildContext, DockerContainerConfig, DockerEnvironment};
use berth_model::{ComposeService, Environment, ValidationError};
use std::collections::BTreeMap;
use tracing::debug;

/// Convert a normalized environment into its Docker representation.
///
/// Dockerfile and image environments produce one container per machine
/// with only the build or image set. Compose environments copy every
/// service field; the container side of each `ports` entry is added to
/// `expose` since host publishing is decided at start time.
pub fn convert(environment: &Environment) -> Result<DockerEnvironment, ValidationError> {
    let machines = environment.machines().clone();
    let containers: BTreeMap<String, DockerContainerConfig> = match environment {
        Environment::Dockerfile(env) => machines
            .keys()
            .map(|name| {
                let container = DockerContainerConfig {
                    build: Some(DockerBuildContext {
                        dockerfile_content: Some(env.dockerfile_content.clone()),
                        ..DockerBuildContext::default()
                    }),
                    ..DockerContainerConfig::default()
                };
                (name.clone(), container)
            })
            .collect(),
        Environment::Image(env) => machines
            .keys()
            .map(|name| {
                let container = DockerContainerConfig {
                    image: Some(env.image.clone()),
                    ..DockerContainerConfig::default()
                };
                (name.clone(), container)
            })
            .collect(),
        Environment::Compose(env) => env
            .compose
            .services
            .iter()
            .map(|(name, service)| (name.clone(), from_service(service)))
            .collect(),
    };
    debug!(
        kind = %environment.kind(),
        containers = containers.len(),
        "converted environment"
    );
    DockerEnvironment::new(
        machines,
        containers,
        environment.start_order(),
        environment.warnings().to_vec(),
    )
}

fn from_service(service: &ComposeService) -> DockerContainerConfig {
    let mut expose = service.expose.clone();
    for port in &service.ports {
        if let Some(container_port) = container_port(port) {
            expose.push(container_port);
        }
    }
    DockerContainerConfig {
        container_name: service.container_name.clone(),
        image: service.image.clone(),
        build: service.build.as_ref().map(|build| DockerBuildContext {
            context: build.context.clone(),
            dockerfile_path: build.dockerfile.clone(),
            dockerfile_content: None,
            args: build.args.clone(),
        }),
        command: service.command.clone(),
        entrypoint: service.entrypoint.clone(),
        environment: service.environment.clone(),
        expose,
        labels: service.labels.clone(),
        links: service.links.clone(),
        depends_on: service.depends_on.clone(),
        volumes: service.volumes.clone(),
        volumes_from: service.volumes_from.clone(),
        networks: service.networks.clone(),
        mem_limit: service.mem_limit,
    }
}

/// Container side of a compose port mapping: `8080:80/udp` -> `80/udp`.
fn container_port(mapping: &str) -> Option<String> {
    let mapping = mapping.trim();
    let (ports, protocol) = match mapping.split_once('/') {
        Some((ports, protocol)) => (ports, Some(protocol)),
        None => (mapping, None),
    };
    let port = ports.rsplit(':').next()?.trim();
    if port.is_empty() {
        return None;
    }
    Some(match protocol {
        Some(protocol) => format!("{port}/{protocol}"),
        None => port.to_owned(),
    })
}
