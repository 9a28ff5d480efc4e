use super::{describe, json_pretty, WorkspaceFile, EXIT_SUCCESS};
use berth_core::{MockBackend, RuntimeConfig, RuntimeLauncher};
use berth_docker::DockerEnvironment;
use std::path::Path;
use std::sync::Arc;

pub fn run(config: &RuntimeConfig, workspace: &Path, json: bool) -> Result<u8, String> {
    let workspace = WorkspaceFile::load(workspace)?;
    // Provisioning never touches the backend.
    let launcher = RuntimeLauncher::from_config(
        config,
        Arc::new(MockBackend::default()),
        Arc::new(berth_core::LogSink),
    );
    let env = launcher
        .prepare(&workspace.recipe, workspace.machines, &workspace.identity)
        .map_err(|e| describe(&e))?;

    if json {
        println!("{}", json_pretty(&env)?);
    } else {
        print_summary(&env);
    }
    Ok(EXIT_SUCCESS)
}

fn print_summary(env: &DockerEnvironment) {
    if let Some(network) = env.network() {
        println!("network: {network}");
    }
    for warning in env.warnings() {
        println!("warning [{}]: {}", warning.code, warning.message);
    }
    for name in env.start_order() {
        let Some(container) = env.container(name) else {
            continue;
        };
        println!("machine {name}");
        if let Some(container_name) = &container.container_name {
            println!("  container: {container_name}");
        }
        if let Some(image) = &container.image {
            println!("  image: {image}");
        } else if let Some(build) = &container.build {
            match (&build.context, &build.dockerfile_content) {
                (Some(context), _) => println!("  build: {context}"),
                (None, Some(_)) => println!("  build: inline Dockerfile"),
                (None, None) => {}
            }
        }
        if let Some(limit) = container.mem_limit {
            println!("  memory: {limit} bytes");
        }
        if !container.expose.is_empty() {
            println!("  expose: {}", container.expose.join(", "));
        }
        for volume in &container.volumes {
            println!("  volume: {volume}");
        }
        for (key, value) in &container.environment {
            println!("  env: {key}={value}");
        }
    }
}
