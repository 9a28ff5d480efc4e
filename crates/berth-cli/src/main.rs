mod commands;

use berth_core::RuntimeConfig;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::start::Publish;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "berth",
    version,
    about = "Workspace runtime provisioning and server readiness"
)]
struct Cli {
    /// Runtime configuration file (default: ~/.config/berth/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create and provision a workspace environment and print its containers.
    Provision {
        /// Workspace TOML file with identity, recipe and machines.
        workspace: PathBuf,
    },
    /// Start a workspace on the mock backend and wait for its servers.
    Start {
        /// Workspace TOML file with identity, recipe and machines.
        workspace: PathBuf,
        /// Publish a container port: machine=port:host_port.
        #[arg(long = "publish", short = 'p')]
        publish: Vec<Publish>,
    },
    /// Check readiness of servers of a machine.
    Check {
        /// Machine name used in messages.
        machine: String,
        /// Servers as ref=url.
        #[arg(required = true)]
        servers: Vec<String>,
    },
    /// Print the workspace-scoped name of a volume.
    VolumeName {
        workspace_id: String,
        origin: String,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BERTH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_ref()).and_then(|config| {
        let json = cli.json;
        match cli.command {
            Commands::Provision { workspace } => commands::provision::run(&config, &workspace, json),
            Commands::Start { workspace, publish } => {
                commands::start::run(&config, &workspace, &publish, json)
            }
            Commands::Check { machine, servers } => {
                commands::check::run(&config, &machine, &servers, json)
            }
            Commands::VolumeName {
                workspace_id,
                origin,
            } => commands::volume_name::run(&workspace_id, &origin, json),
            Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(commands::exit_code_for(&msg))
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<RuntimeConfig, String> {
    match path {
        Some(path) => RuntimeConfig::load(path),
        None => RuntimeConfig::load_default(),
    }
    .map_err(|e| e.to_string())
}
