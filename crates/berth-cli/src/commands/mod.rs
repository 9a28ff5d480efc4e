pub mod check;
pub mod completions;
pub mod provision;
pub mod start;
pub mod volume_name;

use berth_core::RuntimeError;
use berth_model::MachineStatus;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_VALIDATION_ERROR: u8 = 2;
pub const EXIT_INFRASTRUCTURE_ERROR: u8 = 3;

pub const VALIDATION_PREFIX: &str = "validation error:";
pub const INFRASTRUCTURE_PREFIX: &str = "infrastructure error:";

/// Exit code for an error message produced by `describe`.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with(VALIDATION_PREFIX) {
        EXIT_VALIDATION_ERROR
    } else if msg.starts_with(INFRASTRUCTURE_PREFIX) {
        EXIT_INFRASTRUCTURE_ERROR
    } else {
        EXIT_FAILURE
    }
}

pub fn describe(err: &RuntimeError) -> String {
    match err {
        RuntimeError::Validation(e) => format!("{VALIDATION_PREFIX} {e}"),
        RuntimeError::Infrastructure(e) => format!("{INFRASTRUCTURE_PREFIX} {e}"),
        other => other.to_string(),
    }
}

/// Workspace description read by `provision` and `start`.
#[derive(Debug, Deserialize)]
pub struct WorkspaceFile {
    pub identity: berth_model::RuntimeIdentity,
    pub recipe: berth_model::InternalRecipe,
    #[serde(default)]
    pub machines: BTreeMap<String, berth_model::InternalMachineConfig>,
}

impl WorkspaceFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read workspace file {}: {e}", path.display()))?;
        toml::from_str(&content).map_err(|e| {
            format!(
                "{VALIDATION_PREFIX} failed to parse workspace file {}: {e}",
                path.display()
            )
        })
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_status(status: MachineStatus) -> String {
    use console::Style;
    let text = status.to_string();
    match status {
        MachineStatus::Running => Style::new().green().bold().apply_to(text).to_string(),
        MachineStatus::Starting => Style::new().yellow().apply_to(text).to_string(),
        MachineStatus::Stopped => Style::new().dim().apply_to(text).to_string(),
        MachineStatus::Failed => Style::new().red().bold().apply_to(text).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_model::{InfrastructureError, ValidationError};

    #[test]
    fn json_pretty_serializes_string() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn error_categories_map_to_exit_codes() {
        let validation = describe(&RuntimeError::from(ValidationError::new("bad")));
        assert_eq!(validation, "validation error: bad");
        assert_eq!(exit_code_for(&validation), EXIT_VALIDATION_ERROR);

        let infra = describe(&RuntimeError::from(InfrastructureError::new("down")));
        assert_eq!(exit_code_for(&infra), EXIT_INFRASTRUCTURE_ERROR);

        assert_eq!(exit_code_for("failed to read workspace file x"), EXIT_FAILURE);
    }

    #[test]
    fn workspace_file_parses_identity_recipe_and_machines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.toml");
        std::fs::write(
            &path,
            r#"
[identity]
workspace_id = "ws1"
env_name = "default"
owner = "alice"

[recipe]
type = "dockerimage"
content = "eclipse/ubuntu_jdk8"

[machines.dev.servers.wsagent]
port = "4401/tcp"
protocol = "http"
path = "/api"
"#,
        )
        .unwrap();

        let workspace = WorkspaceFile::load(&path).unwrap();
        assert_eq!(workspace.identity.workspace_id, "ws1");
        assert_eq!(workspace.recipe.recipe_type, "dockerimage");
        assert_eq!(workspace.machines["dev"].servers["wsagent"].port, "4401/tcp");
    }

    #[test]
    fn unparsable_workspace_file_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.toml");
        std::fs::write(&path, "identity = 3").unwrap();
        let err = WorkspaceFile::load(&path).unwrap_err();
        assert_eq!(exit_code_for(&err), EXIT_VALIDATION_ERROR);
    }
}
