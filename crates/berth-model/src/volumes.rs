//! Workspace-scoped volume names.
//!
//! `matches` is a prefix check: volumes of workspace `ws1` also match
//! workspace id `ws`. Callers must not infer the origin name from it, and
//! workspace ids are assumed not to be prefixes of one another.

/// Physical volume name for a logical volume of a workspace.
pub fn generate(workspace_id: &str, origin_name: &str) -> String {
    format!("{workspace_id}_{origin_name}")
}

/// Whether the volume was generated for the workspace.
pub fn matches(volume_name: &str, workspace_id: &str) -> bool {
    volume_name
        .strip_prefix(workspace_id)
        .is_some_and(|rest| rest.starts_with('_'))
}

/// Whether the volume is exactly the one generated for `origin_name`.
pub fn matches_origin(volume_name: &str, origin_name: &str, workspace_id: &str) -> bool {
    volume_name
        .strip_prefix(workspace_id)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| rest == origin_name)
}
