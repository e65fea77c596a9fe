//! Workspace activation resolution.

use crate::settings::Settings;
use crate::types::{ActivationMode, WorkspaceId};

/// Outcome of an activate/deactivate request for the current workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// An override list was updated.
    Changed,
    /// The override lists already reflected the requested state.
    AlreadySet,
    /// No permanent workspace identifier — nothing was mutated and the
    /// caller must surface a user-visible notice.
    NoWorkspace,
}

/// Decide whether sweeping is active in the given workspace context.
///
/// Re-evaluated on demand, never cached:
///
/// | mode             | identifier | result               |
/// |------------------|------------|----------------------|
/// | default-active   | absent     | true                 |
/// | default-active   | present    | true unless excluded |
/// | default-inactive | absent     | false                |
/// | default-inactive | present    | true iff included    |
pub fn is_active(settings: &Settings, workspace: Option<&WorkspaceId>) -> bool {
    match (settings.activation_mode, workspace) {
        (ActivationMode::DefaultActive, None) => true,
        (ActivationMode::DefaultActive, Some(ws)) => !settings.excluded_workspaces.contains(ws),
        (ActivationMode::DefaultInactive, None) => false,
        (ActivationMode::DefaultInactive, Some(ws)) => settings.included_workspaces.contains(ws),
    }
}

/// Make the current workspace active, mutating the list the mode consults.
pub fn apply_activate(settings: &mut Settings, workspace: Option<&WorkspaceId>) -> ToggleOutcome {
    let Some(ws) = workspace else {
        return ToggleOutcome::NoWorkspace;
    };
    let changed = match settings.activation_mode {
        ActivationMode::DefaultActive => settings.excluded_workspaces.remove(ws),
        ActivationMode::DefaultInactive => settings.included_workspaces.insert(ws.clone()),
    };
    if changed {
        ToggleOutcome::Changed
    } else {
        ToggleOutcome::AlreadySet
    }
}

/// Make the current workspace inactive, mutating the list the mode consults.
pub fn apply_deactivate(settings: &mut Settings, workspace: Option<&WorkspaceId>) -> ToggleOutcome {
    let Some(ws) = workspace else {
        return ToggleOutcome::NoWorkspace;
    };
    let changed = match settings.activation_mode {
        ActivationMode::DefaultActive => settings.excluded_workspaces.insert(ws.clone()),
        ActivationMode::DefaultInactive => settings.included_workspaces.remove(ws),
    };
    if changed {
        ToggleOutcome::Changed
    } else {
        ToggleOutcome::AlreadySet
    }
}

// ─── Tests ────────────────────────────────────────────────────────
