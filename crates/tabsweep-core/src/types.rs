use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Tab & Group Identity ─────────────────────────────────────────

/// Stable identity of one open tab within its window session.
///
/// Derived from the host-assigned tab handle — never from the title, which
/// is mutable and non-unique. Stays constant across `changed` events for
/// the same tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Host-level tab group (split pane). Closing operates on the union of
/// tabs across all groups, never per group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ─── Workspace Identity ───────────────────────────────────────────

/// Normalized, stable identifier for a workspace context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the permanent identifier for the current context.
    ///
    /// A workspace file wins over folders; a sole open folder stands in
    /// when no workspace file exists. Anything else (no folders, multiple
    /// folders without a workspace file) has no permanent identifier and
    /// can never match an override list.
    pub fn resolve(workspace_file: Option<&str>, folders: &[String]) -> Option<Self> {
        if let Some(file) = workspace_file {
            let trimmed = file.trim();
            if !trimmed.is_empty() {
                return Some(Self(trimmed.to_owned()));
            }
        }
        match folders {
            [only] if !only.trim().is_empty() => Some(Self(only.trim().to_owned())),
            _ => None,
        }
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ─── Activation Mode ──────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationMode {
    /// Every workspace sweeps unless explicitly excluded.
    #[default]
    DefaultActive,
    /// No workspace sweeps unless explicitly included.
    DefaultInactive,
}

impl ActivationMode {
    pub const ALL: [Self; 2] = [Self::DefaultActive, Self::DefaultInactive];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DefaultActive => "default-active",
            Self::DefaultInactive => "default-inactive",
        }
    }
}

impl fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationMode {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default-active" => Ok(Self::DefaultActive),
            "default-inactive" => Ok(Self::DefaultInactive),
            _ => Err(SweepError::UnknownMode(s.to_owned())),
        }
    }
}

// ─── Setting Keys ─────────────────────────────────────────────────

/// Enumerated key for the four persisted settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    ActivationMode,
    ExcludedWorkspaces,
    IncludedWorkspaces,
    CloseThresholdMinutes,
}

impl SettingKey {
    pub const ALL: [Self; 4] = [
        Self::ActivationMode,
        Self::ExcludedWorkspaces,
        Self::IncludedWorkspaces,
        Self::CloseThresholdMinutes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActivationMode => "activation_mode",
            Self::ExcludedWorkspaces => "excluded_workspaces",
            Self::IncludedWorkspaces => "included_workspaces",
            Self::CloseThresholdMinutes => "close_threshold_minutes",
        }
    }

    /// Whether a change to this setting can flip the published active flag.
    pub fn affects_activation(self) -> bool {
        !matches!(self, Self::CloseThresholdMinutes)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activation_mode" => Ok(Self::ActivationMode),
            "excluded_workspaces" => Ok(Self::ExcludedWorkspaces),
            "included_workspaces" => Ok(Self::IncludedWorkspaces),
            "close_threshold_minutes" => Ok(Self::CloseThresholdMinutes),
            _ => Err(SweepError::UnknownSettingKey(s.to_owned())),
        }
    }
}

// ─── Events ───────────────────────────────────────────────────────

/// Tab lifecycle event from the host editor feed.
///
/// Hosts may deliver identities in arbitrary batches; the feed layer fans
/// batches out so every event here names exactly one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TabEvent {
    Opened {
        tab: TabId,
        group: GroupId,
        observed_at: DateTime<Utc>,
    },
    Changed {
        tab: TabId,
        observed_at: DateTime<Utc>,
    },
    Closed {
        tab: TabId,
        observed_at: DateTime<Utc>,
    },
    WorkspaceChanged {
        workspace_file: Option<String>,
        folders: Vec<String>,
        observed_at: DateTime<Utc>,
    },
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    UnknownMode(String),
    UnknownSettingKey(String),
    InvalidSettingValue { key: SettingKey, detail: String },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMode(mode) => write!(f, "unknown activation mode: {mode}"),
            Self::UnknownSettingKey(key) => write!(f, "unknown setting key: {key}"),
            Self::InvalidSettingValue { key, detail } => {
                write!(f, "invalid value for {key}: {detail}")
            }
        }
    }
}

impl std::error::Error for SweepError {}

// ─── Tests ────────────────────────────────────────────────────────
