//! Typed settings model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivationMode, SettingKey, WorkspaceId};

/// Default close threshold in minutes.
pub const DEFAULT_CLOSE_THRESHOLD_MINUTES: u64 = 30;

/// Persisted settings snapshot.
///
/// The excluded list is consulted only under default-active; the included
/// list only under default-inactive. Both are sets: explicit per-workspace
/// toggles are the only mutation path and duplicates never accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub activation_mode: ActivationMode,
    pub excluded_workspaces: BTreeSet<WorkspaceId>,
    pub included_workspaces: BTreeSet<WorkspaceId>,
    pub close_threshold_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            activation_mode: ActivationMode::DefaultActive,
            excluded_workspaces: BTreeSet::new(),
            included_workspaces: BTreeSet::new(),
            close_threshold_minutes: DEFAULT_CLOSE_THRESHOLD_MINUTES,
        }
    }
}

impl Settings {
    /// Convert the configured threshold from minutes to tick counts.
    ///
    /// The tick interval is clamped to at least one minute and rounding is
    /// up, so a coarser tick never closes earlier than configured.
    pub fn threshold_ticks(&self, tick_interval_minutes: u64) -> u64 {
        self.close_threshold_minutes
            .div_ceil(tick_interval_minutes.max(1))
    }
}

/// Notification emitted for every settings write, distinguishable by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingChange {
    pub key: SettingKey,
    pub changed_at: DateTime<Utc>,
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.activation_mode, ActivationMode::DefaultActive);
        assert!(settings.excluded_workspaces.is_empty());
        assert!(settings.included_workspaces.is_empty());
        assert_eq!(
            settings.close_threshold_minutes,
            DEFAULT_CLOSE_THRESHOLD_MINUTES
        );
    }

    #[test]
    fn threshold_ticks_one_minute_interval() {
        let settings = Settings {
            close_threshold_minutes: 30,
            ..Default::default()
        };
        assert_eq!(settings.threshold_ticks(1), 30);
    }

    #[test]
    fn threshold_ticks_rounds_up() {
        let settings = Settings {
            close_threshold_minutes: 31,
            ..Default::default()
        };
        assert_eq!(settings.threshold_ticks(5), 7);
    }

    #[test]
    fn threshold_ticks_zero_threshold() {
        let settings = Settings {
            close_threshold_minutes: 0,
            ..Default::default()
        };
        assert_eq!(settings.threshold_ticks(1), 0);
        assert_eq!(settings.threshold_ticks(10), 0);
    }

    #[test]
    fn threshold_ticks_clamps_zero_interval() {
        let settings = Settings {
            close_threshold_minutes: 10,
            ..Default::default()
        };
        assert_eq!(settings.threshold_ticks(0), 10);
    }

    #[test]
    fn serde_roundtrip_preserves_lists() {
        let mut settings = Settings::default();
        settings
            .excluded_workspaces
            .insert(WorkspaceId::from("file:///w1"));
        settings
            .included_workspaces
            .insert(WorkspaceId::from("file:///w2"));

        let json = serde_json::to_string(&settings).expect("serialize");
        let back: Settings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(settings, back);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let back: Settings =
            serde_json::from_str(r#"{"activation_mode":"default-inactive"}"#).expect("deserialize");
        assert_eq!(back.activation_mode, ActivationMode::DefaultInactive);
        assert_eq!(
            back.close_threshold_minutes,
            DEFAULT_CLOSE_THRESHOLD_MINUTES
        );
    }
}
