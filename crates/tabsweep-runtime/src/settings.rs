//! JSON-file-backed settings store.
//!
//! The persistence boundary for the four sweep settings. Every write goes
//! through [`SettingsStore::set`] (by enumerated key), is persisted
//! immediately, and yields a [`SettingChange`] notification the server
//! forwards to the engine.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use serde_json::json;

use tabsweep_core::settings::{SettingChange, Settings};
use tabsweep_core::types::{ActivationMode, SettingKey, WorkspaceId};

pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("malformed settings file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("cannot read settings file {}", path.display()));
            }
        };
        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read one setting as JSON. The override lists come out as ordered
    /// sequences (order-insensitive semantics, BTreeSet order on the wire).
    pub fn get(&self, key: SettingKey) -> serde_json::Value {
        match key {
            SettingKey::ActivationMode => json!(self.settings.activation_mode),
            SettingKey::ExcludedWorkspaces => json!(self.settings.excluded_workspaces),
            SettingKey::IncludedWorkspaces => json!(self.settings.included_workspaces),
            SettingKey::CloseThresholdMinutes => json!(self.settings.close_threshold_minutes),
        }
    }

    /// Write one setting from JSON, persist, and emit the change notice.
    pub fn set(
        &mut self,
        key: SettingKey,
        value: serde_json::Value,
    ) -> anyhow::Result<SettingChange> {
        match key {
            SettingKey::ActivationMode => {
                self.settings.activation_mode = parse_value::<ActivationMode>(key, value)?;
            }
            SettingKey::ExcludedWorkspaces => {
                // Ordered sequence on the wire, set semantics in memory.
                let list = parse_value::<Vec<WorkspaceId>>(key, value)?;
                self.settings.excluded_workspaces = list.into_iter().collect::<BTreeSet<_>>();
            }
            SettingKey::IncludedWorkspaces => {
                let list = parse_value::<Vec<WorkspaceId>>(key, value)?;
                self.settings.included_workspaces = list.into_iter().collect::<BTreeSet<_>>();
            }
            SettingKey::CloseThresholdMinutes => {
                self.settings.close_threshold_minutes = parse_value::<u64>(key, value)?;
            }
        }
        self.persist()?;
        Ok(SettingChange {
            key,
            changed_at: Utc::now(),
        })
    }

    /// Replace the whole snapshot (write-through after an engine toggle).
    pub fn replace(&mut self, settings: Settings) -> anyhow::Result<()> {
        self.settings = settings;
        self.persist()
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create settings dir {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.settings)?;
        // Write to a sibling temp file first; the rename is atomic on the
        // same filesystem, so readers never observe a torn file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)
            .with_context(|| format!("cannot write settings file {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("cannot replace settings file {}", self.path.display()))?;
        Ok(())
    }
}

fn parse_value<T: serde::de::DeserializeOwned>(
    key: SettingKey,
    value: serde_json::Value,
) -> anyhow::Result<T> {
    serde_json::from_value(value).map_err(|e| {
        tabsweep_core::types::SweepError::InvalidSettingValue {
            key,
            detail: e.to_string(),
        }
        .into()
    })
}

// ─── Tests ────────────────────────────────────────────────────────
