//! Event-driven sweep engine.
//!
//! Single-threaded, deterministic. No IO or async. The runtime feeds it
//! host events, setting changes, and timer ticks; it owns the age ledger,
//! the open-tab table, and the published active-in-workspace flag.
//!
//! Ordering discipline, not locking discipline: per tick, `increment_all`
//! runs to completion before any closing evaluation, and the caller never
//! interleaves ticks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tabsweep_core::activation::{ToggleOutcome, apply_activate, apply_deactivate, is_active};
use tabsweep_core::ledger::AgeLedger;
use tabsweep_core::policy::{ClosePlan, TabGroup, plan_closures};
use tabsweep_core::settings::Settings;
use tabsweep_core::types::{GroupId, SettingKey, TabEvent, TabId, WorkspaceId};

/// Monotonic version counter for active-flag change tracking.
pub type FlagVersion = u64;

/// Why the published flag was recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    Startup,
    Setting(SettingKey),
    Workspace,
    Toggle,
}

/// One recorded publication of the active-in-workspace flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagChange {
    pub version: FlagVersion,
    pub active: bool,
    pub reason: ChangeReason,
    pub timestamp: DateTime<Utc>,
}

/// Result of applying a batch of tab events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyResult {
    /// Counters zeroed (tab opened or changed).
    pub resets: usize,
    /// Close confirmations processed.
    pub removals: usize,
    /// Workspace re-resolutions.
    pub workspace_changes: usize,
}

/// Result of one timer tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Entries incremented before evaluation.
    pub incremented: usize,
    /// Whether the workspace resolved active for this tick.
    pub active: bool,
    /// Close plan for this tick; empty when inactive.
    pub plan: ClosePlan,
    /// Ledger entries for tabs the host no longer reports open.
    pub orphaned: Vec<TabId>,
}

/// In-memory sweep engine.
#[derive(Debug)]
pub struct SweepEngine {
    ledger: AgeLedger,
    settings: Settings,
    tick_interval_minutes: u64,
    workspace: Option<WorkspaceId>,
    /// Open tabs in first-seen order — the stable tie-break order for the
    /// closing policy's spared survivor.
    open: Vec<(TabId, GroupId)>,
    active: bool,
    version: FlagVersion,
    changes: Vec<FlagChange>,
}

impl SweepEngine {
    /// Create an engine and record the startup flag evaluation.
    pub fn new(settings: Settings, tick_interval_minutes: u64, now: DateTime<Utc>) -> Self {
        let mut engine = Self {
            ledger: AgeLedger::new(),
            settings,
            tick_interval_minutes: tick_interval_minutes.max(1),
            workspace: None,
            open: Vec::new(),
            active: false,
            version: 0,
            changes: Vec::new(),
        };
        engine.active = is_active(&engine.settings, engine.workspace.as_ref());
        engine.record_change(ChangeReason::Startup, now);
        engine
    }

    // ── Event application ────────────────────────────────────────

    /// Apply a batch of host events. Each identity is independent; order
    /// within the batch is preserved.
    pub fn apply_events(&mut self, events: &[TabEvent], now: DateTime<Utc>) -> ApplyResult {
        let mut result = ApplyResult::default();
        for event in events {
            match event {
                TabEvent::Opened { tab, group, .. } => {
                    self.ledger.reset(tab);
                    match self.open.iter_mut().find(|(t, _)| t == tab) {
                        // Re-announced tab: adopt the latest group.
                        Some(slot) => slot.1 = group.clone(),
                        None => self.open.push((tab.clone(), group.clone())),
                    }
                    result.resets += 1;
                }
                TabEvent::Changed { tab, .. } => {
                    self.ledger.reset(tab);
                    result.resets += 1;
                }
                TabEvent::Closed { tab, .. } => {
                    // Benign if the ledger never saw the tab.
                    self.ledger.remove(tab);
                    self.open.retain(|(t, _)| t != tab);
                    result.removals += 1;
                }
                TabEvent::WorkspaceChanged {
                    workspace_file,
                    folders,
                    ..
                } => {
                    self.set_workspace(workspace_file.as_deref(), folders, now);
                    result.workspace_changes += 1;
                }
            }
        }
        result
    }

    /// Re-resolve the workspace identity and recompute the flag.
    pub fn set_workspace(
        &mut self,
        workspace_file: Option<&str>,
        folders: &[String],
        now: DateTime<Utc>,
    ) {
        self.workspace = WorkspaceId::resolve(workspace_file, folders);
        self.refresh_flag(ChangeReason::Workspace, now);
    }

    // ── Tick ─────────────────────────────────────────────────────

    /// One timer tick: age every counter, then — only when the workspace
    /// resolves active — evaluate the closing policy over the open set.
    pub fn tick(&mut self, _now: DateTime<Utc>) -> TickOutcome {
        self.ledger.increment_all();
        let incremented = self.ledger.len();

        let active = is_active(&self.settings, self.workspace.as_ref());
        let plan = if active {
            let threshold = self.settings.threshold_ticks(self.tick_interval_minutes);
            plan_closures(threshold, &self.ledger, &self.groups())
        } else {
            ClosePlan::default()
        };

        let orphaned = self.ledger.orphans(self.open.iter().map(|(t, _)| t));

        TickOutcome {
            incremented,
            active,
            plan,
            orphaned,
        }
    }

    /// Manual sweep: threshold forced to 0, regardless of the configured
    /// threshold or the activation flag (an explicit user action). Ages are
    /// read as-is; manual sweeps do not tick the counters.
    pub fn sweep_now(&mut self, _now: DateTime<Utc>) -> ClosePlan {
        plan_closures(0, &self.ledger, &self.groups())
    }

    // ── Activation commands ──────────────────────────────────────

    /// Activate sweeping in the current workspace.
    pub fn activate(&mut self, now: DateTime<Utc>) -> ToggleOutcome {
        let outcome = apply_activate(&mut self.settings, self.workspace.as_ref());
        if outcome != ToggleOutcome::NoWorkspace {
            self.refresh_flag(ChangeReason::Toggle, now);
        }
        outcome
    }

    /// Deactivate sweeping in the current workspace.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> ToggleOutcome {
        let outcome = apply_deactivate(&mut self.settings, self.workspace.as_ref());
        if outcome != ToggleOutcome::NoWorkspace {
            self.refresh_flag(ChangeReason::Toggle, now);
        }
        outcome
    }

    // ── Settings ─────────────────────────────────────────────────

    /// Adopt a new settings snapshot after a store write.
    ///
    /// Idempotent: re-delivery of the same snapshot records no flag change,
    /// so rapid toggles and self-notifications cannot corrupt anything.
    pub fn apply_setting_change(&mut self, settings: Settings, key: SettingKey, now: DateTime<Utc>) {
        self.settings = settings;
        if key.affects_activation() {
            self.refresh_flag(ChangeReason::Setting(key), now);
        }
    }

    // ── Read accessors ───────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn workspace(&self) -> Option<&WorkspaceId> {
        self.workspace.as_ref()
    }

    pub fn version(&self) -> FlagVersion {
        self.version
    }

    /// Flag changes after `since`, oldest first.
    pub fn changes_since(&self, since: FlagVersion) -> Vec<FlagChange> {
        self.changes
            .iter()
            .filter(|c| c.version > since)
            .cloned()
            .collect()
    }

    pub fn age_of(&self, tab: &TabId) -> Option<u64> {
        self.ledger.age_of(tab)
    }

    /// Open tabs with their groups and current ages, first-seen order.
    pub fn open_tabs(&self) -> Vec<(TabId, GroupId, u64)> {
        self.open
            .iter()
            .map(|(tab, group)| {
                (
                    tab.clone(),
                    group.clone(),
                    self.ledger.age_of(tab).unwrap_or(0),
                )
            })
            .collect()
    }

    pub fn tracked_len(&self) -> usize {
        self.ledger.len()
    }

    // ── Internals ────────────────────────────────────────────────

    /// Rebuild the group view from the open table. Group order follows the
    /// first tab seen in each group; tabs keep first-seen order within.
    fn groups(&self) -> Vec<TabGroup> {
        let mut groups: Vec<TabGroup> = Vec::new();
        for (tab, group) in &self.open {
            match groups.iter_mut().find(|g| g.group == *group) {
                Some(g) => g.tabs.push(tab.clone()),
                None => groups.push(TabGroup {
                    group: group.clone(),
                    tabs: vec![tab.clone()],
                }),
            }
        }
        groups
    }

    /// Recompute the published flag, recording a change on transitions.
    fn refresh_flag(&mut self, reason: ChangeReason, now: DateTime<Utc>) {
        let next = is_active(&self.settings, self.workspace.as_ref());
        if next != self.active {
            self.active = next;
            self.record_change(reason, now);
        }
    }

    fn record_change(&mut self, reason: ChangeReason, now: DateTime<Utc>) {
        self.version += 1;
        self.changes.push(FlagChange {
            version: self.version,
            active: self.active,
            reason,
            timestamp: now,
        });
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tabsweep_core::types::ActivationMode;

    fn tab(id: &str) -> TabId {
        TabId::from(id)
    }

    fn opened(id: &str, group: &str, at: DateTime<Utc>) -> TabEvent {
        TabEvent::Opened {
            tab: tab(id),
            group: GroupId::from(group),
            observed_at: at,
        }
    }

    fn changed(id: &str, at: DateTime<Utc>) -> TabEvent {
        TabEvent::Changed {
            tab: tab(id),
            observed_at: at,
        }
    }

    fn closed(id: &str, at: DateTime<Utc>) -> TabEvent {
        TabEvent::Closed {
            tab: tab(id),
            observed_at: at,
        }
    }

    fn workspace_event(file: Option<&str>, folders: &[&str], at: DateTime<Utc>) -> TabEvent {
        TabEvent::WorkspaceChanged {
            workspace_file: file.map(str::to_owned),
            folders: folders.iter().map(|f| (*f).to_owned()).collect(),
            observed_at: at,
        }
    }

    fn engine_with(settings: Settings) -> SweepEngine {
        SweepEngine::new(settings, 1, Utc::now())
    }

    fn default_engine() -> SweepEngine {
        engine_with(Settings::default())
    }

    // ── Event application ───────────────────────────────────────

    #[test]
    fn opened_creates_counter_at_zero() {
        let mut engine = default_engine();
        let now = Utc::now();
        let result = engine.apply_events(&[opened("a", "g1", now)], now);
        assert_eq!(result.resets, 1);
        assert_eq!(engine.age_of(&tab("a")), Some(0));
        assert_eq!(engine.open_tabs().len(), 1);
    }

    #[test]
    fn changed_resets_counter() {
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now)], now);
        engine.tick(now);
        engine.tick(now);
        assert_eq!(engine.age_of(&tab("a")), Some(2));

        engine.apply_events(&[changed("a", now)], now);
        assert_eq!(engine.age_of(&tab("a")), Some(0));
    }

    #[test]
    fn closed_removes_counter_and_open_entry() {
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now), opened("b", "g1", now)], now);
        let result = engine.apply_events(&[closed("a", now)], now);
        assert_eq!(result.removals, 1);
        assert_eq!(engine.age_of(&tab("a")), None);
        assert_eq!(engine.open_tabs().len(), 1);
    }

    #[test]
    fn closed_for_unknown_tab_is_benign() {
        let mut engine = default_engine();
        let now = Utc::now();
        let result = engine.apply_events(&[closed("ghost", now)], now);
        assert_eq!(result.removals, 1);
        assert_eq!(engine.tracked_len(), 0);
    }

    #[test]
    fn changed_before_opened_creates_orphan_entry() {
        // The host saw the tab before we learned of it: benign, but the
        // entry shows up as drift until an open or close reconciles it.
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[changed("early", now)], now);
        let outcome = engine.tick(now);
        assert_eq!(outcome.orphaned, vec![tab("early")]);
    }

    // ── Tick ────────────────────────────────────────────────────

    #[test]
    fn thirty_minute_threshold_closes_only_the_stale_tab() {
        // threshold=30min, tick=1min; one tab last changed 31 ticks ago,
        // another 5 ticks ago. After the next tick the first closes, the
        // second remains, and both counters reflect +1 before evaluation.
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[opened("old", "g1", now), opened("young", "g1", now)], now);

        for i in 0..31 {
            if i == 26 {
                // "young" last changed 5 ticks before the evaluation tick.
                engine.apply_events(&[changed("young", now)], now);
            }
            engine.tick(now);
        }
        assert_eq!(engine.age_of(&tab("old")), Some(31));
        assert_eq!(engine.age_of(&tab("young")), Some(5));

        let outcome = engine.tick(now);
        assert_eq!(outcome.plan.close, vec![tab("old")]);
        assert_eq!(engine.age_of(&tab("old")), Some(32), "+1 before evaluation");
        assert_eq!(engine.age_of(&tab("young")), Some(6));
    }

    #[test]
    fn tick_increments_but_never_closes_when_inactive() {
        let settings = Settings {
            activation_mode: ActivationMode::DefaultInactive,
            close_threshold_minutes: 0,
            ..Default::default()
        };
        let mut engine = engine_with(settings);
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now), opened("b", "g1", now)], now);

        let outcome = engine.tick(now);
        assert!(!outcome.active);
        assert!(outcome.plan.is_empty(), "closing is gated on activation");
        assert_eq!(engine.age_of(&tab("a")), Some(1), "aging is not gated");
    }

    #[test]
    fn unconfirmed_close_keeps_aging_and_is_retried() {
        let settings = Settings {
            close_threshold_minutes: 2,
            ..Default::default()
        };
        let mut engine = engine_with(settings);
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now), opened("b", "g1", now)], now);
        engine.tick(now);
        engine.apply_events(&[changed("b", now)], now);

        let first = engine.tick(now); // a=2, b=1
        assert_eq!(first.plan.close, vec![tab("a")]);

        // No `closed` confirmation arrives (host rejected the close):
        // the counter is intact and the next tick selects the tab again.
        let second = engine.tick(now); // a=3, b=2
        assert_eq!(second.plan.close, vec![tab("a")]);
        assert_eq!(engine.age_of(&tab("a")), Some(3));
    }

    #[test]
    fn confirmed_close_stops_selection() {
        let settings = Settings {
            close_threshold_minutes: 2,
            ..Default::default()
        };
        let mut engine = engine_with(settings);
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now), opened("b", "g1", now)], now);
        engine.tick(now);
        engine.apply_events(&[changed("b", now)], now);
        let outcome = engine.tick(now); // a=2, b=1
        assert_eq!(outcome.plan.close, vec![tab("a")]);

        engine.apply_events(&[closed("a", now)], now);
        let after = engine.tick(now);
        assert!(after.plan.is_empty());
        assert_eq!(engine.age_of(&tab("a")), None);
    }

    // ── Manual sweep ────────────────────────────────────────────

    #[test]
    fn sweep_now_closes_all_but_youngest() {
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now), opened("b", "g1", now)], now);
        engine.tick(now);
        engine.apply_events(&[opened("c", "g2", now)], now); // a=1, b=1, c=0

        let plan = engine.sweep_now(now);
        assert_eq!(plan.spared, Some(tab("c")));
        assert_eq!(plan.close.len(), 2);
    }

    #[test]
    fn sweep_now_runs_even_when_inactive() {
        let settings = Settings {
            activation_mode: ActivationMode::DefaultInactive,
            ..Default::default()
        };
        let mut engine = engine_with(settings);
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now), opened("b", "g1", now)], now);
        engine.tick(now);

        assert!(!engine.is_active());
        let plan = engine.sweep_now(now);
        assert_eq!(plan.close.len(), 1, "explicit command ignores the gate");
    }

    // ── Activation & flag publication ───────────────────────────

    #[test]
    fn startup_records_initial_flag() {
        let engine = default_engine();
        assert!(engine.is_active());
        let changes = engine.changes_since(0);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].version, 1);
        assert_eq!(changes[0].reason, ChangeReason::Startup);
        assert!(changes[0].active);
    }

    #[test]
    fn deactivate_flips_flag_and_bumps_version() {
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[workspace_event(None, &["file:///proj"], now)], now);
        assert!(engine.is_active());

        let outcome = engine.deactivate(now);
        assert_eq!(outcome, ToggleOutcome::Changed);
        assert!(!engine.is_active());

        let changes = engine.changes_since(1);
        assert_eq!(changes.last().map(|c| c.reason), Some(ChangeReason::Toggle));
        assert_eq!(changes.last().map(|c| c.active), Some(false));
    }

    #[test]
    fn toggle_without_workspace_reports_no_workspace() {
        let mut engine = default_engine();
        let now = Utc::now();
        let version_before = engine.version();

        assert_eq!(engine.activate(now), ToggleOutcome::NoWorkspace);
        assert_eq!(engine.deactivate(now), ToggleOutcome::NoWorkspace);
        assert_eq!(engine.version(), version_before, "no flag churn");
        assert!(engine.settings().excluded_workspaces.is_empty());
        assert!(engine.settings().included_workspaces.is_empty());
    }

    #[test]
    fn workspace_change_recomputes_flag() {
        let settings = Settings {
            excluded_workspaces: BTreeSet::from([WorkspaceId::from("file:///banned")]),
            ..Default::default()
        };
        let mut engine = engine_with(settings);
        let now = Utc::now();
        assert!(engine.is_active());

        engine.apply_events(&[workspace_event(None, &["file:///banned"], now)], now);
        assert!(!engine.is_active());
        assert_eq!(
            engine.changes_since(1).last().map(|c| c.reason),
            Some(ChangeReason::Workspace)
        );

        engine.apply_events(&[workspace_event(None, &["file:///other"], now)], now);
        assert!(engine.is_active());
    }

    #[test]
    fn setting_change_distinguishable_by_key() {
        let mut engine = default_engine();
        let now = Utc::now();

        let mut next = engine.settings().clone();
        next.activation_mode = ActivationMode::DefaultInactive;
        engine.apply_setting_change(next, SettingKey::ActivationMode, now);

        assert!(!engine.is_active());
        assert_eq!(
            engine.changes_since(1).last().map(|c| c.reason),
            Some(ChangeReason::Setting(SettingKey::ActivationMode))
        );
    }

    #[test]
    fn threshold_change_does_not_touch_flag() {
        let mut engine = default_engine();
        let now = Utc::now();
        let version_before = engine.version();

        let mut next = engine.settings().clone();
        next.close_threshold_minutes = 5;
        engine.apply_setting_change(next, SettingKey::CloseThresholdMinutes, now);

        assert_eq!(engine.version(), version_before);
        assert_eq!(engine.settings().close_threshold_minutes, 5);
    }

    #[test]
    fn redundant_setting_redelivery_is_idempotent() {
        let mut engine = default_engine();
        let now = Utc::now();
        let snapshot = engine.settings().clone();
        let version_before = engine.version();

        engine.apply_setting_change(snapshot.clone(), SettingKey::ExcludedWorkspaces, now);
        engine.apply_setting_change(snapshot, SettingKey::ExcludedWorkspaces, now);
        assert_eq!(engine.version(), version_before, "no transition, no change");
    }

    #[test]
    fn flag_versions_are_monotonic() {
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[workspace_event(None, &["file:///p"], now)], now);
        engine.deactivate(now);
        engine.activate(now);

        let changes = engine.changes_since(0);
        for pair in changes.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
        assert_eq!(engine.changes_since(engine.version()).len(), 0);
    }

    // ── Group view ──────────────────────────────────────────────

    #[test]
    fn reopened_tab_adopts_latest_group() {
        let mut engine = default_engine();
        let now = Utc::now();
        engine.apply_events(&[opened("a", "g1", now)], now);
        engine.apply_events(&[opened("a", "g2", now)], now);

        let tabs = engine.open_tabs();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].1, GroupId::from("g2"));
    }
}
