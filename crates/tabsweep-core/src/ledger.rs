//! Per-tab age counters.

use std::collections::{HashMap, HashSet};

use crate::types::TabId;

/// Mapping from tab identity to elapsed-age tick count.
///
/// The ledger is the sole owner of every counter's lifecycle: created at 0
/// on first observation, reset to 0 whenever the tab changes, incremented
/// once per tick, and deleted only when the host confirms the tab closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgeLedger {
    ages: HashMap<TabId, u64>,
}

impl AgeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the counter for `tab`, creating the entry if absent. Idempotent.
    pub fn reset(&mut self, tab: &TabId) {
        self.ages.insert(tab.clone(), 0);
    }

    /// Delete the entry for `tab`. No-op if absent.
    pub fn remove(&mut self, tab: &TabId) {
        self.ages.remove(tab);
    }

    /// Add one tick to every current entry.
    ///
    /// Never creates or removes entries: open/change observations are the
    /// only creation path and closure events the only deletion path.
    pub fn increment_all(&mut self) {
        for age in self.ages.values_mut() {
            *age = age.saturating_add(1);
        }
    }

    /// Current age of `tab`, or `None` when the ledger has never seen it
    /// (or the host already confirmed it closed).
    pub fn age_of(&self, tab: &TabId) -> Option<u64> {
        self.ages.get(tab).copied()
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    /// Entries for tabs not in the given open set.
    ///
    /// Drift is reconciled by explicit close events within one tick cycle;
    /// anything that shows up here for longer indicates a lost event and is
    /// worth a warning. Sorted for deterministic logs.
    pub fn orphans<'a, I>(&self, open: I) -> Vec<TabId>
    where
        I: IntoIterator<Item = &'a TabId>,
    {
        let open: HashSet<&TabId> = open.into_iter().collect();
        let mut orphaned: Vec<TabId> = self
            .ages
            .keys()
            .filter(|tab| !open.contains(tab))
            .cloned()
            .collect();
        orphaned.sort();
        orphaned
    }
}

// ─── Tests ────────────────────────────────────────────────────────
