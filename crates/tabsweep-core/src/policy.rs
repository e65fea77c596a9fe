//! Stale-tab selection.

use std::collections::HashSet;

use crate::ledger::AgeLedger;
use crate::types::{GroupId, TabId};

/// One host tab group and the tabs it currently holds, in host order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabGroup {
    pub group: GroupId,
    pub tabs: Vec<TabId>,
}

/// Result of one closing evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosePlan {
    /// Tabs to request closing for, in stable selection order.
    pub close: Vec<TabId>,
    /// Tab spared from an otherwise-total close so one surface stays open.
    pub spared: Option<TabId>,
}

impl ClosePlan {
    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

/// Select the tabs whose age has reached `threshold_ticks`.
///
/// Pure function: reads ages, never mutates the ledger. The survivor
/// guarantee is global, not per-group — if every open tab qualifies, the
/// single tab with the smallest age (first encountered on ties) is spared
/// so the editor is never left with zero tabs.
///
/// A tab with no ledger entry counts as age 0. A threshold of 0 selects
/// everything except the spared survivor; the manual sweep command uses it
/// regardless of the configured automatic threshold.
pub fn plan_closures(threshold_ticks: u64, ledger: &AgeLedger, groups: &[TabGroup]) -> ClosePlan {
    // Step 1: union of open tabs across all groups, first occurrence wins.
    let mut open: Vec<&TabId> = Vec::new();
    let mut seen: HashSet<&TabId> = HashSet::new();
    for group in groups {
        for tab in &group.tabs {
            if seen.insert(tab) {
                open.push(tab);
            }
        }
    }

    if open.is_empty() {
        return ClosePlan::default();
    }

    let age = |tab: &TabId| ledger.age_of(tab).unwrap_or(0);

    // Step 2: candidates at or past the threshold.
    let candidates: Vec<&TabId> = open
        .iter()
        .copied()
        .filter(|&tab| age(tab) >= threshold_ticks)
        .collect();

    // Step 3: spare the youngest when closing all candidates would leave
    // zero tabs open. `min_by_key` keeps the first of equal elements, which
    // is the required tie-break.
    let spared = if candidates.len() == open.len() {
        open.iter().copied().min_by_key(|&tab| age(tab)).cloned()
    } else {
        None
    };

    // Step 4: everything that qualified, minus the survivor.
    let close: Vec<TabId> = candidates
        .into_iter()
        .filter(|&tab| spared.as_ref() != Some(tab))
        .cloned()
        .collect();

    ClosePlan { close, spared }
}

// ─── Tests ────────────────────────────────────────────────────────
