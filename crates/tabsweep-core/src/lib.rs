//! tabsweep-core: pure domain logic for stale-tab sweeping.
//! Age ledger, closing policy, workspace activation resolution, and the
//! typed settings model. No IO, no async.

pub mod activation;
pub mod ledger;
pub mod policy;
pub mod settings;
pub mod types;

pub use activation::{ToggleOutcome, apply_activate, apply_deactivate, is_active};
pub use ledger::AgeLedger;
pub use policy::{ClosePlan, TabGroup, plan_closures};
pub use settings::{SettingChange, Settings};
pub use types::{ActivationMode, GroupId, SettingKey, SweepError, TabEvent, TabId, WorkspaceId};
