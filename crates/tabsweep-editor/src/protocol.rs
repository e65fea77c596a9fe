//! Wire protocol between the daemon and the editor-side adapter.
//!
//! Newline-delimited JSON in both directions over one long-lived socket
//! connection: the adapter pushes [`FeedMessage`] notices in, the daemon
//! pushes [`EditorCommand`] lines out.

use serde::{Deserialize, Serialize};

use tabsweep_core::types::{GroupId, TabId};

use crate::error::EditorError;

/// A newly opened tab and the group it landed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedTab {
    pub tab: TabId,
    pub group: GroupId,
}

/// Inbound notice from the editor adapter.
///
/// Identities arrive in whatever batches the host chooses to deliver;
/// the feed layer fans them out into per-tab events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedMessage {
    TabsOpened {
        tabs: Vec<OpenedTab>,
    },
    TabsChanged {
        tabs: Vec<TabId>,
    },
    TabsClosed {
        tabs: Vec<TabId>,
    },
    WorkspaceChanged {
        #[serde(default)]
        workspace_file: Option<String>,
        #[serde(default)]
        folders: Vec<String>,
    },
}

/// Outbound command to the editor adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
    /// Close the listed tabs in one batched host call. Individual
    /// rejections (e.g. an unsaved-changes prompt) are tolerated host-side;
    /// the daemon learns the real outcome from subsequent `tabs_closed`
    /// notices, never from this request.
    CloseTabs { tabs: Vec<TabId> },
    /// Boolean flag the host conditions UI affordances on.
    PublishActive { active: bool },
    /// User-visible notice (e.g. a toggle requested in an unsaved context).
    ShowNotice { message: String },
}

/// Render a command as one wire line (no trailing newline).
pub fn encode_command(command: &EditorCommand) -> Result<String, EditorError> {
    Ok(serde_json::to_string(command)?)
}

// ─── Tests ────────────────────────────────────────────────────────
