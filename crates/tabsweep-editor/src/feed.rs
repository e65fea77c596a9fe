//! Feed-line parsing and notice → event translation.

use chrono::{DateTime, Utc};

use tabsweep_core::types::TabEvent;

use crate::error::EditorError;
use crate::protocol::FeedMessage;

/// Parse one NDJSON feed line. `line_num` is 1-based, for error reporting.
pub fn parse_feed_line(line: &str, line_num: usize) -> Result<FeedMessage, EditorError> {
    serde_json::from_str(line.trim()).map_err(|e| EditorError::Parse {
        line_num,
        detail: e.to_string(),
    })
}

/// Fan a batched notice out into independent per-tab events.
///
/// The engine contract is one identity per event; hosts batch arbitrarily.
pub fn translate(message: FeedMessage, observed_at: DateTime<Utc>) -> Vec<TabEvent> {
    match message {
        FeedMessage::TabsOpened { tabs } => tabs
            .into_iter()
            .map(|t| TabEvent::Opened {
                tab: t.tab,
                group: t.group,
                observed_at,
            })
            .collect(),
        FeedMessage::TabsChanged { tabs } => tabs
            .into_iter()
            .map(|tab| TabEvent::Changed { tab, observed_at })
            .collect(),
        FeedMessage::TabsClosed { tabs } => tabs
            .into_iter()
            .map(|tab| TabEvent::Closed { tab, observed_at })
            .collect(),
        FeedMessage::WorkspaceChanged {
            workspace_file,
            folders,
        } => vec![TabEvent::WorkspaceChanged {
            workspace_file,
            folders,
            observed_at,
        }],
    }
}

// ─── Tests ────────────────────────────────────────────────────────
