//! tabsweep-editor: editor IO boundary.
//! Wire protocol for the editor-side adapter, feed-line parsing, and
//! translation of batched notices into per-tab events. No business logic.

pub mod error;
pub mod feed;
pub mod protocol;

pub use error::EditorError;
pub use feed::{parse_feed_line, translate};
pub use protocol::{EditorCommand, FeedMessage, OpenedTab, encode_command};
