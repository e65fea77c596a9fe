//! Error types for the editor boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("failed to parse feed line {line_num}: {detail}")]
    Parse { line_num: usize, detail: String },

    #[error("failed to encode editor command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("editor io error: {0}")]
    Io(#[from] std::io::Error),
}
