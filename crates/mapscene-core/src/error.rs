//! 场景操作错误定义
//!
//! 这些错误都可在本地恢复：对外的操作记录警告后返回 `None`/`false`，
//! 场景树保持原状。

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Unknown object type: {0}")]
    UnknownType(String),

    #[error("Id '{id}' already exists in group '{group}'")]
    DuplicateId { id: String, group: String },

    #[error("'{id}' not found in group '{group}'")]
    NotFound { id: String, group: String },

    #[error("'{id}' does not belong to group '{group}'")]
    NotAChild { id: String, group: String },

    #[error("Could not resolve path '{0}'")]
    UnresolvedPath(String),

    #[error("Stale handle: node no longer exists")]
    StaleHandle,

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    #[error("Payload for '{id}' is missing required field '{field}'")]
    MissingField { id: String, field: &'static str },
}

impl From<serde_json::Error> for SceneError {
    fn from(err: serde_json::Error) -> Self {
        SceneError::InvalidPatch(err.to_string())
    }
}
