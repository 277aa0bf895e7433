//! 协议错误定义

use mapscene_core::error::SceneError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown parent group: {0}")]
    UnknownParent(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}
