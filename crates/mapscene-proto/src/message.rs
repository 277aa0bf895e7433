//! 消息格式
//!
//! 每条消息是一个带 `type` 标签的 JSON 对象：
//!
//! ```json
//! {"type": "add", "parent": "map", "payload": {"id": "p1", "type": "point"}}
//! {"type": "remove", "parent": "map", "id": "map/p1"}
//! {"type": "update", "data": {"map/p1": {"x": 1.0, "y": 2.0}}}
//! {"type": "set", "data": {"map/p1": {"color": [0, 1, 0, 1]}}}
//! ```
//!
//! `set` 也接受 `update_config` 作为类型名。

use crate::error::ProtoError;
use mapscene_core::patch::Patch;
use mapscene_core::payload::ObjectPayload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// uid → 补丁
pub type PatchMap = BTreeMap<String, Patch>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneMessage {
    /// 在 `parent`（缺省为根）下添加实体或分组子树
    Add {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<String>,
        payload: ObjectPayload,
    },
    /// 移除 `id`；未给出 `parent` 时取目标的实际父分组
    Remove {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<String>,
        id: String,
    },
    /// 数据更新。目标是分组时，补丁的键是相对路径
    Update { data: PatchMap },
    /// 配置更新
    #[serde(alias = "update_config")]
    Set { data: PatchMap },
}

impl SceneMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            SceneMessage::Add { .. } => "add",
            SceneMessage::Remove { .. } => "remove",
            SceneMessage::Update { .. } => "update",
            SceneMessage::Set { .. } => "set",
        }
    }
}

pub fn decode(text: &str) -> Result<SceneMessage, ProtoError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode(message: &SceneMessage) -> Result<String, ProtoError> {
    Ok(serde_json::to_string(message)?)
}
