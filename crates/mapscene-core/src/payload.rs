//! 添加/移除消息体
//!
//! 添加消息描述一个实体或一棵分组子树：
//!
//! ```json
//! {"id": "robots", "type": "group", "config": {"name": "Robots"},
//!  "objects": {"r1": {"id": "r1", "type": "agent", "data": {"x": 1, "y": 2, "psi": 0}}}}
//! ```
//!
//! 子节点可以是以 id 为键的对象，也可以是列表；`id` 可以是完整 uid，
//! 只取最后一段作为本地键。

use crate::error::SceneError;
use crate::id::last_segment;
use crate::patch::Patch;
use crate::shapes::ShapeKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 分组的类型名
pub const GROUP_TYPE: &str = "group";

/// 子节点集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Children {
    List(Vec<ObjectPayload>),
    Map(BTreeMap<String, ObjectPayload>),
}

impl Default for Children {
    fn default() -> Self {
        Children::List(Vec::new())
    }
}

impl Children {
    pub fn is_empty(&self) -> bool {
        match self {
            Children::List(v) => v.is_empty(),
            Children::Map(m) => m.is_empty(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &ObjectPayload> + '_> {
        match self {
            Children::List(v) => Box::new(v.iter()),
            Children::Map(m) => Box::new(m.values()),
        }
    }
}

/// 添加消息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: Patch,
    #[serde(default)]
    pub data: Patch,
    #[serde(default, skip_serializing_if = "Children::is_empty")]
    pub objects: Children,
    #[serde(default, skip_serializing_if = "Children::is_empty")]
    pub groups: Children,
    /// 不区分类型的子节点
    #[serde(default, skip_serializing_if = "Children::is_empty")]
    pub items: Children,
}

impl ObjectPayload {
    /// 本地键（uid 的最后一段）
    pub fn local_id(&self) -> &str {
        last_segment(&self.id)
    }

    pub fn is_group(&self) -> bool {
        self.kind == GROUP_TYPE
    }

    /// 所有子节点：先实体，再分组，最后不区分类型的部分
    pub fn children(&self) -> impl Iterator<Item = &ObjectPayload> {
        self.objects
            .iter()
            .chain(self.groups.iter())
            .chain(self.items.iter())
    }

    /// 整棵子树的结构检查：类型已知、id 非空、同级 id 不重复、线段端点齐全
    ///
    /// 在修改场景之前调用，保证失败时场景保持原状。
    pub fn validate(&self) -> Result<(), SceneError> {
        let id = self.local_id();
        if id.is_empty() {
            return Err(SceneError::MissingField {
                id: self.id.clone(),
                field: "id",
            });
        }

        if !self.is_group() {
            let kind = ShapeKind::from_type_name(&self.kind)
                .ok_or_else(|| SceneError::UnknownType(self.kind.clone()))?;
            if kind == ShapeKind::Line {
                for field in ["start", "end"] {
                    if !self.data.contains_key(field) {
                        return Err(SceneError::MissingField {
                            id: id.to_string(),
                            field,
                        });
                    }
                }
            }
            return Ok(());
        }

        let mut seen = HashSet::new();
        for child in self.children() {
            if !seen.insert(child.local_id()) {
                return Err(SceneError::DuplicateId {
                    id: child.local_id().to_string(),
                    group: id.to_string(),
                });
            }
            child.validate()?;
        }
        Ok(())
    }
}

/// 移除消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveMessage {
    /// 本地 id 或完整 uid
    pub id: String,
}

impl RemoveMessage {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn local_id(&self) -> &str {
        last_segment(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_children_as_map_or_list() {
        let as_map: ObjectPayload = serde_json::from_value(json!({
            "id": "g", "type": "group",
            "objects": {"p1": {"id": "p1", "type": "point"}}
        }))
        .unwrap();
        let as_list: ObjectPayload = serde_json::from_value(json!({
            "id": "g", "type": "group",
            "objects": [{"id": "p1", "type": "point"}]
        }))
        .unwrap();

        assert_eq!(as_map.children().count(), 1);
        assert_eq!(as_list.children().count(), 1);
        assert!(as_map.validate().is_ok());
    }

    #[test]
    fn test_uid_reduced_to_local_id() {
        let p: ObjectPayload =
            serde_json::from_value(json!({"id": "map/robots/r1", "type": "agent"})).unwrap();
        assert_eq!(p.local_id(), "r1");
        assert_eq!(RemoveMessage::new("/map/robots/r1/").local_id(), "r1");
    }

    #[test]
    fn test_validate_rejects_unknown_nested_type() {
        let p: ObjectPayload = serde_json::from_value(json!({
            "id": "g", "type": "group",
            "items": [{"id": "ok", "type": "point"}, {"id": "bad", "type": "hexagon"}]
        }))
        .unwrap();
        assert_eq!(
            p.validate(),
            Err(SceneError::UnknownType("hexagon".into()))
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_siblings() {
        let p: ObjectPayload = serde_json::from_value(json!({
            "id": "g", "type": "group",
            "objects": [{"id": "a", "type": "point"}],
            "groups": [{"id": "a", "type": "group"}]
        }))
        .unwrap();
        assert!(matches!(p.validate(), Err(SceneError::DuplicateId { .. })));
    }
}
