//! 场景分组
//!
//! 分组只保存子节点的键→句柄映射，节点本体存放在 [`Scene`](crate::scene::Scene) 中。

use crate::error::SceneError;
use crate::id::{GroupId, ObjectId};
use crate::patch::{merge_patch, Patch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    pub visible: bool,
    pub dim: bool,
    pub highlight: bool,
    /// 是否在场景面板中列出
    pub show_in_table: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            visible: true,
            dim: false,
            highlight: false,
            show_in_table: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapObjectGroup {
    id: String,
    pub(crate) parent: Option<GroupId>,
    pub config: GroupConfig,
    pub(crate) objects: BTreeMap<String, ObjectId>,
    pub(crate) groups: BTreeMap<String, GroupId>,
}

impl MapObjectGroup {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            config: GroupConfig {
                name: id.clone(),
                ..GroupConfig::default()
            },
            id,
            parent: None,
            objects: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// 直接子实体
    pub fn objects(&self) -> &BTreeMap<String, ObjectId> {
        &self.objects
    }

    /// 直接子分组
    pub fn groups(&self) -> &BTreeMap<String, GroupId> {
        &self.groups
    }

    pub fn object(&self, key: &str) -> Option<ObjectId> {
        self.objects.get(key).copied()
    }

    pub fn group(&self, key: &str) -> Option<GroupId> {
        self.groups.get(key).copied()
    }

    /// 键是否已被实体或子分组占用
    pub fn contains_key(&self, key: &str) -> bool {
        self.objects.contains_key(key) || self.groups.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.groups.is_empty()
    }

    pub fn update_config(&mut self, config: &Patch) -> bool {
        match self.try_update_config(config) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(group = %self.id, "Ignoring config update: {}", err);
                false
            }
        }
    }

    pub fn try_update_config(&mut self, config: &Patch) -> Result<bool, SceneError> {
        let outcome = merge_patch(&mut self.config, config)?;
        if !outcome.unknown.is_empty() {
            debug!(group = %self.id, unknown = ?outcome.unknown, "Ignoring unknown config keys");
        }
        Ok(outcome.changed)
    }

    pub fn set_visibility(&mut self, visible: bool) {
        self.config.visible = visible;
    }

    pub fn dim(&mut self, dim: bool) {
        self.config.dim = dim;
    }

    pub fn highlight(&mut self, highlight: bool) {
        self.config.highlight = highlight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::patch_from_value;
    use serde_json::json;

    #[test]
    fn test_group_defaults() {
        let g = MapObjectGroup::new("robots");
        assert_eq!(g.config.name, "robots");
        assert!(g.config.visible);
        assert!(g.config.show_in_table);
        assert!(g.is_empty());
    }

    #[test]
    fn test_group_config_patch() {
        let mut g = MapObjectGroup::new("robots");
        assert!(g.update_config(&patch_from_value(json!({"name": "Robots", "dim": true, "zzz": 1}))));
        assert_eq!(g.config.name, "Robots");
        assert!(g.config.dim);
        assert!(!g.update_config(&patch_from_value(json!({"visible": "no"}))));
        assert!(g.config.visible);
    }
}
