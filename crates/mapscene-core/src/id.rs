//! 场景节点标识
//!
//! 实体和分组在 `Scene` 竞技场中以句柄寻址。句柄由全局计数器生成，
//! 永不复用，因此移除后残留的句柄只会查找失败，不会指向新节点。

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// 全局节点ID生成器
static NODE_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_raw() -> u64 {
    NODE_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// 实体句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub(crate) fn next() -> Self {
        Self(next_raw())
    }
}

/// 分组句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl GroupId {
    pub(crate) fn next() -> Self {
        Self(next_raw())
    }
}

/// 路径查找的结果：实体或分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Object(ObjectId),
    Group(GroupId),
}

impl NodeRef {
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            NodeRef::Object(id) => Some(*id),
            NodeRef::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<GroupId> {
        match self {
            NodeRef::Group(id) => Some(*id),
            NodeRef::Object(_) => None,
        }
    }
}

impl From<ObjectId> for NodeRef {
    fn from(id: ObjectId) -> Self {
        NodeRef::Object(id)
    }
}

impl From<GroupId> for NodeRef {
    fn from(id: GroupId) -> Self {
        NodeRef::Group(id)
    }
}

/// 移除操作的目标：句柄或分组内的键
#[derive(Debug, Clone, Copy)]
pub enum ChildKey<'a, H> {
    Handle(H),
    Key(&'a str),
}

impl From<ObjectId> for ChildKey<'_, ObjectId> {
    fn from(handle: ObjectId) -> Self {
        ChildKey::Handle(handle)
    }
}

impl From<GroupId> for ChildKey<'_, GroupId> {
    fn from(handle: GroupId) -> Self {
        ChildKey::Handle(handle)
    }
}

impl<'a> From<&'a str> for ChildKey<'a, ObjectId> {
    fn from(key: &'a str) -> Self {
        ChildKey::Key(key)
    }
}

impl<'a> From<&'a str> for ChildKey<'a, GroupId> {
    fn from(key: &'a str) -> Self {
        ChildKey::Key(key)
    }
}

/// 拆分路径的第一段，忽略首尾的 `/`
///
/// `"a/b/c"` → `("a", "b/c")`，`"a"` → `("a", "")`，`""` → `("", "")`。
pub fn split_path(path: &str) -> (&str, &str) {
    let path = path.trim_matches('/');
    match path.split_once('/') {
        Some((first, rest)) => (first, rest),
        None => (path, ""),
    }
}

/// 取路径最后一段作为本地ID
pub fn last_segment(path: &str) -> &str {
    let path = path.trim_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        let g = GroupId::next();
        assert_ne!(a, b);
        assert_ne!(a.0, g.0);
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a/b/c"), ("a", "b/c"));
        assert_eq!(split_path("/a/"), ("a", ""));
        assert_eq!(split_path(""), ("", ""));
        assert_eq!(last_segment("map/agents/a1"), "a1");
        assert_eq!(last_segment("p1"), "p1");
    }
}
