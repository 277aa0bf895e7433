//! 场景树
//!
//! `Scene` 是实体与分组的竞技场：节点按句柄存放在两张表里，
//! 分组保存子节点的键→句柄映射，子节点保存父分组句柄（非所有权）。
//! 移除节点时从表中取出并清空父句柄，残留句柄只会查找失败。
//!
//! 结构变化以 [`SceneEvent`] 形式排队，由宿主通过 [`Scene::take_events`] 取走。

use crate::error::SceneError;
use crate::group::MapObjectGroup;
use crate::id::{split_path, ChildKey, GroupId, NodeRef, ObjectId};
use crate::math::Point2;
use crate::object::{DrawContext, MapObject, ObjectInfo};
use crate::patch::Patch;
use crate::payload::{Children, ObjectPayload, RemoveMessage, GROUP_TYPE};
use crate::shapes::{Shape, ShapeKind};
use crate::surface::{CoordinateTransform, DrawSurface};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::{debug, warn};

/// 场景结构事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    Added { uid: String },
    Removed { uid: String },
    RedrawRequested,
}

/// 场景
#[derive(Debug)]
pub struct Scene {
    root: GroupId,
    objects: HashMap<ObjectId, MapObject>,
    groups: HashMap<GroupId, MapObjectGroup>,
    events: Vec<SceneEvent>,
}

impl Scene {
    pub fn new(root_id: impl Into<String>) -> Self {
        let root = GroupId::next();
        let mut groups = HashMap::new();
        groups.insert(root, MapObjectGroup::new(root_id));
        Self {
            root,
            objects: HashMap::new(),
            groups,
            events: Vec::new(),
        }
    }

    // ========== 访问 ==========

    pub fn root(&self) -> GroupId {
        self.root
    }

    pub fn root_group(&self) -> &MapObjectGroup {
        // 根分组在场景生命周期内始终存在
        &self.groups[&self.root]
    }

    pub fn root_id(&self) -> &str {
        self.root_group().id()
    }

    pub fn object(&self, id: ObjectId) -> Option<&MapObject> {
        self.objects.get(&id)
    }

    pub fn group(&self, id: GroupId) -> Option<&MapObjectGroup> {
        self.groups.get(&id)
    }

    /// 已挂接的实体数量
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// 已挂接的分组数量（含根）
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// 路径限定的 uid：`<root>/<group>/.../<id>`
    pub fn uid_of(&self, node: NodeRef) -> Option<String> {
        let (id, mut parent) = match node {
            NodeRef::Object(oid) => {
                let o = self.objects.get(&oid)?;
                (o.id(), o.parent())
            }
            NodeRef::Group(gid) => {
                let g = self.groups.get(&gid)?;
                (g.id(), g.parent())
            }
        };

        let mut segments = vec![id];
        while let Some(gid) = parent {
            let Some(group) = self.groups.get(&gid) else {
                break;
            };
            segments.push(group.id());
            parent = group.parent();
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    // ========== 结构修改 ==========

    /// 添加实体；同级 id 已存在时记录警告并返回 None
    pub fn add_object(&mut self, parent: GroupId, object: MapObject) -> Option<ObjectId> {
        self.try_add_object(parent, object)
            .map_err(|err| warn!("Failed to add object: {}", err))
            .ok()
    }

    pub fn try_add_object(&mut self, parent: GroupId, mut object: MapObject) -> Result<ObjectId, SceneError> {
        let group = self.groups.get_mut(&parent).ok_or(SceneError::StaleHandle)?;
        if group.contains_key(object.id()) {
            return Err(SceneError::DuplicateId {
                id: object.id().to_string(),
                group: group.id().to_string(),
            });
        }

        let id = ObjectId::next();
        group.objects.insert(object.id().to_string(), id);
        object.parent = Some(parent);
        self.objects.insert(id, object);

        let uid = self.uid_of(NodeRef::Object(id)).unwrap_or_default();
        debug!(%uid, "Object added");
        self.events.push(SceneEvent::Added { uid });
        self.events.push(SceneEvent::RedrawRequested);
        Ok(id)
    }

    /// 添加空分组；同级 id 已存在时记录警告并返回 None
    pub fn add_group(&mut self, parent: GroupId, group: MapObjectGroup) -> Option<GroupId> {
        self.try_add_group(parent, group)
            .map_err(|err| warn!("Failed to add group: {}", err))
            .ok()
    }

    pub fn try_add_group(&mut self, parent: GroupId, mut group: MapObjectGroup) -> Result<GroupId, SceneError> {
        let owner = self.groups.get_mut(&parent).ok_or(SceneError::StaleHandle)?;
        if owner.contains_key(group.id()) {
            return Err(SceneError::DuplicateId {
                id: group.id().to_string(),
                group: owner.id().to_string(),
            });
        }

        let id = GroupId::next();
        owner.groups.insert(group.id().to_string(), id);
        group.parent = Some(parent);
        group.objects.clear();
        group.groups.clear();
        self.groups.insert(id, group);

        let uid = self.uid_of(NodeRef::Group(id)).unwrap_or_default();
        debug!(%uid, "Group added");
        self.events.push(SceneEvent::Added { uid });
        self.events.push(SceneEvent::RedrawRequested);
        Ok(id)
    }

    /// 从分组中移除实体（按句柄或键），返回被移除的实体
    ///
    /// 键不存在或实体不属于该分组时记录警告并返回 None。
    pub fn remove_object<'a>(
        &mut self,
        parent: GroupId,
        target: impl Into<ChildKey<'a, ObjectId>>,
    ) -> Option<MapObject> {
        self.try_remove_object(parent, target.into())
            .map_err(|err| warn!("Failed to remove object: {}", err))
            .ok()
    }

    fn try_remove_object(&mut self, parent: GroupId, target: ChildKey<'_, ObjectId>) -> Result<MapObject, SceneError> {
        let group = self.groups.get(&parent).ok_or(SceneError::StaleHandle)?;
        let id = match target {
            ChildKey::Key(key) => group.object(key).ok_or_else(|| SceneError::NotFound {
                id: key.to_string(),
                group: group.id().to_string(),
            })?,
            ChildKey::Handle(id) => {
                let object = self.objects.get(&id).ok_or(SceneError::StaleHandle)?;
                if object.parent() != Some(parent) {
                    return Err(SceneError::NotAChild {
                        id: object.id().to_string(),
                        group: group.id().to_string(),
                    });
                }
                id
            }
        };
        self.detach_object(id).ok_or(SceneError::StaleHandle)
    }

    /// 从分组中移除子分组（级联），返回被移除的分组
    pub fn remove_group<'a>(
        &mut self,
        parent: GroupId,
        target: impl Into<ChildKey<'a, GroupId>>,
    ) -> Option<MapObjectGroup> {
        self.try_remove_group(parent, target.into())
            .map_err(|err| warn!("Failed to remove group: {}", err))
            .ok()
    }

    fn try_remove_group(&mut self, parent: GroupId, target: ChildKey<'_, GroupId>) -> Result<MapObjectGroup, SceneError> {
        let group = self.groups.get(&parent).ok_or(SceneError::StaleHandle)?;
        let id = match target {
            ChildKey::Key(key) => group.group(key).ok_or_else(|| SceneError::NotFound {
                id: key.to_string(),
                group: group.id().to_string(),
            })?,
            ChildKey::Handle(id) => {
                let child = self.groups.get(&id).ok_or(SceneError::StaleHandle)?;
                if child.parent() != Some(parent) {
                    return Err(SceneError::NotAChild {
                        id: child.id().to_string(),
                        group: group.id().to_string(),
                    });
                }
                id
            }
        };
        self.detach_group(id).ok_or(SceneError::StaleHandle)
    }

    /// 实体自行移除并请求重绘；重复调用无效果
    pub fn remove_entity(&mut self, id: ObjectId) -> Option<MapObject> {
        let Some(object) = self.detach_object(id) else {
            debug!(?id, "Object already removed");
            return None;
        };
        self.events.push(SceneEvent::RedrawRequested);
        Some(object)
    }

    /// 分组自行移除（级联）并请求重绘；根分组不能移除，请使用 [`Scene::clear`]
    pub fn remove_group_node(&mut self, id: GroupId) -> Option<MapObjectGroup> {
        if id == self.root {
            warn!("Refusing to remove the root group, use clear() instead");
            return None;
        }
        let Some(group) = self.detach_group(id) else {
            debug!(?id, "Group already removed");
            return None;
        };
        self.events.push(SceneEvent::RedrawRequested);
        Some(group)
    }

    /// 移除根分组下的所有节点
    pub fn clear(&mut self) {
        let root = &self.groups[&self.root];
        let objects: Vec<ObjectId> = root.objects.values().copied().collect();
        let groups: Vec<GroupId> = root.groups.values().copied().collect();
        for id in objects {
            self.detach_object(id);
        }
        for id in groups {
            self.detach_group(id);
        }
        debug!("Scene cleared");
        self.events.push(SceneEvent::RedrawRequested);
    }

    /// 从父分组映射与实体表中摘除
    fn detach_object(&mut self, id: ObjectId) -> Option<MapObject> {
        let uid = self.uid_of(NodeRef::Object(id))?;
        let mut object = self.objects.remove(&id)?;
        if let Some(group) = object.parent.and_then(|gid| self.groups.get_mut(&gid)) {
            if group.objects.get(object.id()) == Some(&id) {
                group.objects.remove(object.id());
            }
        }
        object.parent = None;
        debug!(%uid, "Object removed");
        self.events.push(SceneEvent::Removed { uid });
        Some(object)
    }

    /// 先移除所有子实体，再递归移除子分组，最后从父分组中摘除
    fn detach_group(&mut self, id: GroupId) -> Option<MapObjectGroup> {
        let uid = self.uid_of(NodeRef::Group(id))?;
        let (objects, groups) = {
            let group = self.groups.get(&id)?;
            (
                group.objects.values().copied().collect::<Vec<_>>(),
                group.groups.values().copied().collect::<Vec<_>>(),
            )
        };
        for child in objects {
            self.detach_object(child);
        }
        for child in groups {
            self.detach_group(child);
        }

        let mut group = self.groups.remove(&id)?;
        if let Some(owner) = group.parent.and_then(|gid| self.groups.get_mut(&gid)) {
            if owner.groups.get(group.id()) == Some(&id) {
                owner.groups.remove(group.id());
            }
        }
        group.parent = None;
        debug!(%uid, "Group removed");
        self.events.push(SceneEvent::Removed { uid });
        Some(group)
    }

    // ========== 路径寻址 ==========

    /// 从分组出发按相对路径查找；失败时记录警告
    pub fn get_object_by_path(&self, from: GroupId, path: &str) -> Option<NodeRef> {
        self.lookup(from, path)
            .map_err(|err| warn!("Lookup failed: {}", err))
            .ok()
    }

    fn lookup(&self, from: GroupId, path: &str) -> Result<NodeRef, SceneError> {
        let (key, rest) = split_path(path);
        let unresolved = || SceneError::UnresolvedPath(path.to_string());
        if key.is_empty() {
            return Err(unresolved());
        }
        let group = self.groups.get(&from).ok_or(SceneError::StaleHandle)?;

        if let Some(id) = group.object(key) {
            return if rest.is_empty() {
                Ok(NodeRef::Object(id))
            } else {
                Err(unresolved())
            };
        }
        if let Some(id) = group.group(key) {
            return if rest.is_empty() {
                Ok(NodeRef::Group(id))
            } else {
                self.lookup(id, rest)
            };
        }
        Err(unresolved())
    }

    /// 从根查找，不记录日志；路径可以带根 id 前缀
    pub fn find_path(&self, path: &str) -> Option<NodeRef> {
        if let Ok(node) = self.lookup(self.root, path) {
            return Some(node);
        }
        let (first, rest) = split_path(path);
        if first != self.root_id() {
            return None;
        }
        if rest.is_empty() {
            Some(NodeRef::Group(self.root))
        } else {
            self.lookup(self.root, rest).ok()
        }
    }

    /// 从根查找；失败时记录警告
    pub fn resolve_path(&self, path: &str) -> Option<NodeRef> {
        let node = self.find_path(path);
        if node.is_none() {
            warn!("Lookup failed: {}", SceneError::UnresolvedPath(path.to_string()));
        }
        node
    }

    /// 分组及所有后代分组中的实体，以 uid 为键
    pub fn objects_of(&self, group: GroupId) -> BTreeMap<String, ObjectId> {
        let mut out = BTreeMap::new();
        self.collect_objects(group, &mut out);
        out
    }

    fn collect_objects(&self, group: GroupId, out: &mut BTreeMap<String, ObjectId>) {
        let Some(g) = self.groups.get(&group) else {
            return;
        };
        for &id in g.objects.values() {
            if let Some(uid) = self.uid_of(NodeRef::Object(id)) {
                out.insert(uid, id);
            }
        }
        for &child in g.groups.values() {
            self.collect_objects(child, out);
        }
    }

    // ========== 继承状态 ==========

    /// 父分组链全部可见；父句柄失效视为已脱离
    pub(crate) fn chain_visible(&self, mut parent: Option<GroupId>) -> bool {
        while let Some(gid) = parent {
            let Some(group) = self.groups.get(&gid) else {
                return true;
            };
            if !group.config.visible {
                return false;
            }
            parent = group.parent();
        }
        true
    }

    /// 父分组链中任一变暗
    pub(crate) fn chain_dimmed(&self, mut parent: Option<GroupId>) -> bool {
        while let Some(gid) = parent {
            let Some(group) = self.groups.get(&gid) else {
                return false;
            };
            if group.config.dim {
                return true;
            }
            parent = group.parent();
        }
        false
    }

    /// 有效可见性；句柄失效时为 false
    pub fn is_visible(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Object(id) => self
                .objects
                .get(&id)
                .is_some_and(|o| o.is_effectively_visible(self)),
            NodeRef::Group(id) => self
                .groups
                .get(&id)
                .is_some_and(|g| g.config.visible && self.chain_visible(g.parent())),
        }
    }

    /// 有效变暗状态；句柄失效时为 false
    pub fn is_dimmed(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Object(id) => self
                .objects
                .get(&id)
                .is_some_and(|o| o.is_effectively_dimmed(self)),
            NodeRef::Group(id) => self
                .groups
                .get(&id)
                .is_some_and(|g| g.config.dim || self.chain_dimmed(g.parent())),
        }
    }

    // ========== 更新 ==========

    /// 更新实体数据，或把分组补丁按子节点 id 分发
    pub fn update(&mut self, node: NodeRef, data: &Patch, now: Instant) -> bool {
        match node {
            NodeRef::Object(id) => match self.objects.get_mut(&id) {
                Some(object) => object.update(data, now),
                None => {
                    warn!("Update on removed object {:?}", id);
                    false
                }
            },
            NodeRef::Group(id) => self.update_group(id, data, now),
        }
    }

    /// 分组批量更新：键为相对路径，值为该节点的数据补丁
    pub fn update_group(&mut self, group: GroupId, data: &Patch, now: Instant) -> bool {
        let mut changed = false;
        for (path, value) in data {
            let Value::Object(patch) = value else {
                warn!(%path, "Ignoring non-object update entry");
                continue;
            };
            match self.get_object_by_path(group, path) {
                Some(node) => changed |= self.update(node, patch, now),
                None => continue,
            }
        }
        changed
    }

    pub fn update_config(&mut self, node: NodeRef, config: &Patch) -> bool {
        match node {
            NodeRef::Object(id) => self
                .objects
                .get_mut(&id)
                .is_some_and(|o| o.update_config(config)),
            NodeRef::Group(id) => self
                .groups
                .get_mut(&id)
                .is_some_and(|g| g.update_config(config)),
        }
    }

    pub fn set_visibility(&mut self, node: NodeRef, visible: bool) {
        match node {
            NodeRef::Object(id) => {
                if let Some(o) = self.objects.get_mut(&id) {
                    o.set_visibility(visible);
                }
            }
            NodeRef::Group(id) => {
                if let Some(g) = self.groups.get_mut(&id) {
                    g.set_visibility(visible);
                }
            }
        }
    }

    pub fn dim(&mut self, node: NodeRef, dim: bool) {
        match node {
            NodeRef::Object(id) => {
                if let Some(o) = self.objects.get_mut(&id) {
                    o.dim(dim);
                }
            }
            NodeRef::Group(id) => {
                if let Some(g) = self.groups.get_mut(&id) {
                    g.dim(dim);
                }
            }
        }
    }

    pub fn highlight(&mut self, node: NodeRef, highlight: bool) {
        match node {
            NodeRef::Object(id) => {
                if let Some(o) = self.objects.get_mut(&id) {
                    o.highlight(highlight);
                }
            }
            NodeRef::Group(id) => {
                if let Some(g) = self.groups.get_mut(&id) {
                    g.highlight(highlight);
                }
            }
        }
    }

    // ========== 消息 ==========

    /// 按添加消息构造实体或分组子树并插入；失败时场景保持原状
    pub fn handle_add_message(&mut self, parent: GroupId, payload: &ObjectPayload) -> Option<NodeRef> {
        self.try_handle_add(parent, payload)
            .map_err(|err| warn!("Ignoring add message for '{}': {}", payload.id, err))
            .ok()
    }

    pub fn try_handle_add(&mut self, parent: GroupId, payload: &ObjectPayload) -> Result<NodeRef, SceneError> {
        payload.validate()?;
        let owner = self.groups.get(&parent).ok_or(SceneError::StaleHandle)?;
        if owner.contains_key(payload.local_id()) {
            return Err(SceneError::DuplicateId {
                id: payload.local_id().to_string(),
                group: owner.id().to_string(),
            });
        }
        self.insert_payload(parent, payload)
    }

    fn insert_payload(&mut self, parent: GroupId, payload: &ObjectPayload) -> Result<NodeRef, SceneError> {
        let id = payload.local_id();
        if payload.is_group() {
            let mut group = MapObjectGroup::new(id);
            group.try_update_config(&payload.config)?;
            let gid = self.try_add_group(parent, group)?;
            for child in payload.children() {
                self.insert_payload(gid, child)?;
            }
            return Ok(NodeRef::Group(gid));
        }

        let kind = ShapeKind::from_type_name(&payload.kind)
            .ok_or_else(|| SceneError::UnknownType(payload.kind.clone()))?;
        let object = MapObject::from_payload(kind, id, payload)?;
        Ok(NodeRef::Object(self.try_add_object(parent, object)?))
    }

    /// 按移除消息移除子实体或子分组（级联）
    ///
    /// 多段 id 先解析为节点，只有其父分组正是 `parent` 时才移除。
    pub fn handle_remove_message(&mut self, parent: GroupId, message: &RemoveMessage) -> bool {
        let Some(group) = self.groups.get(&parent) else {
            warn!("Ignoring remove message for '{}': {}", message.id, SceneError::StaleHandle);
            return false;
        };
        let key = message.local_id();
        let target = if split_path(&message.id).1.is_empty() {
            group
                .object(key)
                .map(NodeRef::Object)
                .or_else(|| group.group(key).map(NodeRef::Group))
        } else {
            self.lookup(parent, &message.id)
                .ok()
                .or_else(|| self.find_path(&message.id))
        };
        let Some(target) = target else {
            warn!(
                "Ignoring remove message: {}",
                SceneError::NotFound {
                    id: message.id.clone(),
                    group: group.id().to_string(),
                }
            );
            return false;
        };
        if self.parent_of(target) != Some(parent) {
            warn!(
                "Ignoring remove message: {}",
                SceneError::NotAChild {
                    id: message.id.clone(),
                    group: group.id().to_string(),
                }
            );
            return false;
        }

        let removed = match target {
            NodeRef::Object(id) => self.remove_object(parent, id).is_some(),
            NodeRef::Group(id) => self.remove_group(parent, id).is_some(),
        };
        if removed {
            self.events.push(SceneEvent::RedrawRequested);
        }
        removed
    }

    fn parent_of(&self, node: NodeRef) -> Option<GroupId> {
        match node {
            NodeRef::Object(id) => self.objects.get(&id)?.parent(),
            NodeRef::Group(id) => self.groups.get(&id)?.parent(),
        }
    }

    // ========== 快照 ==========

    pub fn object_info(&self, id: ObjectId) -> Option<ObjectInfo> {
        let uid = self.uid_of(NodeRef::Object(id))?;
        let object = self.objects.get(&id)?;
        let mut info = object.info(uid);
        if let Shape::Line(line) = &object.shape {
            info.data = Value::Object(line.data.to_wire(self));
        }
        Some(info)
    }

    /// 可通过 `handle_add_message` 重新构造的完整描述
    pub fn payload(&self, node: NodeRef) -> Option<ObjectPayload> {
        let uid = self.uid_of(node)?;
        match node {
            NodeRef::Object(id) => {
                let object = self.objects.get(&id)?;
                let mut payload = object.payload(uid);
                if let Shape::Line(line) = &object.shape {
                    payload.data = line.data.to_wire(self);
                }
                Some(payload)
            }
            NodeRef::Group(id) => {
                let group = self.groups.get(&id)?;
                let config = match serde_json::to_value(&group.config) {
                    Ok(Value::Object(map)) => map,
                    _ => Patch::new(),
                };
                let objects = group
                    .objects
                    .iter()
                    .filter_map(|(k, &oid)| Some((k.clone(), self.payload(NodeRef::Object(oid))?)))
                    .collect();
                let groups = group
                    .groups
                    .iter()
                    .filter_map(|(k, &gid)| Some((k.clone(), self.payload(NodeRef::Group(gid))?)))
                    .collect();
                Some(ObjectPayload {
                    id: uid,
                    kind: GROUP_TYPE.to_string(),
                    config,
                    objects: Children::Map(objects),
                    groups: Children::Map(groups),
                    ..ObjectPayload::default()
                })
            }
        }
    }

    /// 线段当前解析出的端点
    pub fn line_endpoints(&self, id: ObjectId) -> Option<(Point2, Point2)> {
        match &self.objects.get(&id)?.shape {
            Shape::Line(line) => line.resolve(self),
            _ => None,
        }
    }

    // ========== 绘制 ==========

    /// 有效可见的实体，深度优先收集后按层稳定排序
    pub fn draw_order(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_visible(self.root, &mut out);
        out.sort_by_key(|id| self.objects.get(id).map_or(0, |o| o.config.layer));
        out
    }

    fn collect_visible(&self, group: GroupId, out: &mut Vec<ObjectId>) {
        let Some(g) = self.groups.get(&group) else {
            return;
        };
        if !g.config.visible {
            return;
        }
        out.extend(
            g.objects
                .values()
                .copied()
                .filter(|id| self.objects.get(id).is_some_and(|o| o.config.visible)),
        );
        for &child in g.groups.values() {
            self.collect_visible(child, out);
        }
    }

    /// 绘制整个场景：先绘制所有本体（含轨迹），再绘制所有标注
    pub fn draw(&self, transform: &dyn CoordinateTransform, surface: &mut dyn DrawSurface, now: Instant) {
        let ctx = DrawContext {
            scene: self,
            transform,
            now,
        };
        let order = self.draw_order();
        for id in &order {
            if let Some(object) = self.objects.get(id) {
                object.draw(&ctx, surface);
            }
        }
        for id in &order {
            if let Some(object) = self.objects.get(id) {
                object.draw_label(&ctx, surface);
            }
        }
    }

    // ========== 事件 ==========

    pub fn request_redraw(&mut self) {
        self.events.push(SceneEvent::RedrawRequested);
    }

    /// 取走积压的事件
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("map")
    }
}
