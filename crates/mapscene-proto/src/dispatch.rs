//! 消息分发
//!
//! 按 uid 把消息路由到场景中的分组或实体。路径解析失败的条目被跳过并记录警告，
//! 同一条消息中的其他条目照常处理。

use crate::error::ProtoError;
use crate::message::{decode, PatchMap, SceneMessage};
use mapscene_core::id::{GroupId, NodeRef};
use mapscene_core::payload::{ObjectPayload, RemoveMessage};
use mapscene_core::scene::Scene;
use std::time::Instant;
use tracing::{trace, warn};

/// 一条消息的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    Added(NodeRef),
    Removed,
    /// `applied` 为实际发生变化的节点数，`skipped` 为无法解析的 uid 数
    Updated { applied: usize, skipped: usize },
}

/// 消息分发器
#[derive(Debug, Default)]
pub struct Dispatcher {
    received: u64,
    failed: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已处理的消息数
    pub fn received(&self) -> u64 {
        self.received
    }

    /// 处理失败的消息数
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// 解码并处理一条文本消息
    pub fn apply_text(&mut self, scene: &mut Scene, text: &str, now: Instant) -> Result<Dispatched, ProtoError> {
        let message = decode(text).inspect_err(|_| {
            self.received += 1;
            self.failed += 1;
        })?;
        self.apply(scene, message, now)
    }

    pub fn apply(&mut self, scene: &mut Scene, message: SceneMessage, now: Instant) -> Result<Dispatched, ProtoError> {
        self.received += 1;
        trace!(kind = message.type_name(), "Dispatching message");
        let result = match message {
            SceneMessage::Add { parent, payload } => add(scene, parent.as_deref(), &payload),
            SceneMessage::Remove { parent, id } => remove(scene, parent.as_deref(), &id),
            SceneMessage::Update { data } => Ok(update(scene, &data, now)),
            SceneMessage::Set { data } => Ok(set(scene, &data)),
        };
        if result.is_err() {
            self.failed += 1;
        }
        result
    }
}

fn parent_group(scene: &Scene, parent: Option<&str>) -> Result<GroupId, ProtoError> {
    let Some(uid) = parent else {
        return Ok(scene.root());
    };
    scene
        .find_path(uid)
        .and_then(|node| node.as_group())
        .ok_or_else(|| ProtoError::UnknownParent(uid.to_string()))
}

fn add(scene: &mut Scene, parent: Option<&str>, payload: &ObjectPayload) -> Result<Dispatched, ProtoError> {
    let gid = parent_group(scene, parent)?;
    let node = scene.try_handle_add(gid, payload)?;
    Ok(Dispatched::Added(node))
}

fn remove(scene: &mut Scene, parent: Option<&str>, id: &str) -> Result<Dispatched, ProtoError> {
    let gid = match parent {
        Some(_) => parent_group(scene, parent)?,
        None => {
            let owner = scene.find_path(id).and_then(|node| match node {
                NodeRef::Object(oid) => scene.object(oid).and_then(|o| o.parent()),
                NodeRef::Group(gid) => scene.group(gid).and_then(|g| g.parent()),
            });
            owner.ok_or_else(|| ProtoError::UnknownTarget(id.to_string()))?
        }
    };
    if scene.handle_remove_message(gid, &RemoveMessage::new(id)) {
        Ok(Dispatched::Removed)
    } else {
        Err(ProtoError::UnknownTarget(id.to_string()))
    }
}

fn update(scene: &mut Scene, data: &PatchMap, now: Instant) -> Dispatched {
    let (mut applied, mut skipped) = (0, 0);
    for (uid, patch) in data {
        match scene.resolve_path(uid) {
            Some(node) => {
                if scene.update(node, patch, now) {
                    applied += 1;
                }
            }
            None => skipped += 1,
        }
    }
    Dispatched::Updated { applied, skipped }
}

fn set(scene: &mut Scene, data: &PatchMap) -> Dispatched {
    let (mut applied, mut skipped) = (0, 0);
    for (uid, patch) in data {
        match scene.resolve_path(uid) {
            Some(node) => {
                if scene.update_config(node, patch) {
                    applied += 1;
                }
            }
            None => {
                warn!(%uid, "Config update for unknown node");
                skipped += 1;
            }
        }
    }
    Dispatched::Updated { applied, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscene_core::scene::SceneEvent;

    fn apply(dispatcher: &mut Dispatcher, scene: &mut Scene, text: &str) -> Result<Dispatched, ProtoError> {
        dispatcher.apply_text(scene, text, Instant::now())
    }

    fn scene_with_robots() -> (Scene, Dispatcher) {
        let mut scene = Scene::new("map");
        let mut dispatcher = Dispatcher::new();
        apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "add", "parent": "map", "payload": {
                "id": "map/robots", "type": "group",
                "objects": {"r1": {"id": "map/robots/r1", "type": "agent", "data": {"x": 1, "y": 1, "psi": 0}}}
            }}"#,
        )
        .unwrap();
        (scene, dispatcher)
    }

    #[test]
    fn test_add_under_nested_parent() {
        let (mut scene, mut dispatcher) = scene_with_robots();
        let result = apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "add", "parent": "map/robots", "payload": {"id": "r2", "type": "point"}}"#,
        )
        .unwrap();

        assert!(matches!(result, Dispatched::Added(NodeRef::Object(_))));
        assert!(scene.find_path("robots/r2").is_some());
        assert_eq!(dispatcher.received(), 2);
    }

    #[test]
    fn test_add_to_unknown_parent_fails() {
        let (mut scene, mut dispatcher) = scene_with_robots();
        let err = apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "add", "parent": "map/nowhere", "payload": {"id": "x", "type": "point"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProtoError::UnknownParent(_)));
        assert_eq!(dispatcher.failed(), 1);
    }

    #[test]
    fn test_update_routes_by_uid() {
        let (mut scene, mut dispatcher) = scene_with_robots();
        let result = apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "update", "data": {
                "map/robots/r1": {"x": 2.0, "y": 3.0},
                "map/ghost": {"x": 1.0}
            }}"#,
        )
        .unwrap();

        assert_eq!(result, Dispatched::Updated { applied: 1, skipped: 1 });
        let id = scene.find_path("robots/r1").and_then(|n| n.as_object()).unwrap();
        let p = scene.object(id).unwrap().position().unwrap();
        assert_eq!((p.x, p.y), (2.0, 3.0));
    }

    #[test]
    fn test_group_update_uses_relative_paths() {
        let (mut scene, mut dispatcher) = scene_with_robots();
        apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "update", "data": {"map/robots": {"r1": {"psi": 1.5}}}}"#,
        )
        .unwrap();

        let id = scene.find_path("robots/r1").and_then(|n| n.as_object()).unwrap();
        assert_eq!(scene.object(id).unwrap().shape.heading(), Some(1.5));
    }

    #[test]
    fn test_set_changes_config() {
        let (mut scene, mut dispatcher) = scene_with_robots();
        apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "update_config", "data": {"map/robots": {"visible": false}}}"#,
        )
        .unwrap();

        let id = scene.find_path("robots/r1").unwrap();
        assert!(!scene.is_visible(id));
    }

    #[test]
    fn test_remove_with_and_without_parent() {
        let (mut scene, mut dispatcher) = scene_with_robots();
        scene.take_events();

        apply(&mut dispatcher, &mut scene, r#"{"type": "remove", "id": "map/robots/r1"}"#).unwrap();
        assert!(scene.find_path("robots/r1").is_none());

        let events = scene.take_events();
        assert!(events.contains(&SceneEvent::Removed {
            uid: "map/robots/r1".into()
        }));
        assert!(events.contains(&SceneEvent::RedrawRequested));

        apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "remove", "parent": "map", "id": "map/robots"}"#,
        )
        .unwrap();
        assert_eq!(scene.group_count(), 1);

        let err = apply(&mut dispatcher, &mut scene, r#"{"type": "remove", "id": "map/robots"}"#).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownTarget(_)));
    }

    #[test]
    fn test_remove_full_uid_under_wrong_parent_fails() {
        let (mut scene, mut dispatcher) = scene_with_robots();
        apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "add", "parent": "map", "payload": {"id": "r1", "type": "point"}}"#,
        )
        .unwrap();

        let err = apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "remove", "parent": "map", "id": "map/robots/r1"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProtoError::UnknownTarget(_)));
        assert!(scene.find_path("r1").is_some());
        assert!(scene.find_path("robots/r1").is_some());

        apply(
            &mut dispatcher,
            &mut scene,
            r#"{"type": "remove", "parent": "map/robots", "id": "map/robots/r1"}"#,
        )
        .unwrap();
        assert!(scene.find_path("robots/r1").is_none());
        assert!(scene.find_path("r1").is_some());
    }

    #[test]
    fn test_malformed_text_counts_as_failure() {
        let mut scene = Scene::new("map");
        let mut dispatcher = Dispatcher::new();
        assert!(matches!(
            apply(&mut dispatcher, &mut scene, "{not json"),
            Err(ProtoError::Json(_))
        ));
        assert_eq!((dispatcher.received(), dispatcher.failed()), (1, 1));
    }
}
