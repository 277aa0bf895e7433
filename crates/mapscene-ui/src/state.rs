//! UI状态管理

use mapscene_core::id::NodeRef;
use mapscene_core::math::Point2;
use mapscene_core::scene::{Scene, SceneEvent};

/// 面板与选择状态
#[derive(Debug, Clone)]
pub struct UiState {
    /// 当前选中的节点
    pub selected: Option<NodeRef>,

    /// 鼠标位置（世界坐标）
    pub mouse_world_pos: Point2,

    pub show_scene_panel: bool,
    pub show_info_panel: bool,

    /// 状态栏消息
    pub status_message: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selected: None,
            mouse_world_pos: Point2::origin(),
            show_scene_panel: true,
            show_info_panel: true,
            status_message: "Ready".to_string(),
        }
    }
}

impl UiState {
    pub fn select(&mut self, node: NodeRef) {
        self.selected = Some(node);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// 选中节点已被移除时清除选择
    pub fn validate_selection(&mut self, scene: &Scene) {
        let alive = match self.selected {
            Some(NodeRef::Object(id)) => scene.object(id).is_some(),
            Some(NodeRef::Group(id)) => scene.group(id).is_some(),
            None => true,
        };
        if !alive {
            self.selected = None;
        }
    }

    /// 用场景事件刷新状态栏
    pub fn note_events(&mut self, events: &[SceneEvent]) {
        let message = events.iter().rev().find_map(|event| match event {
            SceneEvent::Added { uid } => Some(format!("Added {}", uid)),
            SceneEvent::Removed { uid } => Some(format!("Removed {}", uid)),
            SceneEvent::RedrawRequested => None,
        });
        if let Some(message) = message {
            self.status_message = message;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscene_core::payload::RemoveMessage;
    use serde_json::json;

    #[test]
    fn test_selection_cleared_after_remove() {
        let mut scene = Scene::new("map");
        let root = scene.root();
        let payload = serde_json::from_value(json!({"id": "p1", "type": "point"})).unwrap();
        let node = scene.handle_add_message(root, &payload).unwrap();

        let mut state = UiState::default();
        state.select(node);
        state.validate_selection(&scene);
        assert_eq!(state.selected, Some(node));

        scene.handle_remove_message(root, &RemoveMessage::new("p1"));
        state.validate_selection(&scene);
        assert_eq!(state.selected, None);
    }

    #[test]
    fn test_status_reports_latest_structural_event() {
        let mut state = UiState::default();
        state.note_events(&[
            SceneEvent::Added { uid: "map/a".into() },
            SceneEvent::Removed { uid: "map/b".into() },
            SceneEvent::RedrawRequested,
        ]);
        assert_eq!(state.status_message, "Removed map/b");
    }
}
