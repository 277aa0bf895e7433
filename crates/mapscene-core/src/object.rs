//! 场景实体
//!
//! 实体由公共配置 [`ObjectConfig`]、图形 [`Shape`] 和历史轨迹组成。
//! 可见性与变暗在绘制时沿父分组链计算，实体本身只保存自己的标志。

use crate::error::SceneError;
use crate::id::GroupId;
use crate::math::Point2;
use crate::patch::{merge_patch, MergeOutcome, Patch};
use crate::payload::ObjectPayload;
use crate::properties::Color;
use crate::scene::Scene;
use crate::shapes::{Shape, ShapeKind, ShapeStyle};
use crate::surface::{CoordinateTransform, DrawSurface, LabelAnchor};
use crate::trail::{draw_trail, Trail, TrailSettings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// 单次绘制的上下文
pub struct DrawContext<'a> {
    pub scene: &'a Scene,
    pub transform: &'a dyn CoordinateTransform,
    pub now: Instant,
}

/// 所有图形共享的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// 显示名称，默认等于 id
    pub name: String,
    pub visible: bool,
    pub dim: bool,
    pub highlight: bool,
    pub show_trail: bool,
    pub show_name: bool,
    pub show_coordinates: bool,
    pub tooltip: Option<String>,
    /// 绘制层，数值大的在上
    pub layer: i32,
    /// 标注字号（像素）
    pub label_px: f64,
    pub label_color: Color,
    pub trail: TrailSettings,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            visible: true,
            dim: false,
            highlight: false,
            show_trail: false,
            show_name: true,
            show_coordinates: false,
            tooltip: None,
            layer: 0,
            label_px: 12.0,
            label_color: Color::rgba(0.9, 0.9, 0.9, 1.0),
            trail: TrailSettings::default(),
        }
    }
}

impl ObjectConfig {
    /// 指定图形类型的默认配置
    pub fn for_kind(kind: ShapeKind, id: &str) -> Self {
        Self {
            name: id.to_string(),
            show_name: kind.default_show_name(),
            layer: kind.default_layer(),
            ..Self::default()
        }
    }
}

/// 位置快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// 实体信息快照，供信息面板展示
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub id: String,
    pub uid: String,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub name: String,
    pub position: Option<Position>,
    pub heading: Option<f64>,
    pub visible: bool,
    pub dim: bool,
    pub layer: i32,
    pub tooltip: Option<String>,
    pub history_len: usize,
    pub data: Value,
}

/// 场景实体
#[derive(Debug, Clone)]
pub struct MapObject {
    id: String,
    pub(crate) parent: Option<GroupId>,
    pub config: ObjectConfig,
    pub shape: Shape,
    history: Trail,
}

impl MapObject {
    pub fn new(id: impl Into<String>, shape: Shape) -> Self {
        let id = id.into();
        Self {
            config: ObjectConfig::for_kind(shape.kind(), &id),
            id,
            parent: None,
            shape,
            history: Trail::new(),
        }
    }

    /// 由添加消息构造；配置与数据按补丁规则合并到默认值上
    pub fn from_payload(kind: ShapeKind, id: &str, payload: &ObjectPayload) -> Result<Self, SceneError> {
        if kind == ShapeKind::Line {
            for field in ["start", "end"] {
                if !payload.data.contains_key(field) {
                    return Err(SceneError::MissingField {
                        id: id.to_string(),
                        field,
                    });
                }
            }
        }

        let mut object = Self::new(id, Shape::new(kind));
        object.merge_config(&payload.config)?;
        object.shape.merge_data(&payload.data)?;
        Ok(object)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn history(&self) -> &Trail {
        &self.history
    }

    pub fn position(&self) -> Option<Point2> {
        self.shape.position()
    }

    /// 合并几何数据，返回是否有变化
    ///
    /// 可记录轨迹的图形在位置变化时按门控规则写入新样本。
    /// 相同数据重复更新不产生任何效果。
    pub fn update(&mut self, data: &Patch, now: Instant) -> bool {
        let before = self.shape.position();
        let outcome = match self.shape.merge_data(data) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(object = %self.id, "Ignoring data update: {}", err);
                return false;
            }
        };
        self.log_unknown("data", &outcome);

        if outcome.changed && self.kind().is_trail_capable() {
            if let Some(p) = self.shape.position() {
                if before != Some(p) {
                    self.history.maybe_push(p.x, p.y, now, &self.config.trail);
                }
            }
        }
        outcome.changed
    }

    /// 合并配置补丁，返回是否有变化
    pub fn update_config(&mut self, config: &Patch) -> bool {
        match self.merge_config(config) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(object = %self.id, "Ignoring config update: {}", err);
                false
            }
        }
    }

    /// 补丁同时作用于公共配置和图形配置，两者都不认识的键被忽略
    fn merge_config(&mut self, config: &Patch) -> Result<bool, SceneError> {
        let mut common = self.config.clone();
        let mut shape = self.shape.clone();
        let a = merge_patch(&mut common, config)?;
        let b = shape.merge_config(config)?;

        let unknown: Vec<String> = a
            .unknown
            .iter()
            .filter(|k| b.unknown.contains(k))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            debug!(object = %self.id, ?unknown, "Ignoring unknown config keys");
        }

        self.config = common;
        self.shape = shape;
        if a.changed {
            self.history.enforce_limit(self.config.trail.max_len);
        }
        Ok(a.changed || b.changed)
    }

    fn log_unknown(&self, what: &str, outcome: &MergeOutcome) {
        if !outcome.unknown.is_empty() {
            debug!(object = %self.id, unknown = ?outcome.unknown, "Ignoring unknown {} keys", what);
        }
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

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// 标注文本：名称和/或坐标；都不显示时返回 None
    pub fn label_text(&self) -> Option<String> {
        let coords = if self.config.show_coordinates {
            self.position().map(|p| format!("({:.2}, {:.2})", p.x, p.y))
        } else {
            None
        };
        match (self.config.show_name, coords) {
            (true, Some(c)) => Some(format!("{} {}", self.config.name, c)),
            (true, None) => Some(self.config.name.clone()),
            (false, Some(c)) => Some(c),
            (false, None) => None,
        }
    }

    fn style(&self, scene: &Scene) -> ShapeStyle {
        ShapeStyle {
            dimmed: self.config.dim || scene.chain_dimmed(self.parent),
            highlight: self.config.highlight,
        }
    }

    /// 自身可见且所有祖先分组可见
    pub fn is_effectively_visible(&self, scene: &Scene) -> bool {
        self.config.visible && scene.chain_visible(self.parent)
    }

    /// 自身或任一祖先分组变暗
    pub fn is_effectively_dimmed(&self, scene: &Scene) -> bool {
        self.config.dim || scene.chain_dimmed(self.parent)
    }

    /// 绘制轨迹（若开启）和本体
    pub fn draw(&self, ctx: &DrawContext, surface: &mut dyn DrawSurface) {
        if !self.is_effectively_visible(ctx.scene) {
            return;
        }
        let style = self.style(ctx.scene);
        self.draw_trail(ctx, &style, surface);
        self.shape.draw(ctx, &style, surface);
    }

    fn draw_trail(&self, ctx: &DrawContext, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        if !self.config.show_trail || self.history.is_empty() {
            return;
        }
        draw_trail(
            &self.history,
            self.shape.body_color(),
            self.shape.body_world_size(ctx.transform.scale()),
            &self.config.trail,
            style.dimmed,
            ctx.now,
            ctx.transform,
            surface,
        );
    }

    /// 标注锚点；不显示标注或几何无法解析时返回 None
    pub fn label_position(&self, ctx: &DrawContext, surface: &dyn DrawSurface) -> Option<LabelAnchor> {
        let text = self.label_text()?;
        let style = self.style(ctx.scene);
        self.shape
            .label_position(ctx, &style, surface, &text, self.config.label_px)
    }

    /// 绘制标注
    pub fn draw_label(&self, ctx: &DrawContext, surface: &mut dyn DrawSurface) {
        if !self.is_effectively_visible(ctx.scene) {
            return;
        }
        let Some(text) = self.label_text() else {
            return;
        };
        let style = self.style(ctx.scene);
        let Some(anchor) = self
            .shape
            .label_position(ctx, &style, &*surface, &text, self.config.label_px)
        else {
            return;
        };
        let color = style.tint(self.config.label_color, 1.0);
        surface.text(&anchor, &text, self.config.label_px, color);
    }

    /// 信息快照；`uid` 由场景根据所在路径给出
    pub fn info(&self, uid: impl Into<String>) -> ObjectInfo {
        ObjectInfo {
            id: self.id.clone(),
            uid: uid.into(),
            kind: self.kind(),
            name: self.config.name.clone(),
            position: self.position().map(|p| Position { x: p.x, y: p.y }),
            heading: self.shape.heading(),
            visible: self.config.visible,
            dim: self.config.dim,
            layer: self.config.layer,
            tooltip: self.config.tooltip.clone(),
            history_len: self.history.len(),
            data: self.shape.data_value(),
        }
    }

    /// 完整配置：公共配置与图形配置合并成一个对象
    pub fn config_patch(&self) -> Patch {
        let mut config = match serde_json::to_value(&self.config) {
            Ok(Value::Object(map)) => map,
            _ => Patch::new(),
        };
        if let Value::Object(shape) = self.shape.config_value() {
            config.extend(shape);
        }
        config
    }

    /// 可重新添加的完整描述
    pub fn payload(&self, uid: impl Into<String>) -> ObjectPayload {
        let data = match self.shape.data_value() {
            Value::Object(map) => map,
            _ => Patch::new(),
        };
        ObjectPayload {
            id: uid.into(),
            kind: self.kind().type_name().to_string(),
            config: self.config_patch(),
            data,
            ..ObjectPayload::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::patch_from_value;
    use crate::shapes::{AgentShape, PointShape};
    use serde_json::json;
    use std::time::Duration;

    fn point(id: &str, x: f64, y: f64) -> MapObject {
        MapObject::new(id, Shape::Point(PointShape::at(x, y)))
    }

    #[test]
    fn test_defaults_follow_kind() {
        let p = point("p1", 0.0, 0.0);
        assert_eq!(p.config.name, "p1");
        assert_eq!(p.config.layer, 3);
        assert!(p.config.show_name);

        let c = MapObject::new("c1", Shape::new(ShapeKind::Circle));
        assert!(!c.config.show_name);
        assert_eq!(c.config.layer, 1);
    }

    #[test]
    fn test_update_records_history_once() {
        let base = Instant::now();
        let mut p = point("p1", 0.0, 0.0);
        let patch = patch_from_value(json!({"x": 1.0, "y": 2.0}));

        assert!(p.update(&patch, base));
        assert_eq!(p.history().len(), 1);

        // 重复同一数据：无变化、不记录
        assert!(!p.update(&patch, base + Duration::from_millis(500)));
        assert_eq!(p.history().len(), 1);
        assert_eq!(p.position(), Some(Point2::new(1.0, 2.0)));
    }

    #[test]
    fn test_update_gates_trail_samples() {
        let base = Instant::now();
        let mut p = point("p1", 5.0, 5.0);

        assert!(p.update(&patch_from_value(json!({"x": 0.0, "y": 0.0})), base));
        assert_eq!(p.history().len(), 1);

        // 移动不足 min_dist 且间隔不足 min_dt_ms
        assert!(p.update(&patch_from_value(json!({"x": 0.01})), base + Duration::from_millis(10)));
        assert_eq!(p.history().len(), 1);

        assert!(p.update(&patch_from_value(json!({"x": 0.06})), base + Duration::from_millis(20)));
        assert_eq!(p.history().len(), 2);

        p.clear_history();
        assert!(p.history().is_empty());
    }

    #[test]
    fn test_shapes_without_trail_keep_history_empty() {
        let base = Instant::now();
        for kind in [ShapeKind::Circle, ShapeKind::Rectangle, ShapeKind::Ellipse, ShapeKind::CoordinateSystem] {
            let mut object = MapObject::new("o1", Shape::new(kind));
            assert!(object.update(&patch_from_value(json!({"x": 1.5, "y": -2.0})), base));
            assert!(object.update(&patch_from_value(json!({"x": 3.0})), base + Duration::from_secs(1)));
            assert!(object.history().is_empty(), "{kind:?} recorded a trail");
        }
    }

    #[test]
    fn test_update_ignores_unknown_keys() {
        let mut p = point("p1", 0.0, 0.0);
        assert!(p.update(&patch_from_value(json!({"x": 3.0, "zzz": true})), Instant::now()));
        assert_eq!(p.position(), Some(Point2::new(3.0, 0.0)));
    }

    #[test]
    fn test_invalid_update_is_rejected_whole() {
        let mut p = point("p1", 0.0, 0.0);
        assert!(!p.update(&patch_from_value(json!({"x": 3.0, "y": "north"})), Instant::now()));
        assert_eq!(p.position(), Some(Point2::new(0.0, 0.0)));
        assert!(p.history().is_empty());
    }

    #[test]
    fn test_update_config_reaches_both_layers() {
        let mut a = MapObject::new("a1", Shape::Agent(AgentShape::at(0.0, 0.0, 0.0)));
        let changed = a.update_config(&patch_from_value(json!({
            "name": "Robot",
            "arrow_color": [1.0, 0.0, 0.0, 1.0],
            "trail": {"max_len": 5},
            "future_option": 1
        })));
        assert!(changed);
        assert_eq!(a.config.name, "Robot");
        assert_eq!(a.config.trail.max_len, 5);
        assert_eq!(a.config.trail.min_dist, 0.02);
        let Shape::Agent(agent) = &a.shape else {
            panic!("expected agent");
        };
        assert_eq!(agent.config.arrow_color, crate::shapes::ArrowColor::Custom(Color::RED));
    }

    #[test]
    fn test_shrinking_max_len_trims_history() {
        let base = Instant::now();
        let mut p = point("p1", 0.0, 0.0);
        for i in 1..=6u64 {
            p.update(
                &patch_from_value(json!({"x": i as f64})),
                base + Duration::from_millis(i * 100),
            );
        }
        assert_eq!(p.history().len(), 6);
        p.update_config(&patch_from_value(json!({"trail": {"max_len": 2}})));
        assert_eq!(p.history().len(), 2);
        assert_eq!(p.history().last().map(|s| s.x), Some(6.0));
    }

    #[test]
    fn test_label_text_variants() {
        let mut p = point("p1", 1.0, 2.5);
        assert_eq!(p.label_text().as_deref(), Some("p1"));
        p.config.show_coordinates = true;
        assert_eq!(p.label_text().as_deref(), Some("p1 (1.00, 2.50)"));
        p.config.show_name = false;
        assert_eq!(p.label_text().as_deref(), Some("(1.00, 2.50)"));
        p.config.show_coordinates = false;
        assert_eq!(p.label_text(), None);
    }

    #[test]
    fn test_line_payload_requires_endpoints() {
        let payload = ObjectPayload {
            id: "l1".into(),
            kind: "line".into(),
            data: patch_from_value(json!({"start": [0.0, 0.0]})),
            ..ObjectPayload::default()
        };
        let err = MapObject::from_payload(ShapeKind::Line, "l1", &payload).unwrap_err();
        assert_eq!(
            err,
            SceneError::MissingField {
                id: "l1".into(),
                field: "end"
            }
        );
    }

    #[test]
    fn test_info_snapshot() {
        let p = point("p1", 1.0, 2.0);
        let info = p.info("map/p1");
        assert_eq!(info.uid, "map/p1");
        assert_eq!(info.kind, ShapeKind::Point);
        assert_eq!(info.position, Some(Position { x: 1.0, y: 2.0 }));
        assert_eq!(info.data, json!({"x": 1.0, "y": 2.0}));
    }
}
