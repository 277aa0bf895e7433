//! 线段
//!
//! 端点可以是字面坐标、场景路径或实体句柄。引用在每次绘制时重新解析，
//! 被引用的实体移动后线段自动跟随；引用失效时线段不绘制。
//! 句柄只存在于进程内：消息中不接受句柄，快照中句柄写成被引用实体的 uid。

use super::ShapeStyle;
use crate::error::SceneError;
use crate::id::{NodeRef, ObjectId};
use crate::label::along_normal;
use crate::math::Point2;
use crate::object::DrawContext;
use crate::patch::{MergeOutcome, Patch};
use crate::properties::{Color, LinePattern, LineStyle, Stroke};
use crate::scene::Scene;
use crate::surface::{DrawSurface, LabelAnchor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

/// 线段端点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndpointRef {
    /// 字面坐标 `[x, y]`
    Coords([f64; 2]),
    /// 从根开始的场景路径，如 `"robots/r1"`
    Path(String),
    /// 实体句柄
    #[serde(skip)]
    Object(ObjectId),
}

impl Default for EndpointRef {
    fn default() -> Self {
        EndpointRef::Coords([0.0, 0.0])
    }
}

impl From<[f64; 2]> for EndpointRef {
    fn from(xy: [f64; 2]) -> Self {
        EndpointRef::Coords(xy)
    }
}

impl From<ObjectId> for EndpointRef {
    fn from(id: ObjectId) -> Self {
        EndpointRef::Object(id)
    }
}

impl EndpointRef {
    /// 解析为世界坐标；引用的实体不存在或没有位置时返回 None
    pub fn resolve(&self, scene: &Scene) -> Option<Point2> {
        match self {
            EndpointRef::Coords([x, y]) => Some(Point2::new(*x, *y)),
            EndpointRef::Path(path) => {
                let id = scene.find_path(path)?.as_object()?;
                scene.object(id)?.position()
            }
            EndpointRef::Object(id) => scene.object(*id)?.position(),
        }
    }

    /// 消息中的表示；句柄换成 uid，句柄失效时为 null
    pub fn to_wire(&self, scene: &Scene) -> Value {
        match self {
            EndpointRef::Coords([x, y]) => Value::from(vec![*x, *y]),
            EndpointRef::Path(path) => Value::from(path.as_str()),
            EndpointRef::Object(id) => scene
                .uid_of(NodeRef::Object(*id))
                .map_or(Value::Null, Value::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub color: Color,
    /// 线宽（像素）
    pub width: f64,
    pub style: LineStyle,
    /// 虚线 [实线段, 间隔]（像素）
    pub dash_px: [f64; 2],
    /// 点线 [点径, 间隔]（像素）
    pub dot_px: [f64; 2],
    /// 标注沿法线的偏移（像素）
    pub label_offset_px: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            color: Color::rgba(0.9, 0.9, 0.9, 0.6),
            width: 2.0,
            style: LineStyle::Dashed,
            dash_px: [6.0, 4.0],
            dot_px: [2.0, 3.0],
            label_offset_px: 8.0,
        }
    }
}

impl LineConfig {
    pub fn pattern(&self) -> LinePattern {
        self.style.pattern(self.dash_px, self.dot_px)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineData {
    pub start: EndpointRef,
    pub end: EndpointRef,
}

impl LineData {
    /// 逐个端点合并，不对整体做序列化往返，句柄端点保持原样。
    /// 任一端点不合法时整个补丁被拒绝。
    pub fn merge(&mut self, patch: &Patch) -> Result<MergeOutcome, SceneError> {
        let mut next = self.clone();
        let mut outcome = MergeOutcome::default();
        for (key, value) in patch {
            let slot = match key.as_str() {
                "start" => &mut next.start,
                "end" => &mut next.end,
                _ => {
                    outcome.unknown.push(key.clone());
                    continue;
                }
            };
            let endpoint: EndpointRef = serde_json::from_value(value.clone())?;
            if *slot != endpoint {
                *slot = endpoint;
                outcome.changed = true;
            }
        }
        *self = next;
        Ok(outcome)
    }

    pub fn to_wire(&self, scene: &Scene) -> Patch {
        let mut data = Patch::new();
        data.insert("start".to_string(), self.start.to_wire(scene));
        data.insert("end".to_string(), self.end.to_wire(scene));
        data
    }
}

#[derive(Debug, Clone, Default)]
pub struct LineShape {
    pub config: LineConfig,
    pub data: LineData,
}

impl LineShape {
    pub fn new(start: impl Into<EndpointRef>, end: impl Into<EndpointRef>) -> Self {
        Self {
            config: LineConfig::default(),
            data: LineData {
                start: start.into(),
                end: end.into(),
            },
        }
    }

    /// 当前解析出的两个端点（世界坐标）
    pub fn resolve(&self, scene: &Scene) -> Option<(Point2, Point2)> {
        let start = self.data.start.resolve(scene)?;
        let end = self.data.end.resolve(scene)?;
        Some((start, end))
    }

    pub fn draw(&self, ctx: &DrawContext, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        let Some((start, end)) = self.resolve(ctx.scene) else {
            trace!("Line endpoint unresolved, skipping draw");
            return;
        };
        let stroke = Stroke::new(self.config.width, style.tint(self.config.color, 1.0));
        if !stroke.is_visible() {
            return;
        }
        let points = [
            ctx.transform.world_to_canvas(start),
            ctx.transform.world_to_canvas(end),
        ];
        surface.polyline(&points, stroke, self.config.pattern());
    }

    pub fn label_position(&self, ctx: &DrawContext) -> Option<LabelAnchor> {
        let (start, end) = self.resolve(ctx.scene)?;
        Some(along_normal(
            ctx.transform.world_to_canvas(start),
            ctx.transform.world_to_canvas(end),
            self.config.label_offset_px,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_forms() {
        let coords: EndpointRef = serde_json::from_value(json!([1.0, 2.0])).unwrap();
        assert_eq!(coords, EndpointRef::Coords([1.0, 2.0]));

        let path: EndpointRef = serde_json::from_value(json!("robots/r1")).unwrap();
        assert_eq!(path, EndpointRef::Path("robots/r1".into()));

        // 句柄不能从消息构造
        assert!(serde_json::from_value::<EndpointRef>(json!(7)).is_err());
    }

    #[test]
    fn test_merge_keeps_handle_endpoint() {
        let mut data = LineShape::new([0.0, 0.0], ObjectId(7)).data;
        let outcome = data
            .merge(&crate::patch::patch_from_value(json!({"start": "robots/r1", "color": 1})))
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.unknown, vec!["color".to_string()]);
        assert_eq!(data.start, EndpointRef::Path("robots/r1".into()));
        assert_eq!(data.end, EndpointRef::Object(ObjectId(7)));

        let before = data.clone();
        assert!(data
            .merge(&crate::patch::patch_from_value(json!({"start": [1.0, 1.0], "end": 7})))
            .is_err());
        assert_eq!(data, before);
    }

    #[test]
    fn test_pattern_follows_style() {
        let mut config = LineConfig::default();
        assert_eq!(config.pattern(), LinePattern::Dashed { dash: 6.0, gap: 4.0 });
        config.style = LineStyle::Dotted;
        assert_eq!(config.pattern(), LinePattern::Dotted { dot: 2.0, gap: 3.0 });
        config.style = LineStyle::Solid;
        assert_eq!(config.pattern(), LinePattern::Solid);
    }

    #[test]
    fn test_literal_endpoints_resolve_without_scene_objects() {
        let scene = Scene::new("map");
        let line = LineShape::new([0.0, 0.0], [3.0, 4.0]);
        let (s, e) = line.resolve(&scene).unwrap();
        assert_eq!((s.x, s.y, e.x, e.y), (0.0, 0.0, 3.0, 4.0));
    }
}
