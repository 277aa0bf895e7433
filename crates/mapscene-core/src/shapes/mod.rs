//! 图形变体
//!
//! 支持的图形：
//! - 点 (Point)
//! - 线段 (Line)，端点可引用其他实体
//! - 矩形 / 圆 / 椭圆 (Rectangle / Circle / Ellipse)
//! - 朝向体 (Agent) 与带视野扇形的朝向体 (VisionAgent)
//! - 坐标系 (CoordinateSystem)
//!
//! 变体集合是封闭的，所有操作通过 `match` 分派。

mod agent;
mod frame;
mod line;
mod point;
mod primitives;

pub use agent::{AgentConfig, AgentData, AgentShape, ArrowColor, VisionAgentConfig, VisionAgentShape};
pub use frame::{CoordinateSystemConfig, CoordinateSystemData, CoordinateSystemShape};
pub use line::{EndpointRef, LineConfig, LineData, LineShape};
pub use point::{Marker, PointConfig, PointData, PointShape};
pub use primitives::{
    AreaConfig, CircleData, CircleShape, EllipseData, EllipseShape, RectangleData, RectangleShape,
};

use crate::error::SceneError;
use crate::math::{perpendicular, try_normalize, Point2, Vector2};
use crate::object::DrawContext;
use crate::patch::{merge_patch, MergeOutcome, Patch};
use crate::properties::{Color, LinePattern, Stroke};
use crate::surface::{DrawSurface, LabelAnchor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 变暗时的 alpha 系数
pub const DIM_ALPHA: f64 = 0.3;

/// 高亮环颜色
pub const HIGHLIGHT_COLOR: Color = Color::rgba(1.0, 0.85, 0.2, 0.9);

/// 图形类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Point,
    Line,
    Rectangle,
    Circle,
    Ellipse,
    Agent,
    VisionAgent,
    CoordinateSystem,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 8] = [
        ShapeKind::Point,
        ShapeKind::Line,
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::Ellipse,
        ShapeKind::Agent,
        ShapeKind::VisionAgent,
        ShapeKind::CoordinateSystem,
    ];

    /// 协议中的类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            ShapeKind::Point => "point",
            ShapeKind::Line => "line",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Agent => "agent",
            ShapeKind::VisionAgent => "vision_agent",
            ShapeKind::CoordinateSystem => "coordinate_system",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_name() == name)
    }

    /// 是否记录历史轨迹
    pub fn is_trail_capable(&self) -> bool {
        matches!(
            self,
            ShapeKind::Point | ShapeKind::Agent | ShapeKind::VisionAgent
        )
    }

    /// 默认绘制层
    pub fn default_layer(&self) -> i32 {
        match self {
            ShapeKind::Rectangle | ShapeKind::Circle | ShapeKind::Ellipse => 1,
            ShapeKind::Line | ShapeKind::CoordinateSystem => 2,
            ShapeKind::Point => 3,
            ShapeKind::Agent | ShapeKind::VisionAgent => 4,
        }
    }

    /// 默认是否显示名称
    pub fn default_show_name(&self) -> bool {
        !matches!(
            self,
            ShapeKind::Rectangle | ShapeKind::Circle | ShapeKind::Ellipse | ShapeKind::CoordinateSystem
        )
    }
}

/// 绘制时由场景树继承得到的状态
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeStyle {
    pub dimmed: bool,
    pub highlight: bool,
}

impl ShapeStyle {
    /// 变暗系数
    pub fn alpha(&self) -> f64 {
        if self.dimmed {
            DIM_ALPHA
        } else {
            1.0
        }
    }

    /// 应用变暗和额外不透明度
    pub fn tint(&self, color: Color, opacity: f64) -> Color {
        color.multiply_alpha(opacity.clamp(0.0, 1.0) * self.alpha())
    }
}

/// 图形枚举
#[derive(Debug, Clone)]
pub enum Shape {
    Point(PointShape),
    Line(LineShape),
    Rectangle(RectangleShape),
    Circle(CircleShape),
    Ellipse(EllipseShape),
    Agent(AgentShape),
    VisionAgent(VisionAgentShape),
    CoordinateSystem(CoordinateSystemShape),
}

impl Shape {
    /// 以默认配置和数据创建
    pub fn new(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Point => Shape::Point(PointShape::default()),
            ShapeKind::Line => Shape::Line(LineShape::default()),
            ShapeKind::Rectangle => Shape::Rectangle(RectangleShape::default()),
            ShapeKind::Circle => Shape::Circle(CircleShape::default()),
            ShapeKind::Ellipse => Shape::Ellipse(EllipseShape::default()),
            ShapeKind::Agent => Shape::Agent(AgentShape::default()),
            ShapeKind::VisionAgent => Shape::VisionAgent(VisionAgentShape::default()),
            ShapeKind::CoordinateSystem => {
                Shape::CoordinateSystem(CoordinateSystemShape::default())
            }
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Point(_) => ShapeKind::Point,
            Shape::Line(_) => ShapeKind::Line,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
            Shape::Agent(_) => ShapeKind::Agent,
            Shape::VisionAgent(_) => ShapeKind::VisionAgent,
            Shape::CoordinateSystem(_) => ShapeKind::CoordinateSystem,
        }
    }

    /// 合并图形专属配置
    pub fn merge_config(&mut self, patch: &Patch) -> Result<MergeOutcome, SceneError> {
        match self {
            Shape::Point(s) => merge_patch(&mut s.config, patch),
            Shape::Line(s) => merge_patch(&mut s.config, patch),
            Shape::Rectangle(s) => merge_patch(&mut s.config, patch),
            Shape::Circle(s) => merge_patch(&mut s.config, patch),
            Shape::Ellipse(s) => merge_patch(&mut s.config, patch),
            Shape::Agent(s) => merge_patch(&mut s.config, patch),
            Shape::VisionAgent(s) => merge_patch(&mut s.config, patch),
            Shape::CoordinateSystem(s) => merge_patch(&mut s.config, patch),
        }
    }

    /// 合并几何数据
    pub fn merge_data(&mut self, patch: &Patch) -> Result<MergeOutcome, SceneError> {
        match self {
            Shape::Point(s) => merge_patch(&mut s.data, patch),
            Shape::Line(s) => s.data.merge(patch),
            Shape::Rectangle(s) => merge_patch(&mut s.data, patch),
            Shape::Circle(s) => merge_patch(&mut s.data, patch),
            Shape::Ellipse(s) => merge_patch(&mut s.data, patch),
            Shape::Agent(s) => merge_patch(&mut s.data, patch),
            Shape::VisionAgent(s) => merge_patch(&mut s.data, patch),
            Shape::CoordinateSystem(s) => merge_patch(&mut s.data, patch),
        }
    }

    /// 图形专属配置的 JSON 快照
    pub fn config_value(&self) -> Value {
        let value = match self {
            Shape::Point(s) => serde_json::to_value(&s.config),
            Shape::Line(s) => serde_json::to_value(&s.config),
            Shape::Rectangle(s) => serde_json::to_value(&s.config),
            Shape::Circle(s) => serde_json::to_value(&s.config),
            Shape::Ellipse(s) => serde_json::to_value(&s.config),
            Shape::Agent(s) => serde_json::to_value(&s.config),
            Shape::VisionAgent(s) => serde_json::to_value(&s.config),
            Shape::CoordinateSystem(s) => serde_json::to_value(&s.config),
        };
        value.unwrap_or(Value::Null)
    }

    /// 几何数据的 JSON 快照
    pub fn data_value(&self) -> Value {
        let value = match self {
            Shape::Point(s) => serde_json::to_value(&s.data),
            Shape::Line(s) => serde_json::to_value(&s.data),
            Shape::Rectangle(s) => serde_json::to_value(&s.data),
            Shape::Circle(s) => serde_json::to_value(&s.data),
            Shape::Ellipse(s) => serde_json::to_value(&s.data),
            Shape::Agent(s) => serde_json::to_value(&s.data),
            Shape::VisionAgent(s) => serde_json::to_value(&s.data),
            Shape::CoordinateSystem(s) => serde_json::to_value(&s.data),
        };
        value.unwrap_or(Value::Null)
    }

    /// 世界坐标位置；线段没有单一位置
    pub fn position(&self) -> Option<Point2> {
        match self {
            Shape::Point(s) => Some(Point2::new(s.data.x, s.data.y)),
            Shape::Line(_) => None,
            Shape::Rectangle(s) => Some(Point2::new(s.data.x, s.data.y)),
            Shape::Circle(s) => Some(Point2::new(s.data.x, s.data.y)),
            Shape::Ellipse(s) => Some(Point2::new(s.data.x, s.data.y)),
            Shape::Agent(s) => Some(s.position()),
            Shape::VisionAgent(s) => Some(s.position()),
            Shape::CoordinateSystem(s) => Some(Point2::new(s.data.x, s.data.y)),
        }
    }

    /// 航向角（弧度）
    pub fn heading(&self) -> Option<f64> {
        match self {
            Shape::Agent(s) => Some(s.data.psi),
            Shape::VisionAgent(s) => Some(s.data.psi),
            Shape::Ellipse(s) => Some(s.data.psi),
            Shape::CoordinateSystem(s) => Some(s.data.psi),
            _ => None,
        }
    }

    /// 本体主色，轨迹使用同一颜色
    pub fn body_color(&self) -> Color {
        match self {
            Shape::Point(s) => s.config.color,
            Shape::Line(s) => s.config.color,
            Shape::Rectangle(s) => s.config.color,
            Shape::Circle(s) => s.config.color,
            Shape::Ellipse(s) => s.config.color,
            Shape::Agent(s) => s.config.color,
            Shape::VisionAgent(s) => s.config.agent.color,
            Shape::CoordinateSystem(s) => s.config.origin_color,
        }
    }

    /// 本体尺寸（世界单位），用于轨迹点半径
    pub fn body_world_size(&self, scale: f64) -> f64 {
        match self {
            Shape::Point(s) => s.config.size_mode.to_world(s.config.size, scale),
            Shape::Agent(s) => s.config.size_mode.to_world(s.config.size, scale),
            Shape::VisionAgent(s) => s
                .config
                .agent
                .size_mode
                .to_world(s.config.agent.size, scale),
            Shape::Circle(s) => s.data.radius,
            Shape::Rectangle(s) => s.data.width.min(s.data.height) / 2.0,
            Shape::Ellipse(s) => s.data.rx.min(s.data.ry),
            Shape::CoordinateSystem(s) => s.config.width,
            Shape::Line(_) => 0.0,
        }
    }

    /// 绘制本体
    pub fn draw(&self, ctx: &DrawContext, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        match self {
            Shape::Point(s) => s.draw(ctx.transform, style, surface),
            Shape::Line(s) => s.draw(ctx, style, surface),
            Shape::Rectangle(s) => s.draw(ctx.transform, style, surface),
            Shape::Circle(s) => s.draw(ctx.transform, style, surface),
            Shape::Ellipse(s) => s.draw(ctx.transform, style, surface),
            Shape::Agent(s) => s.draw(ctx.transform, style, surface),
            Shape::VisionAgent(s) => s.draw(ctx.transform, style, surface),
            Shape::CoordinateSystem(s) => s.draw(ctx.transform, style, surface),
        }
    }

    /// 标注锚点（屏幕坐标）
    pub fn label_position(
        &self,
        ctx: &DrawContext,
        style: &ShapeStyle,
        surface: &dyn DrawSurface,
        text: &str,
        font_px: f64,
    ) -> Option<LabelAnchor> {
        match self {
            Shape::Point(s) => Some(s.label_position(ctx.transform, style)),
            Shape::Line(s) => s.label_position(ctx),
            Shape::Rectangle(s) => Some(s.label_position(ctx.transform)),
            Shape::Circle(s) => Some(s.label_position(ctx.transform)),
            Shape::Ellipse(s) => Some(s.label_position(ctx.transform)),
            Shape::Agent(s) => Some(s.label_position(ctx.transform, style, surface, text, font_px)),
            Shape::VisionAgent(s) => Some(
                s.agent_view()
                    .label_position(ctx.transform, style, surface, text, font_px),
            ),
            Shape::CoordinateSystem(s) => Some(s.label_position(ctx.transform)),
        }
    }
}

/// 绘制实心标记（圆/方/三角）
pub(crate) fn draw_marker(
    surface: &mut dyn DrawSurface,
    center: Point2,
    radius: f64,
    marker: Marker,
    fill: Color,
    stroke: Option<Stroke>,
) {
    match marker {
        Marker::Circle => surface.circle(center, radius, Some(fill), stroke),
        Marker::Square => {
            let pts = [
                Point2::new(center.x - radius, center.y - radius),
                Point2::new(center.x + radius, center.y - radius),
                Point2::new(center.x + radius, center.y + radius),
                Point2::new(center.x - radius, center.y + radius),
            ];
            surface.polygon(&pts, Some(fill), stroke);
        }
        Marker::Triangle => {
            // 外接圆半径为 radius 的正三角形，尖端朝上
            let h = radius * 0.5;
            let w = radius * (3.0f64).sqrt() / 2.0;
            let pts = [
                Point2::new(center.x, center.y - radius),
                Point2::new(center.x + w, center.y + h),
                Point2::new(center.x - w, center.y + h),
            ];
            surface.polygon(&pts, Some(fill), stroke);
        }
    }
}

/// 高亮环
pub(crate) fn draw_highlight_ring(surface: &mut dyn DrawSurface, center: Point2, radius: f64, style: &ShapeStyle) {
    let stroke = Stroke::new(2.0, style.tint(HIGHLIGHT_COLOR, 1.0));
    surface.circle(center, radius, None, Some(stroke));
}

/// 屏幕空间箭头：杆 + 三角箭头
pub(crate) fn draw_arrow(
    surface: &mut dyn DrawSurface,
    start: Point2,
    tip: Point2,
    width_px: f64,
    color: Color,
) {
    let Some(dir) = try_normalize(&(tip - start)) else {
        return;
    };
    let width = width_px.max(1.0);
    let head_len = (width * 3.0).max(6.0).min((tip - start).norm());
    let head_half = (width * 1.5).max(3.0);
    let base = tip - dir * head_len;
    let side: Vector2 = perpendicular(&dir) * head_half;

    if (base - start).dot(&dir) > 0.0 {
        surface.polyline(&[start, base], Stroke::new(width, color), LinePattern::Solid);
    }
    surface.polygon(&[tip, base + side, base - side], Some(color), None);
}

/// 轴对齐方向：世界方向向量投影到屏幕后的单位方向
pub(crate) fn screen_direction(
    transform: &dyn crate::surface::CoordinateTransform,
    origin: Point2,
    direction: Vector2,
) -> Vector2 {
    let a = transform.world_to_canvas(origin);
    let b = transform.world_to_canvas(origin + direction);
    try_normalize(&(b - a)).unwrap_or_else(|| Vector2::new(1.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_table() {
        for kind in ShapeKind::ALL {
            assert_eq!(ShapeKind::from_type_name(kind.type_name()), Some(kind));
            assert_eq!(Shape::new(kind).kind(), kind);
        }
        assert_eq!(ShapeKind::from_type_name("group"), None);
        assert_eq!(ShapeKind::from_type_name("hexagon"), None);
    }

    #[test]
    fn test_trail_capability() {
        assert!(ShapeKind::Point.is_trail_capable());
        assert!(ShapeKind::VisionAgent.is_trail_capable());
        assert!(!ShapeKind::Line.is_trail_capable());
        assert!(!ShapeKind::Circle.is_trail_capable());
        assert!(!ShapeKind::CoordinateSystem.is_trail_capable());
    }

    #[test]
    fn test_dim_tint() {
        let style = ShapeStyle {
            dimmed: true,
            highlight: false,
        };
        let c = style.tint(Color::RED, 0.5);
        assert!((c.a - 0.15).abs() < 1e-12);
    }
}
