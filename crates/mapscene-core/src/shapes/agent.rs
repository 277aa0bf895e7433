//! 朝向体与视野朝向体
//!
//! 本体是圆，航向箭头从本体边缘伸出，箭杆不会被本体填充遮挡。
//! 视野朝向体在本体下方额外绘制一个以航向为中心的扇形。

use super::{draw_arrow, draw_highlight_ring, draw_marker, screen_direction, Marker, ShapeStyle};
use crate::label::around_agent;
use crate::math::{heading, Point2, Vector2};
use crate::properties::{Color, SizeMode, Stroke};
use crate::surface::{CoordinateTransform, DrawSurface, LabelAnchor};
use crate::transform::Transform2D;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// 扇形弧线采样段数
const WEDGE_SEGMENTS: usize = 24;

/// 箭头颜色：跟随本体或自定义
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowColor {
    #[default]
    Inherit,
    #[serde(untagged)]
    Custom(Color),
}

impl ArrowColor {
    pub fn resolve(&self, body: Color) -> Color {
        match self {
            ArrowColor::Inherit => body,
            ArrowColor::Custom(c) => *c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// 本体半径
    pub size: f64,
    pub size_mode: SizeMode,
    pub color: Color,
    pub border_color: Color,
    pub border_width: f64,
    pub arrow_length: f64,
    pub arrow_length_mode: SizeMode,
    pub arrow_width: f64,
    pub arrow_width_mode: SizeMode,
    pub arrow_color: ArrowColor,
    pub highlight_margin_px: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            size: 0.05,
            size_mode: SizeMode::Meter,
            color: Color::rgba(0.0, 0.7, 0.7, 1.0),
            border_color: Color::BLACK,
            border_width: 1.0,
            arrow_length: 0.2,
            arrow_length_mode: SizeMode::Meter,
            arrow_width: 0.02,
            arrow_width_mode: SizeMode::Meter,
            arrow_color: ArrowColor::Inherit,
            highlight_margin_px: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentData {
    pub x: f64,
    pub y: f64,
    /// 航向角（弧度，自 +x 轴逆时针）
    pub psi: f64,
}

/// 屏幕空间中的本体几何
#[derive(Debug, Clone, Copy)]
struct BodyGeometry {
    center: Point2,
    forward: Vector2,
    radius: f64,
}

#[derive(Debug, Clone, Default)]
pub struct AgentShape {
    pub config: AgentConfig,
    pub data: AgentData,
}

impl AgentShape {
    pub fn at(x: f64, y: f64, psi: f64) -> Self {
        Self {
            config: AgentConfig::default(),
            data: AgentData { x, y, psi },
        }
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.data.x, self.data.y)
    }

    fn geometry(&self, transform: &dyn CoordinateTransform) -> BodyGeometry {
        let position = self.position();
        BodyGeometry {
            center: transform.world_to_canvas(position),
            forward: screen_direction(transform, position, heading(self.data.psi)),
            radius: self.config.size_mode.to_px(self.config.size, transform.scale()),
        }
    }

    /// 箭头尖端（屏幕坐标）
    ///
    /// 尖端至少伸出到本体边缘外一个箭头头部长度，保证小尺寸下箭头仍可见。
    pub fn arrow_tip(&self, transform: &dyn CoordinateTransform) -> Point2 {
        let g = self.geometry(transform);
        let scale = transform.scale();
        let length = self.config.arrow_length_mode.to_px(self.config.arrow_length, scale);
        let width = self.config.arrow_width_mode.to_px(self.config.arrow_width, scale).max(1.0);
        let head = (width * 3.0).max(6.0);
        g.center + g.forward * length.max(g.radius + head)
    }

    pub fn draw(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        let g = self.geometry(transform);
        let body = style.tint(self.config.color, 1.0);
        let border = Stroke::new(self.config.border_width, style.tint(self.config.border_color, 1.0));

        draw_marker(
            surface,
            g.center,
            g.radius,
            Marker::Circle,
            body,
            border.is_visible().then_some(border),
        );

        let width = self
            .config
            .arrow_width_mode
            .to_px(self.config.arrow_width, transform.scale());
        let arrow = style.tint(self.config.arrow_color.resolve(self.config.color), 1.0);
        draw_arrow(
            surface,
            g.center + g.forward * g.radius,
            self.arrow_tip(transform),
            width,
            arrow,
        );

        if style.highlight {
            draw_highlight_ring(surface, g.center, g.radius + self.config.highlight_margin_px, style);
        }
    }

    pub fn label_position(
        &self,
        transform: &dyn CoordinateTransform,
        style: &ShapeStyle,
        surface: &dyn DrawSurface,
        text: &str,
        font_px: f64,
    ) -> LabelAnchor {
        let g = self.geometry(transform);
        let mut extent = g.radius;
        if style.highlight {
            extent += self.config.highlight_margin_px;
        }
        around_agent(
            g.center,
            g.forward,
            extent,
            surface.measure_text(text, font_px),
            surface.pixels_per_point(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionAgentConfig {
    #[serde(flatten)]
    pub agent: AgentConfig,
    /// 视野角（弧度）
    pub fov: f64,
    /// 视野半径（世界单位）
    pub vision_radius: f64,
    pub vision_opacity: f64,
}

impl Default for VisionAgentConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig {
                arrow_length: 0.25,
                arrow_width: 0.03,
                ..AgentConfig::default()
            },
            fov: FRAC_PI_2,
            vision_radius: 0.5,
            vision_opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisionAgentShape {
    pub config: VisionAgentConfig,
    pub data: AgentData,
}

impl VisionAgentShape {
    pub fn at(x: f64, y: f64, psi: f64) -> Self {
        Self {
            config: VisionAgentConfig::default(),
            data: AgentData { x, y, psi },
        }
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.data.x, self.data.y)
    }

    /// 以普通朝向体的视角看待本体部分
    pub fn agent_view(&self) -> AgentShape {
        AgentShape {
            config: self.config.agent.clone(),
            data: self.data,
        }
    }

    /// 视野扇形轮廓（世界坐标），首点为中心
    pub fn wedge(&self) -> Vec<Point2> {
        let pose = Transform2D::pose(self.data.x, self.data.y, self.data.psi);
        let half = self.config.fov.clamp(0.0, std::f64::consts::TAU) / 2.0;
        let r = self.config.vision_radius;

        let mut points = Vec::with_capacity(WEDGE_SEGMENTS + 2);
        points.push(self.position());
        for i in 0..=WEDGE_SEGMENTS {
            let a = -half + 2.0 * half * i as f64 / WEDGE_SEGMENTS as f64;
            points.push(pose.transform_point(&Point2::new(r * a.cos(), r * a.sin())));
        }
        points
    }

    pub fn draw(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        if self.config.vision_radius > 0.0 && self.config.fov > 0.0 {
            let points: Vec<Point2> = self
                .wedge()
                .into_iter()
                .map(|p| transform.world_to_canvas(p))
                .collect();
            let fill = style.tint(self.config.agent.color, self.config.vision_opacity);
            surface.polygon(&points, Some(fill), None);
        }
        self.agent_view().draw(transform, style, surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, approx_eq_tol};
    use crate::surface::{DrawCommand, FixedTransform, RecordingSurface};
    use serde_json::json;

    fn transform() -> FixedTransform {
        FixedTransform::new(100.0, Point2::new(0.0, 0.0))
    }

    #[test]
    fn test_arrow_color_serde() {
        let c: ArrowColor = serde_json::from_value(json!("inherit")).unwrap();
        assert_eq!(c, ArrowColor::Inherit);
        let c: ArrowColor = serde_json::from_value(json!([1.0, 0.0, 0.0, 1.0])).unwrap();
        assert_eq!(c, ArrowColor::Custom(Color::RED));
        assert_eq!(serde_json::to_value(ArrowColor::Inherit).unwrap(), json!("inherit"));
    }

    #[test]
    fn test_arrow_starts_at_rim() {
        let agent = AgentShape::at(0.0, 0.0, 0.0);
        let mut surface = RecordingSurface::new();
        agent.draw(&transform(), &ShapeStyle::default(), &mut surface);

        let shaft = surface
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Polyline { points, .. } => Some(points.clone()),
                _ => None,
            })
            .expect("arrow shaft");
        // 半径 0.05m × 100 = 5px
        assert!(approx_eq(shaft[0].x, 5.0));
        assert!(approx_eq(shaft[0].y, 0.0));
    }

    #[test]
    fn test_arrow_tip_clears_body_when_zoomed_out() {
        let agent = AgentShape::at(0.0, 0.0, FRAC_PI_2);
        let t = FixedTransform::new(10.0, Point2::new(0.0, 0.0));
        let tip = agent.arrow_tip(&t);
        // 箭头长度 2px，不足以伸出本体；尖端被推到 半径 0.5 + 头部 6
        assert!(approx_eq_tol(tip.x, 0.0, 1e-9));
        assert!(approx_eq_tol(tip.y, -6.5, 1e-9));
    }

    #[test]
    fn test_vision_wedge_drawn_first() {
        let agent = VisionAgentShape::at(0.0, 0.0, 0.0);
        let mut surface = RecordingSurface::new();
        agent.draw(&transform(), &ShapeStyle::default(), &mut surface);

        let DrawCommand::Polygon { points, fill, .. } = &surface.commands[0] else {
            panic!("expected wedge polygon first");
        };
        assert_eq!(points.len(), WEDGE_SEGMENTS + 2);
        assert!(approx_eq_tol(fill.unwrap().a, 0.3, 1e-12));
        assert!(matches!(surface.commands[1], DrawCommand::Circle { .. }));
    }

    #[test]
    fn test_vision_config_flattens_agent_fields() {
        let config = VisionAgentConfig::default();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["arrow_length"], json!(0.25));
        assert_eq!(value["fov"], json!(FRAC_PI_2));
        assert!(value.get("agent").is_none());
    }
}
