//! 面状图形：矩形、圆、椭圆

use super::ShapeStyle;
use crate::label::north_of;
use crate::math::Point2;
use crate::properties::{Color, Stroke};
use crate::surface::{CoordinateTransform, DrawSurface, LabelAnchor};
use crate::transform::Transform2D;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// 椭圆采样段数
const ELLIPSE_SEGMENTS: usize = 64;

/// 面状图形的填充与边框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub color: Color,
    pub border_color: Color,
    /// 边框宽度（像素）
    pub border_width: f64,
    /// 整体不透明度，与颜色 alpha 相乘
    pub opacity: f64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self::translucent()
    }
}

impl AreaConfig {
    /// 半透明红色填充，1px 黑色边框
    pub fn translucent() -> Self {
        Self {
            color: Color::rgba(1.0, 0.0, 0.0, 0.35),
            border_color: Color::BLACK,
            border_width: 1.0,
            opacity: 1.0,
        }
    }

    /// 不透明红色填充，1px 黑色边框
    pub fn opaque() -> Self {
        Self {
            color: Color::rgba(1.0, 0.0, 0.0, 1.0),
            border_color: Color::BLACK,
            border_width: 1.0,
            opacity: 1.0,
        }
    }

    fn fill(&self, style: &ShapeStyle) -> Color {
        style.tint(self.color, self.opacity)
    }

    fn stroke(&self, style: &ShapeStyle) -> Option<Stroke> {
        let stroke = Stroke::new(self.border_width, style.tint(self.border_color, self.opacity));
        stroke.is_visible().then_some(stroke)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleData {
    /// 中心
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for RectangleData {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RectangleShape {
    pub config: AreaConfig,
    pub data: RectangleData,
}

impl RectangleShape {
    pub fn draw(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        let (hw, hh) = (self.data.width / 2.0, self.data.height / 2.0);
        let (x, y) = (self.data.x, self.data.y);
        let corners = [
            Point2::new(x - hw, y - hh),
            Point2::new(x + hw, y - hh),
            Point2::new(x + hw, y + hh),
            Point2::new(x - hw, y + hh),
        ]
        .map(|p| transform.world_to_canvas(p));
        surface.polygon(&corners, Some(self.config.fill(style)), self.config.stroke(style));
    }

    pub fn label_position(&self, transform: &dyn CoordinateTransform) -> LabelAnchor {
        let center = transform.world_to_canvas(Point2::new(self.data.x, self.data.y));
        north_of(center, self.data.height / 2.0 * transform.scale())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleData {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Default for CircleData {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            radius: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircleShape {
    pub config: AreaConfig,
    pub data: CircleData,
}

impl Default for CircleShape {
    fn default() -> Self {
        Self {
            config: AreaConfig::opaque(),
            data: CircleData::default(),
        }
    }
}

impl CircleShape {
    pub fn draw(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        let center = transform.world_to_canvas(Point2::new(self.data.x, self.data.y));
        surface.circle(
            center,
            self.data.radius * transform.scale(),
            Some(self.config.fill(style)),
            self.config.stroke(style),
        );
    }

    pub fn label_position(&self, transform: &dyn CoordinateTransform) -> LabelAnchor {
        let center = transform.world_to_canvas(Point2::new(self.data.x, self.data.y));
        north_of(center, self.data.radius * transform.scale())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EllipseData {
    pub x: f64,
    pub y: f64,
    /// 长半轴（沿 psi 方向）
    pub rx: f64,
    pub ry: f64,
    pub psi: f64,
}

impl Default for EllipseData {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rx: 1.0,
            ry: 0.5,
            psi: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EllipseShape {
    pub config: AreaConfig,
    pub data: EllipseData,
}

impl EllipseShape {
    /// 轮廓采样点（世界坐标）
    pub fn outline(&self) -> Vec<Point2> {
        let pose = Transform2D::pose(self.data.x, self.data.y, self.data.psi);
        (0..ELLIPSE_SEGMENTS)
            .map(|i| {
                let t = TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
                pose.transform_point(&Point2::new(self.data.rx * t.cos(), self.data.ry * t.sin()))
            })
            .collect()
    }

    /// 竖直方向的半宽（世界单位）
    pub fn vertical_extent(&self) -> f64 {
        let (s, c) = self.data.psi.sin_cos();
        ((self.data.rx * s).powi(2) + (self.data.ry * c).powi(2)).sqrt()
    }

    pub fn draw(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        let points: Vec<Point2> = self
            .outline()
            .into_iter()
            .map(|p| transform.world_to_canvas(p))
            .collect();
        surface.polygon(&points, Some(self.config.fill(style)), self.config.stroke(style));
    }

    pub fn label_position(&self, transform: &dyn CoordinateTransform) -> LabelAnchor {
        let center = transform.world_to_canvas(Point2::new(self.data.x, self.data.y));
        north_of(center, self.vertical_extent() * transform.scale())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, approx_eq_tol};
    use crate::surface::{DrawCommand, FixedTransform, RecordingSurface};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rectangle_corners() {
        let rect = RectangleShape {
            config: AreaConfig::default(),
            data: RectangleData {
                x: 1.0,
                y: 1.0,
                width: 2.0,
                height: 1.0,
            },
        };
        let transform = FixedTransform::new(10.0, Point2::new(0.0, 100.0));
        let mut surface = RecordingSurface::new();
        rect.draw(&transform, &ShapeStyle::default(), &mut surface);

        let DrawCommand::Polygon { points, stroke, .. } = &surface.commands[0] else {
            panic!("expected polygon");
        };
        assert_eq!(points.len(), 4);
        assert!(approx_eq(points[0].x, 0.0));
        assert!(approx_eq(points[0].y, 95.0));
        assert!(approx_eq(points[2].x, 20.0));
        assert!(approx_eq(points[2].y, 85.0));
        assert_eq!(stroke.map(|s| s.width), Some(1.0));
    }

    #[test]
    fn test_opacity_and_dim_compose() {
        let mut circle = CircleShape::default();
        circle.config.opacity = 0.5;
        let transform = FixedTransform::new(10.0, Point2::new(0.0, 0.0));
        let mut surface = RecordingSurface::new();
        let style = ShapeStyle {
            dimmed: true,
            highlight: false,
        };
        circle.draw(&transform, &style, &mut surface);

        let DrawCommand::Circle { fill, radius, .. } = &surface.commands[0] else {
            panic!("expected circle");
        };
        assert!(approx_eq(*radius, 10.0));
        assert!(approx_eq_tol(fill.unwrap().a, 0.15, 1e-12));
    }

    #[test]
    fn test_ellipse_outline_is_rotated() {
        let ellipse = EllipseShape {
            config: AreaConfig::default(),
            data: EllipseData {
                x: 0.0,
                y: 0.0,
                rx: 2.0,
                ry: 1.0,
                psi: FRAC_PI_2,
            },
        };
        let outline = ellipse.outline();
        assert_eq!(outline.len(), ELLIPSE_SEGMENTS);
        // t = 0 时的点在长轴端点，旋转 90° 后位于 +y
        assert!(approx_eq_tol(outline[0].x, 0.0, 1e-9));
        assert!(approx_eq_tol(outline[0].y, 2.0, 1e-9));
        assert!(approx_eq_tol(ellipse.vertical_extent(), 2.0, 1e-9));
    }
}
