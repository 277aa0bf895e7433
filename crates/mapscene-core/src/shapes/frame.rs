//! 坐标系
//!
//! 在位姿 (x, y, psi) 处绘制 x/y 两个轴箭头和原点标记。

use super::{draw_arrow, screen_direction, ShapeStyle};
use crate::label::away_from_axes;
use crate::math::{heading, Point2};
use crate::properties::Color;
use crate::surface::{CoordinateTransform, DrawSurface, LabelAnchor};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateSystemConfig {
    pub x_color: Color,
    pub y_color: Color,
    pub origin_color: Color,
    /// 轴长（世界单位）
    pub length: f64,
    /// 轴宽（世界单位）
    pub width: f64,
    pub opacity: f64,
}

impl Default for CoordinateSystemConfig {
    fn default() -> Self {
        Self {
            x_color: Color::RED,
            y_color: Color::GREEN,
            origin_color: Color::rgba(0.8, 0.8, 1.0, 1.0),
            length: 0.25,
            width: 0.02,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateSystemData {
    pub x: f64,
    pub y: f64,
    pub psi: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateSystemShape {
    pub config: CoordinateSystemConfig,
    pub data: CoordinateSystemData,
}

impl CoordinateSystemShape {
    fn origin(&self) -> Point2 {
        Point2::new(self.data.x, self.data.y)
    }

    fn origin_radius_px(&self, scale: f64) -> f64 {
        (self.config.width * scale * 1.5).max(2.0)
    }

    pub fn draw(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        let origin = self.origin();
        let center = transform.world_to_canvas(origin);
        let scale = transform.scale();
        let width = self.config.width * scale;
        let opacity = self.config.opacity;

        for (angle, color) in [
            (self.data.psi, self.config.x_color),
            (self.data.psi + FRAC_PI_2, self.config.y_color),
        ] {
            let tip = transform.world_to_canvas(origin + heading(angle) * self.config.length);
            draw_arrow(surface, center, tip, width, style.tint(color, opacity));
        }

        surface.circle(
            center,
            self.origin_radius_px(scale),
            Some(style.tint(self.config.origin_color, opacity)),
            None,
        );
    }

    pub fn label_position(&self, transform: &dyn CoordinateTransform) -> LabelAnchor {
        let origin = self.origin();
        away_from_axes(
            transform.world_to_canvas(origin),
            screen_direction(transform, origin, heading(self.data.psi)),
            screen_direction(transform, origin, heading(self.data.psi + FRAC_PI_2)),
            self.origin_radius_px(transform.scale()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, FixedTransform, RecordingSurface, TextAlign};

    #[test]
    fn test_draws_two_axes_then_origin() {
        let frame = CoordinateSystemShape::default();
        let transform = FixedTransform::new(100.0, Point2::new(0.0, 0.0));
        let mut surface = RecordingSurface::new();
        frame.draw(&transform, &ShapeStyle::default(), &mut surface);

        let polylines = surface
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
            .count();
        assert_eq!(polylines, 2);
        assert!(matches!(surface.commands.last(), Some(DrawCommand::Circle { .. })));
    }

    #[test]
    fn test_label_sits_opposite_the_axes() {
        let frame = CoordinateSystemShape::default();
        let transform = FixedTransform::new(100.0, Point2::new(200.0, 200.0));
        let anchor = frame.label_position(&transform);
        assert!(anchor.x < 200.0);
        assert!(anchor.y > 200.0);
        assert_eq!(anchor.align, TextAlign::Right);
    }
}
