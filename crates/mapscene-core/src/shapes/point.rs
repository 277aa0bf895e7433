//! 点

use super::{draw_highlight_ring, draw_marker, ShapeStyle};
use crate::label::north_of;
use crate::math::Point2;
use crate::properties::{Color, SizeMode, Stroke};
use crate::surface::{CoordinateTransform, DrawSurface, LabelAnchor};
use serde::{Deserialize, Serialize};

/// 点的标记形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    #[default]
    Circle,
    Square,
    Triangle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointConfig {
    /// 半径
    pub size: f64,
    pub size_mode: SizeMode,
    pub color: Color,
    pub border_color: Color,
    /// 边框宽度（像素）
    pub border_width: f64,
    pub shape: Marker,
    /// 高亮环与本体的距离（像素）
    pub highlight_margin_px: f64,
}

impl Default for PointConfig {
    fn default() -> Self {
        Self {
            size: 0.05,
            size_mode: SizeMode::Meter,
            color: Color::rgba(1.0, 0.525, 0.49, 1.0),
            border_color: Color::BLACK,
            border_width: 1.0,
            shape: Marker::Circle,
            highlight_margin_px: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PointData {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PointShape {
    pub config: PointConfig,
    pub data: PointData,
}

impl PointShape {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            config: PointConfig::default(),
            data: PointData { x, y },
        }
    }

    pub fn radius_px(&self, scale: f64) -> f64 {
        self.config.size_mode.to_px(self.config.size, scale)
    }

    pub fn draw(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle, surface: &mut dyn DrawSurface) {
        let center = transform.world_to_canvas(Point2::new(self.data.x, self.data.y));
        let radius = self.radius_px(transform.scale());
        let stroke = Stroke::new(self.config.border_width, style.tint(self.config.border_color, 1.0));

        draw_marker(
            surface,
            center,
            radius,
            self.config.shape,
            style.tint(self.config.color, 1.0),
            stroke.is_visible().then_some(stroke),
        );
        if style.highlight {
            draw_highlight_ring(surface, center, radius + self.config.highlight_margin_px, style);
        }
    }

    pub fn label_position(&self, transform: &dyn CoordinateTransform, style: &ShapeStyle) -> LabelAnchor {
        let center = transform.world_to_canvas(Point2::new(self.data.x, self.data.y));
        let mut extent = self.radius_px(transform.scale());
        if style.highlight {
            extent += self.config.highlight_margin_px;
        }
        north_of(center, extent)
    }
}
