//! egui 绘制表面
//!
//! 把场景的屏幕空间图元转换为 `egui::Shape`，提交给 `egui::Painter`。

use egui::{Align2, Color32, FontId, Painter, Pos2};
use mapscene_core::math::{Point2, Vector2};
use mapscene_core::properties::{Color, LinePattern, Stroke};
use mapscene_core::surface::{DrawSurface, LabelAnchor, TextAlign, TextBaseline};

/// 基于 `egui::Painter` 的绘制表面
pub struct EguiSurface<'a> {
    painter: &'a Painter,
}

impl<'a> EguiSurface<'a> {
    pub fn new(painter: &'a Painter) -> Self {
        Self { painter }
    }
}

pub fn to_color32(color: Color) -> Color32 {
    let [r, g, b, a] = color.to_rgba8();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn to_pos(p: Point2) -> Pos2 {
    Pos2::new(p.x as f32, p.y as f32)
}

fn to_stroke(stroke: Stroke) -> egui::Stroke {
    egui::Stroke::new(stroke.width as f32, to_color32(stroke.color))
}

fn align2(align: TextAlign, baseline: TextBaseline) -> Align2 {
    match (align, baseline) {
        (TextAlign::Left, TextBaseline::Top) => Align2::LEFT_TOP,
        (TextAlign::Left, TextBaseline::Middle) => Align2::LEFT_CENTER,
        (TextAlign::Left, TextBaseline::Bottom) => Align2::LEFT_BOTTOM,
        (TextAlign::Center, TextBaseline::Top) => Align2::CENTER_TOP,
        (TextAlign::Center, TextBaseline::Middle) => Align2::CENTER_CENTER,
        (TextAlign::Center, TextBaseline::Bottom) => Align2::CENTER_BOTTOM,
        (TextAlign::Right, TextBaseline::Top) => Align2::RIGHT_TOP,
        (TextAlign::Right, TextBaseline::Middle) => Align2::RIGHT_CENTER,
        (TextAlign::Right, TextBaseline::Bottom) => Align2::RIGHT_BOTTOM,
    }
}

impl DrawSurface for EguiSurface<'_> {
    fn circle(&mut self, center: Point2, radius: f64, fill: Option<Color>, stroke: Option<Stroke>) {
        let center = to_pos(center);
        let radius = radius as f32;
        if let Some(fill) = fill {
            self.painter.circle_filled(center, radius, to_color32(fill));
        }
        if let Some(stroke) = stroke.filter(Stroke::is_visible) {
            self.painter.circle_stroke(center, radius, to_stroke(stroke));
        }
    }

    fn polygon(&mut self, points: &[Point2], fill: Option<Color>, stroke: Option<Stroke>) {
        if points.len() < 3 {
            return;
        }
        let points: Vec<Pos2> = points.iter().copied().map(to_pos).collect();
        let fill = fill.map(to_color32).unwrap_or(Color32::TRANSPARENT);
        let stroke = stroke
            .filter(Stroke::is_visible)
            .map(to_stroke)
            .unwrap_or(egui::Stroke::NONE);
        self.painter
            .add(egui::Shape::convex_polygon(points, fill, stroke));
    }

    fn polyline(&mut self, points: &[Point2], stroke: Stroke, pattern: LinePattern) {
        if points.len() < 2 {
            return;
        }
        let path: Vec<Pos2> = points.iter().copied().map(to_pos).collect();
        let egui_stroke = to_stroke(stroke);
        match pattern {
            LinePattern::Solid => {
                self.painter.add(egui::Shape::line(path, egui_stroke));
            }
            LinePattern::Dashed { dash, gap } => {
                self.painter.extend(egui::Shape::dashed_line(
                    &path,
                    egui_stroke,
                    dash as f32,
                    gap as f32,
                ));
            }
            LinePattern::Dotted { dot, gap } => {
                let radius = (dot.max(stroke.width) / 2.0) as f32;
                let spacing = (dot + gap) as f32;
                self.painter.extend(egui::Shape::dotted_line(
                    &path,
                    egui_stroke.color,
                    spacing,
                    radius,
                ));
            }
        }
    }

    fn text(&mut self, anchor: &LabelAnchor, text: &str, font_px: f64, color: Color) {
        self.painter.text(
            to_pos(anchor.position()),
            align2(anchor.align, anchor.baseline),
            text,
            FontId::proportional(font_px as f32),
            to_color32(color),
        );
    }

    fn measure_text(&self, text: &str, font_px: f64) -> Vector2 {
        let galley = self.painter.layout_no_wrap(
            text.to_string(),
            FontId::proportional(font_px as f32),
            Color32::WHITE,
        );
        let size = galley.size();
        Vector2::new(size.x as f64, size.y as f64)
    }

    fn pixels_per_point(&self) -> f64 {
        self.painter.ctx().pixels_per_point() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion() {
        let c = to_color32(Color::rgba(1.0, 0.0, 0.0, 0.5));
        assert_eq!(c, Color32::from_rgba_unmultiplied(255, 0, 0, 128));
    }

    #[test]
    fn test_alignment_mapping() {
        assert_eq!(align2(TextAlign::Center, TextBaseline::Bottom), Align2::CENTER_BOTTOM);
        assert_eq!(align2(TextAlign::Left, TextBaseline::Middle), Align2::LEFT_CENTER);
    }
}
