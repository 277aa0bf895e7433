//! 视觉属性定义
//!
//! 颜色（归一化 RGBA）、尺寸单位模式、线型与描边。

use serde::{Deserialize, Serialize};

/// RGBA颜色，各分量取值 [0.0, 1.0]
///
/// 序列化为 `[r, g, b, a]` 数组，也接受省略 alpha 的 `[r, g, b]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorRepr", into = "[f64; 4]")]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Rgba([f64; 4]),
    Rgb([f64; 3]),
}

impl From<ColorRepr> for Color {
    fn from(repr: ColorRepr) -> Self {
        match repr {
            ColorRepr::Rgba([r, g, b, a]) => Color::rgba(r, g, b, a),
            ColorRepr::Rgb([r, g, b]) => Color::rgb(r, g, b),
        }
    }
}

impl From<Color> for [f64; 4] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

impl Color {
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// 替换 alpha
    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// alpha 乘以系数
    pub fn multiply_alpha(self, factor: f64) -> Self {
        self.with_alpha(self.a * factor)
    }

    /// 转换为 8 位 RGBA（未预乘）
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// 尺寸单位模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    /// 世界单位（米），随缩放变化
    #[default]
    Meter,
    /// 屏幕像素，不随缩放变化
    Pixel,
}

impl SizeMode {
    /// 将数值换算为屏幕像素
    #[inline]
    pub fn to_px(self, value: f64, scale: f64) -> f64 {
        match self {
            SizeMode::Meter => value * scale,
            SizeMode::Pixel => value,
        }
    }

    /// 将数值换算为世界单位
    #[inline]
    pub fn to_world(self, value: f64, scale: f64) -> f64 {
        match self {
            SizeMode::Meter => value,
            SizeMode::Pixel if scale > 0.0 => value / scale,
            SizeMode::Pixel => 0.0,
        }
    }
}

/// 线型
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// 按像素尺寸生成屏幕空间图案
    pub fn pattern(self, dash_px: [f64; 2], dot_px: [f64; 2]) -> LinePattern {
        match self {
            LineStyle::Solid => LinePattern::Solid,
            LineStyle::Dashed => LinePattern::Dashed {
                dash: dash_px[0],
                gap: dash_px[1],
            },
            LineStyle::Dotted => LinePattern::Dotted {
                dot: dot_px[0],
                gap: dot_px[1],
            },
        }
    }
}

/// 屏幕空间的线条图案
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinePattern {
    Solid,
    /// 实线段长度与间隔（像素）
    Dashed { dash: f64, gap: f64 },
    /// 点直径与间隔（像素）
    Dotted { dot: f64, gap: f64 },
}

/// 描边
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    /// 线宽（像素）
    pub width: f64,
    pub color: Color,
}

impl Stroke {
    pub fn new(width: f64, color: Color) -> Self {
        Self { width, color }
    }

    /// 零宽度或全透明的描边不需要绘制
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.color.a > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    #[test]
    fn test_color_serde() {
        let c: Color = serde_json::from_str("[0.5, 0.25, 1.0]").unwrap();
        assert!(approx_eq(c.a, 1.0));

        let c: Color = serde_json::from_str("[1, 0, 0, 0.35]").unwrap();
        assert!(approx_eq(c.a, 0.35));
        assert_eq!(serde_json::to_string(&c).unwrap(), "[1.0,0.0,0.0,0.35]");
    }

    #[test]
    fn test_alpha() {
        let c = Color::RED.multiply_alpha(0.3);
        assert!(approx_eq(c.a, 0.3));
        assert_eq!(Color::rgb(1.0, 0.5, 0.0).to_rgba8(), [255, 128, 0, 255]);
    }

    #[test]
    fn test_size_mode() {
        assert!(approx_eq(SizeMode::Meter.to_px(0.05, 200.0), 10.0));
        assert!(approx_eq(SizeMode::Pixel.to_px(6.0, 200.0), 6.0));
        assert!(approx_eq(SizeMode::Pixel.to_world(10.0, 200.0), 0.05));
    }
}
