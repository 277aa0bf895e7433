//! 绘制契约
//!
//! 场景模型只依赖两个外部协作者：
//! - [`CoordinateTransform`]：世界→屏幕的缩放与投影（只读）
//! - [`DrawSurface`]：接受屏幕空间图元的2D绘制表面
//!
//! 另提供 [`RecordingSurface`] 与 [`FixedTransform`]，用于无窗口环境下
//! 检查绘制输出。

use crate::math::{Point2, Vector2};
use crate::properties::{Color, LinePattern, Stroke};

/// 坐标变换提供者
pub trait CoordinateTransform {
    /// 世界单位到屏幕像素的比例
    fn scale(&self) -> f64;

    /// 世界坐标投影到画布坐标（像素）
    fn world_to_canvas(&self, world: Point2) -> Point2;
}

/// 文本水平对齐
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// 文本垂直基线
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Middle,
    Bottom,
}

/// 标注锚点（屏幕坐标）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelAnchor {
    pub x: f64,
    pub y: f64,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

impl LabelAnchor {
    pub fn new(x: f64, y: f64, align: TextAlign, baseline: TextBaseline) -> Self {
        Self {
            x,
            y,
            align,
            baseline,
        }
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// 2D绘制表面，所有坐标与尺寸均为屏幕像素
pub trait DrawSurface {
    /// 圆（可选填充与描边）
    fn circle(&mut self, center: Point2, radius: f64, fill: Option<Color>, stroke: Option<Stroke>);

    /// 闭合多边形（可选填充与描边）
    fn polygon(&mut self, points: &[Point2], fill: Option<Color>, stroke: Option<Stroke>);

    /// 开放折线
    fn polyline(&mut self, points: &[Point2], stroke: Stroke, pattern: LinePattern);

    /// 文本
    fn text(&mut self, anchor: &LabelAnchor, text: &str, font_px: f64, color: Color);

    /// 文本渲染尺寸（宽, 高）
    fn measure_text(&self, text: &str, font_px: f64) -> Vector2;

    /// 设备像素比，用于文本像素对齐
    fn pixels_per_point(&self) -> f64 {
        1.0
    }
}

/// 记录下来的绘制命令
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Circle {
        center: Point2,
        radius: f64,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Polygon {
        points: Vec<Point2>,
        fill: Option<Color>,
        stroke: Option<Stroke>,
    },
    Polyline {
        points: Vec<Point2>,
        stroke: Stroke,
        pattern: LinePattern,
    },
    Text {
        anchor: LabelAnchor,
        text: String,
        font_px: f64,
        color: Color,
    },
}

/// 只记录命令的绘制表面
///
/// 文本宽度按 `0.6 × 字号 × 字符数` 估算，高度等于字号。
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn circles(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Circle { .. }))
    }

    pub fn texts(&self) -> impl Iterator<Item = (&LabelAnchor, &str)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { anchor, text, .. } => Some((anchor, text.as_str())),
            _ => None,
        })
    }
}

impl DrawSurface for RecordingSurface {
    fn circle(&mut self, center: Point2, radius: f64, fill: Option<Color>, stroke: Option<Stroke>) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            fill,
            stroke,
        });
    }

    fn polygon(&mut self, points: &[Point2], fill: Option<Color>, stroke: Option<Stroke>) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            fill,
            stroke,
        });
    }

    fn polyline(&mut self, points: &[Point2], stroke: Stroke, pattern: LinePattern) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            stroke,
            pattern,
        });
    }

    fn text(&mut self, anchor: &LabelAnchor, text: &str, font_px: f64, color: Color) {
        self.commands.push(DrawCommand::Text {
            anchor: *anchor,
            text: text.to_string(),
            font_px,
            color,
        });
    }

    fn measure_text(&self, text: &str, font_px: f64) -> Vector2 {
        Vector2::new(0.6 * font_px * text.chars().count() as f64, font_px)
    }
}

/// 固定比例的变换：世界原点映射到 `origin`，Y 轴向上
#[derive(Debug, Clone, Copy)]
pub struct FixedTransform {
    pub scale: f64,
    pub origin: Point2,
}

impl FixedTransform {
    pub fn new(scale: f64, origin: Point2) -> Self {
        Self { scale, origin }
    }
}

impl CoordinateTransform for FixedTransform {
    fn scale(&self) -> f64 {
        self.scale
    }

    fn world_to_canvas(&self, world: Point2) -> Point2 {
        Point2::new(
            self.origin.x + world.x * self.scale,
            self.origin.y - world.y * self.scale,
        )
    }
}
