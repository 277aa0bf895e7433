//! 标注布局
//!
//! 所有计算都在屏幕空间（像素）进行，每次绘制重新计算，不保留状态。
//! 简单图形使用固定方向偏移；朝向体（Agent）需要避开航向箭头，
//! 放在身后并在与本体重叠时沿切向滑开。

use crate::math::{perpendicular, try_normalize, BoundingBox2, Point2, Vector2};
use crate::surface::{LabelAnchor, TextAlign, TextBaseline};

/// 本体边缘与标注之间的间隙（像素）
pub const LABEL_GAP_PX: f64 = 4.0;

/// 标注离中心的最小距离（像素）
pub const MIN_CLEARANCE_PX: f64 = 8.0;

/// 本体半径/半尺寸 + 间隙，不小于最小距离
#[inline]
pub fn body_clearance(extent_px: f64) -> f64 {
    (extent_px.max(0.0) + LABEL_GAP_PX).max(MIN_CLEARANCE_PX)
}

/// 按设备像素取整，保证文字清晰
#[inline]
pub fn snap_to_pixel(value: f64, pixels_per_point: f64) -> f64 {
    if pixels_per_point <= 0.0 {
        return value.round();
    }
    (value * pixels_per_point).round() / pixels_per_point
}

/// 根据偏移方向选择对齐方式，使文本朝远离本体的方向展开
fn alignment_for(direction: &Vector2) -> (TextAlign, TextBaseline) {
    const THRESHOLD: f64 = 0.3;
    let align = if direction.x > THRESHOLD {
        TextAlign::Left
    } else if direction.x < -THRESHOLD {
        TextAlign::Right
    } else {
        TextAlign::Center
    };
    let baseline = if direction.y < -THRESHOLD {
        TextBaseline::Bottom
    } else if direction.y > THRESHOLD {
        TextBaseline::Top
    } else {
        TextBaseline::Middle
    };
    (align, baseline)
}

/// 放在本体正上方（屏幕北向）
pub fn north_of(center: Point2, extent_px: f64) -> LabelAnchor {
    LabelAnchor::new(
        center.x,
        center.y - body_clearance(extent_px),
        TextAlign::Center,
        TextBaseline::Bottom,
    )
}

/// 线段标注：放在中点沿法线偏移处，法线取屏幕上方一侧
pub fn along_normal(start: Point2, end: Point2, offset_px: f64) -> LabelAnchor {
    let mid = Point2::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
    let Some(dir) = try_normalize(&(end - start)) else {
        return north_of(mid, 0.0);
    };

    let mut normal = perpendicular(&dir);
    if normal.y > 0.0 {
        normal = -normal;
    }
    let pos = mid + normal * offset_px.max(0.0);
    let (align, baseline) = alignment_for(&normal);
    LabelAnchor::new(pos.x, pos.y, align, baseline)
}

/// 坐标系标注：放在两轴方向和的反方向
pub fn away_from_axes(origin: Point2, x_axis: Vector2, y_axis: Vector2, extent_px: f64) -> LabelAnchor {
    let away = try_normalize(&-(x_axis + y_axis)).unwrap_or_else(|| Vector2::new(0.0, -1.0));
    let pos = origin + away * body_clearance(extent_px);
    let (align, baseline) = alignment_for(&away);
    LabelAnchor::new(pos.x, pos.y, align, baseline)
}

/// 朝向体标注
///
/// - `forward`：屏幕空间中从中心指向箭头尖端的方向
/// - `label_size`：文本渲染尺寸（宽, 高）
///
/// 先把标注放在身后 `clearance + 半高` 处；若外扩 `clearance` 后的标注框
/// 仍包含中心，则沿切向滑动最小距离，使竖直方向刚好分离。
pub fn around_agent(
    center: Point2,
    forward: Vector2,
    body_extent_px: f64,
    label_size: Vector2,
    pixels_per_point: f64,
) -> LabelAnchor {
    let forward = try_normalize(&forward).unwrap_or_else(|| Vector2::new(1.0, 0.0));
    let tangent = perpendicular(&forward);
    let clearance = body_clearance(body_extent_px);
    let half_w = label_size.x.max(0.0) / 2.0;
    let half_h = label_size.y.max(0.0) / 2.0;

    let mut anchor = center - forward * (clearance + half_h);
    let mut y = None;

    let expanded = BoundingBox2::from_center(anchor, half_w, half_h).expanded(clearance);
    if expanded.contains_strict(&center) && tangent.y.abs() > 1e-6 {
        let dy = anchor.y - center.y;
        let needed = half_h + clearance - dy.abs();
        // 默认向屏幕上方滑动
        let direction = if dy > 1e-9 { 1.0 } else { -1.0 };
        let slide = direction * needed / tangent.y;
        anchor += tangent * slide;
        // 取整时只能远离中心，否则会重新压到本体上
        y = Some(snap_away(anchor.y, direction, pixels_per_point));
    }

    LabelAnchor::new(
        snap_to_pixel(anchor.x, pixels_per_point),
        y.unwrap_or_else(|| snap_to_pixel(anchor.y, pixels_per_point)),
        TextAlign::Center,
        TextBaseline::Middle,
    )
}

fn snap_away(value: f64, direction: f64, pixels_per_point: f64) -> f64 {
    let ppp = if pixels_per_point > 0.0 { pixels_per_point } else { 1.0 };
    let scaled = value * ppp;
    let snapped = if direction < 0.0 {
        (scaled + 1e-6).floor()
    } else {
        (scaled - 1e-6).ceil()
    };
    snapped / ppp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    fn label_box(anchor: &LabelAnchor, size: Vector2) -> BoundingBox2 {
        BoundingBox2::from_center(anchor.position(), size.x / 2.0, size.y / 2.0)
    }

    #[test]
    fn test_north_of_respects_minimum() {
        let a = north_of(Point2::new(100.0, 100.0), 1.0);
        assert!(approx_eq(a.y, 92.0));
        assert_eq!(a.baseline, TextBaseline::Bottom);

        let a = north_of(Point2::new(100.0, 100.0), 10.0);
        assert!(approx_eq(a.y, 86.0));
    }

    #[test]
    fn test_along_normal_points_up() {
        // 水平线：标注在上方
        let a = along_normal(Point2::new(0.0, 50.0), Point2::new(100.0, 50.0), 8.0);
        assert!(approx_eq(a.x, 50.0));
        assert!(approx_eq(a.y, 42.0));

        // 反向绘制结果相同
        let b = along_normal(Point2::new(100.0, 50.0), Point2::new(0.0, 50.0), 8.0);
        assert!(approx_eq(b.y, 42.0));
    }

    #[test]
    fn test_away_from_axes() {
        // 屏幕中 x 轴向右、y 轴向上 → 标注在左下
        let a = away_from_axes(
            Point2::new(100.0, 100.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, -1.0),
            2.0,
        );
        assert!(a.x < 100.0);
        assert!(a.y > 100.0);
        assert_eq!(a.align, TextAlign::Right);
        assert_eq!(a.baseline, TextBaseline::Top);
    }

    #[test]
    fn test_agent_label_behind_when_heading_vertical() {
        let size = Vector2::new(60.0, 12.0);
        // 屏幕上朝上：标注放在正下方，无需滑动
        let a = around_agent(Point2::new(200.0, 200.0), Vector2::new(0.0, -1.0), 10.0, size, 1.0);
        assert!(approx_eq(a.x, 200.0));
        assert!(approx_eq(a.y, 200.0 + 14.0 + 6.0));
    }

    #[test]
    fn test_agent_label_slides_clear_of_body() {
        let size = Vector2::new(60.0, 12.0);
        let center = Point2::new(200.0, 200.0);
        for forward in [
            Vector2::new(1.0, 0.0),
            Vector2::new(-1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(-0.3, 1.0),
        ] {
            let a = around_agent(center, forward, 10.0, size, 1.0);
            let clearance = body_clearance(10.0);
            let expanded = label_box(&a, size).expanded(clearance);
            assert!(
                !expanded.contains_strict(&center),
                "label overlaps body for heading {forward:?}"
            );
        }
    }

    #[test]
    fn test_agent_label_is_pixel_snapped() {
        let a = around_agent(
            Point2::new(10.3, 20.7),
            Vector2::new(0.6, -0.8),
            5.0,
            Vector2::new(33.0, 12.0),
            2.0,
        );
        assert!(approx_eq(a.x * 2.0, (a.x * 2.0).round()));
        assert!(approx_eq(a.y * 2.0, (a.y * 2.0).round()));
    }
}
