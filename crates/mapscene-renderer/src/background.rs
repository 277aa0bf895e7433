//! 地图背景
//!
//! 绘制顺序：底色 → 棋盘格 → 网格 → 边框 → 原点坐标系。
//! 所有图元只在可见区域内生成。

use crate::camera::Camera2D;
use crate::map_config::MapConfig;
use mapscene_core::math::{BoundingBox2, Point2};
use mapscene_core::properties::{LinePattern, Stroke};
use mapscene_core::shapes::{CoordinateSystemConfig, CoordinateSystemData, CoordinateSystemShape, ShapeStyle};
use mapscene_core::surface::{CoordinateTransform, DrawSurface};
use tracing::trace;

/// 单帧最多绘制的棋盘格数量，超出时跳过棋盘格
pub const MAX_TILES: usize = 20_000;

const DASH_PX: [f64; 2] = [6.0, 4.0];
const DOT_PX: [f64; 2] = [1.0, 4.0];

/// 自适应网格间距：保证相邻网格线在屏幕上相距 20~200 像素
pub fn grid_spacing(base: f64, zoom: f64, adaptive: bool) -> f64 {
    if !adaptive || base <= 0.0 || zoom <= 0.0 {
        return base;
    }
    let mut spacing = base;
    while spacing * zoom < 20.0 {
        spacing *= 5.0;
    }
    while spacing * zoom > 200.0 {
        spacing /= 5.0;
    }
    spacing
}

/// 绘制完整背景
pub fn draw_background(config: &MapConfig, camera: &Camera2D, surface: &mut dyn DrawSurface) {
    let limits = config.bounds();
    let visible = camera.visible_bounds();

    if config.background_color.a > 0.0 {
        let vp = BoundingBox2::new(
            camera.viewport_origin,
            Point2::new(
                camera.viewport_origin.x + camera.viewport_width,
                camera.viewport_origin.y + camera.viewport_height,
            ),
        );
        surface.polygon(&corners(&vp), Some(config.background_color), None);
    }
    if config.map_color.a > 0.0 {
        surface.polygon(&screen_corners(camera, &limits), Some(config.map_color), None);
    }

    if config.tiles {
        draw_tiles(config, camera, &limits, &visible, surface);
    }
    if config.show_grid {
        draw_grid(config, camera, &limits, &visible, surface);
    }
    draw_border(config, camera, &limits, surface);
    if config.show_origin_frame {
        draw_origin_frame(config, camera, surface);
    }
}

fn corners(b: &BoundingBox2) -> [Point2; 4] {
    [
        Point2::new(b.min.x, b.min.y),
        Point2::new(b.max.x, b.min.y),
        Point2::new(b.max.x, b.max.y),
        Point2::new(b.min.x, b.max.y),
    ]
}

fn screen_corners(camera: &Camera2D, world: &BoundingBox2) -> [Point2; 4] {
    corners(world).map(|p| camera.world_to_canvas(p))
}

/// 棋盘格：以地图下限为起点，相邻格颜色交替
fn draw_tiles(
    config: &MapConfig,
    camera: &Camera2D,
    limits: &BoundingBox2,
    visible: &BoundingBox2,
    surface: &mut dyn DrawSurface,
) {
    let size = config.tile_size;
    if size <= 0.0 || !limits.intersects(visible) {
        return;
    }

    let cols = (limits.width() / size).ceil() as i64;
    let rows = (limits.height() / size).ceil() as i64;
    let col_range = (
        (((visible.min.x - limits.min.x) / size).floor() as i64).max(0),
        (((visible.max.x - limits.min.x) / size).ceil() as i64).min(cols),
    );
    let row_range = (
        (((visible.min.y - limits.min.y) / size).floor() as i64).max(0),
        (((visible.max.y - limits.min.y) / size).ceil() as i64).min(rows),
    );

    let count = (col_range.1 - col_range.0).max(0) as usize * (row_range.1 - row_range.0).max(0) as usize;
    if count > MAX_TILES {
        trace!(count, "Too many tiles in view, skipping");
        return;
    }

    let border = Stroke::new(config.tile_border_width, config.tile_border_color);
    let border = border.is_visible().then_some(border);
    for i in col_range.0..col_range.1 {
        for j in row_range.0..row_range.1 {
            let min = Point2::new(limits.min.x + i as f64 * size, limits.min.y + j as f64 * size);
            let max = Point2::new(
                (min.x + size).min(limits.max.x),
                (min.y + size).min(limits.max.y),
            );
            let color = config.tile_colors[((i + j) % 2) as usize];
            surface.polygon(
                &screen_corners(camera, &BoundingBox2::new(min, max)),
                Some(color),
                border,
            );
        }
    }
}

/// 网格：先次网格再主网格，线条限制在地图范围内
fn draw_grid(
    config: &MapConfig,
    camera: &Camera2D,
    limits: &BoundingBox2,
    visible: &BoundingBox2,
    surface: &mut dyn DrawSurface,
) {
    let major = grid_spacing(config.major_grid_size, camera.zoom, config.adaptive_grid);
    let minor = if config.major_grid_size > 0.0 {
        major * config.minor_grid_size / config.major_grid_size
    } else {
        0.0
    };

    let minor_stroke = Stroke::new(config.minor_grid_width, config.minor_grid_color);
    let major_stroke = Stroke::new(config.major_grid_width, config.major_grid_color);
    draw_grid_lines(
        camera,
        limits,
        visible,
        minor,
        minor_stroke,
        config.minor_grid_style.pattern(DASH_PX, DOT_PX),
        surface,
    );
    draw_grid_lines(
        camera,
        limits,
        visible,
        major,
        major_stroke,
        config.major_grid_style.pattern(DASH_PX, DOT_PX),
        surface,
    );
}

fn draw_grid_lines(
    camera: &Camera2D,
    limits: &BoundingBox2,
    visible: &BoundingBox2,
    spacing: f64,
    stroke: Stroke,
    pattern: LinePattern,
    surface: &mut dyn DrawSurface,
) {
    // 间距小于 2 像素时不绘制
    if spacing <= 0.0 || spacing * camera.zoom < 2.0 || !stroke.is_visible() {
        return;
    }

    let x0 = limits.min.x.max(visible.min.x);
    let x1 = limits.max.x.min(visible.max.x);
    let y0 = limits.min.y.max(visible.min.y);
    let y1 = limits.max.y.min(visible.max.y);
    if x0 > x1 || y0 > y1 {
        return;
    }

    let mut x = ((x0 - limits.min.x) / spacing).ceil() * spacing + limits.min.x;
    while x <= x1 + 1e-9 {
        let a = camera.world_to_canvas(Point2::new(x, y0));
        let b = camera.world_to_canvas(Point2::new(x, y1));
        surface.polyline(&[a, b], stroke, pattern);
        x += spacing;
    }

    let mut y = ((y0 - limits.min.y) / spacing).ceil() * spacing + limits.min.y;
    while y <= y1 + 1e-9 {
        let a = camera.world_to_canvas(Point2::new(x0, y));
        let b = camera.world_to_canvas(Point2::new(x1, y));
        surface.polyline(&[a, b], stroke, pattern);
        y += spacing;
    }
}

fn draw_border(config: &MapConfig, camera: &Camera2D, limits: &BoundingBox2, surface: &mut dyn DrawSurface) {
    let stroke = Stroke::new(config.map_border_width, config.map_border_color);
    if !stroke.is_visible() {
        return;
    }
    surface.polygon(&screen_corners(camera, limits), None, Some(stroke));
}

/// 原点坐标系，复用场景中的坐标系图形
fn draw_origin_frame(config: &MapConfig, camera: &Camera2D, surface: &mut dyn DrawSurface) {
    let frame = CoordinateSystemShape {
        config: CoordinateSystemConfig {
            length: config.coordinate_system_size,
            width: config.coordinate_system_width / camera.scale(),
            opacity: config.coordinate_system_alpha,
            ..CoordinateSystemConfig::default()
        },
        data: CoordinateSystemData {
            x: config.origin[0],
            y: config.origin[1],
            psi: 0.0,
        },
    };
    frame.draw(camera, &ShapeStyle::default(), surface);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscene_core::math::approx_eq;
    use mapscene_core::surface::{DrawCommand, RecordingSurface};

    fn camera_over(config: &MapConfig) -> Camera2D {
        let mut camera = Camera2D::new(600.0, 600.0);
        camera.look_at(config.initial_center(), &config.bounds(), 1.0);
        camera
    }

    #[test]
    fn test_grid_spacing_adapts() {
        assert!(approx_eq(grid_spacing(1.0, 100.0, false), 1.0));
        assert!(approx_eq(grid_spacing(1.0, 5.0, true), 5.0));
        assert!(approx_eq(grid_spacing(1.0, 1000.0, true), 0.2));
    }

    #[test]
    fn test_tiles_cover_limits() {
        let config = MapConfig {
            show_origin_frame: false,
            ..MapConfig::default()
        };
        let camera = camera_over(&config);
        let mut surface = RecordingSurface::new();
        draw_background(&config, &camera, &mut surface);

        let fills: Vec<_> = surface
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polygon { fill: Some(fill), .. } => Some(*fill),
                _ => None,
            })
            .collect();
        // 3m × 3m，0.5m 一格
        assert_eq!(fills.len(), 36);
        assert_eq!(fills[0], config.tile_colors[0]);
        assert_eq!(fills[1], config.tile_colors[1]);
    }

    #[test]
    fn test_grid_lines_within_limits() {
        let config = MapConfig {
            tiles: false,
            show_grid: true,
            show_origin_frame: false,
            ..MapConfig::default()
        };
        let camera = camera_over(&config);
        let mut surface = RecordingSurface::new();
        draw_background(&config, &camera, &mut surface);

        let lines = surface
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Polyline { .. }))
            .count();
        // 次网格 0.5m：每个方向 7 条；主网格 1m：每个方向 4 条
        assert_eq!(lines, 2 * 7 + 2 * 4);
    }

    #[test]
    fn test_border_is_last_without_frame() {
        let config = MapConfig {
            tiles: false,
            show_origin_frame: false,
            ..MapConfig::default()
        };
        let camera = camera_over(&config);
        let mut surface = RecordingSurface::new();
        draw_background(&config, &camera, &mut surface);

        assert!(matches!(
            surface.commands.last(),
            Some(DrawCommand::Polygon { fill: None, stroke: Some(_), .. })
        ));
    }
}
