//! 2D相机
//!
//! 处理平移、缩放和视口变换，同时作为场景绘制时的坐标变换提供者。

use mapscene_core::math::{BoundingBox2, Point2, Vector2};
use mapscene_core::surface::CoordinateTransform;

/// 2D相机
#[derive(Debug, Clone)]
pub struct Camera2D {
    /// 相机中心位置（世界坐标）
    pub center: Point2,

    /// 缩放级别（像素/单位）
    pub zoom: f64,

    /// 视口左上角（屏幕坐标）
    pub viewport_origin: Point2,

    /// 视口宽度（像素）
    pub viewport_width: f64,

    /// 视口高度（像素）
    pub viewport_height: f64,

    /// 最小缩放
    pub min_zoom: f64,

    /// 最大缩放
    pub max_zoom: f64,
}

impl Camera2D {
    /// 创建新的相机
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            center: Point2::origin(),
            zoom: 100.0,
            viewport_origin: Point2::origin(),
            viewport_width,
            viewport_height,
            min_zoom: 1.0,
            max_zoom: 100_000.0,
        }
    }

    /// 更新视口位置与大小
    pub fn set_viewport(&mut self, origin: Point2, width: f64, height: f64) {
        self.viewport_origin = origin;
        self.viewport_width = width;
        self.viewport_height = height;
    }

    fn viewport_center(&self) -> Point2 {
        Point2::new(
            self.viewport_origin.x + self.viewport_width / 2.0,
            self.viewport_origin.y + self.viewport_height / 2.0,
        )
    }

    /// 按屏幕像素拖动；拖动方向即内容移动方向
    pub fn pan(&mut self, delta_px: Vector2) {
        self.center.x -= delta_px.x / self.zoom;
        self.center.y += delta_px.y / self.zoom;
    }

    /// 缩放相机（以指定屏幕点为中心）
    pub fn zoom_at(&mut self, screen_point: Point2, factor: f64) {
        let world_before = self.screen_to_world(screen_point);

        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);

        let world_after = self.screen_to_world(screen_point);
        self.center += world_before - world_after;
    }

    /// 缩放到指定区域
    pub fn zoom_to_fit(&mut self, bbox: &BoundingBox2, padding: f64) {
        let width = bbox.width() + padding * 2.0;
        let height = bbox.height() + padding * 2.0;
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        let zoom_x = self.viewport_width / width;
        let zoom_y = self.viewport_height / height;

        self.zoom = zoom_x.min(zoom_y).clamp(self.min_zoom, self.max_zoom);
        self.center = bbox.center();
    }

    /// 以 `center` 为中心，使 `bbox` 占据视口的 `fraction`
    pub fn look_at(&mut self, center: Point2, bbox: &BoundingBox2, fraction: f64) {
        self.zoom_to_fit(bbox, 0.0);
        self.zoom = (self.zoom * fraction.max(0.01)).clamp(self.min_zoom, self.max_zoom);
        self.center = center;
    }

    /// 屏幕坐标转世界坐标
    pub fn screen_to_world(&self, screen: Point2) -> Point2 {
        let c = self.viewport_center();
        let x = (screen.x - c.x) / self.zoom + self.center.x;
        let y = (c.y - screen.y) / self.zoom + self.center.y;
        Point2::new(x, y)
    }

    /// 世界坐标转屏幕坐标
    pub fn world_to_screen(&self, world: Point2) -> Point2 {
        let c = self.viewport_center();
        let x = (world.x - self.center.x) * self.zoom + c.x;
        let y = c.y - (world.y - self.center.y) * self.zoom;
        Point2::new(x, y)
    }

    /// 获取当前可见的世界区域
    pub fn visible_bounds(&self) -> BoundingBox2 {
        let half_width = self.viewport_width / 2.0 / self.zoom;
        let half_height = self.viewport_height / 2.0 / self.zoom;

        BoundingBox2::new(
            Point2::new(self.center.x - half_width, self.center.y - half_height),
            Point2::new(self.center.x + half_width, self.center.y + half_height),
        )
    }
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl CoordinateTransform for Camera2D {
    fn scale(&self) -> f64 {
        self.zoom
    }

    fn world_to_canvas(&self, world: Point2) -> Point2 {
        self.world_to_screen(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscene_core::math::{approx_eq, approx_eq_tol};

    #[test]
    fn test_coordinate_conversion() {
        let mut camera = Camera2D::new(800.0, 600.0);
        camera.set_viewport(Point2::new(200.0, 30.0), 800.0, 600.0);

        let world = Point2::new(1.5, -0.5);
        let screen = camera.world_to_screen(world);
        let back = camera.screen_to_world(screen);

        assert!(approx_eq(world.x, back.x));
        assert!(approx_eq(world.y, back.y));
    }

    #[test]
    fn test_y_axis_points_up() {
        let camera = Camera2D::new(800.0, 600.0);
        let a = camera.world_to_screen(Point2::new(0.0, 0.0));
        let b = camera.world_to_screen(Point2::new(0.0, 1.0));
        assert!(b.y < a.y);
        assert!(approx_eq(a.y - b.y, camera.zoom));
    }

    #[test]
    fn test_zoom_at_keeps_cursor_fixed() {
        let mut camera = Camera2D::new(800.0, 600.0);
        let cursor = Point2::new(650.0, 120.0);
        let before = camera.screen_to_world(cursor);
        camera.zoom_at(cursor, 2.5);
        let after = camera.screen_to_world(cursor);

        assert!(approx_eq_tol(before.x, after.x, 1e-9));
        assert!(approx_eq_tol(before.y, after.y, 1e-9));
    }

    #[test]
    fn test_pan_moves_content_with_drag() {
        let mut camera = Camera2D::new(800.0, 600.0);
        let p = Point2::new(1.0, 1.0);
        let before = camera.world_to_screen(p);
        camera.pan(Vector2::new(10.0, -20.0));
        let after = camera.world_to_screen(p);

        assert!(approx_eq_tol(after.x - before.x, 10.0, 1e-9));
        assert!(approx_eq_tol(after.y - before.y, -20.0, 1e-9));
    }

    #[test]
    fn test_look_at_fraction() {
        let mut camera = Camera2D::new(600.0, 600.0);
        let limits = BoundingBox2::new(Point2::new(0.0, 0.0), Point2::new(3.0, 3.0));
        camera.look_at(Point2::new(1.5, 1.5), &limits, 0.75);

        assert!(approx_eq(camera.zoom, 150.0));
        assert!(approx_eq(camera.center.x, 1.5));
    }
}
