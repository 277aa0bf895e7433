//! 地图级配置
//!
//! 从 JSON 文件加载，缺失的键取默认值。

use mapscene_core::math::{BoundingBox2, Point2};
use mapscene_core::properties::{Color, LineStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid map limits: {0}")]
    InvalidLimits(String),
}

/// 地图范围（世界单位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapLimits {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl Default for MapLimits {
    fn default() -> Self {
        Self {
            x: [0.0, 3.0],
            y: [0.0, 3.0],
        }
    }
}

impl MapLimits {
    pub fn bounds(&self) -> BoundingBox2 {
        BoundingBox2::new(
            Point2::new(self.x[0], self.y[0]),
            Point2::new(self.x[1], self.y[1]),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    // 几何
    pub limits: MapLimits,
    pub origin: [f64; 2],

    // 原点坐标系
    pub show_origin_frame: bool,
    /// 轴长（世界单位）
    pub coordinate_system_size: f64,
    pub coordinate_system_alpha: f64,
    /// 轴宽（像素）
    pub coordinate_system_width: f64,

    // 边框与底色
    pub map_border_width: f64,
    pub map_border_color: Color,
    pub map_color: Color,
    pub background_color: Color,

    // 网格
    pub show_grid: bool,
    /// 按缩放级别自动调整网格间距
    pub adaptive_grid: bool,
    pub major_grid_size: f64,
    pub minor_grid_size: f64,
    pub major_grid_width: f64,
    pub major_grid_style: LineStyle,
    pub major_grid_color: Color,
    pub minor_grid_width: f64,
    pub minor_grid_style: LineStyle,
    pub minor_grid_color: Color,

    // 棋盘格
    pub tiles: bool,
    pub tile_size: f64,
    pub tile_colors: [Color; 2],
    pub tile_border_width: f64,
    pub tile_border_color: Color,

    // 交互
    pub allow_zoom: bool,
    pub allow_drag: bool,

    // 初始视图
    pub initial_display_center: [f64; 2],
    /// 地图范围占视口的比例
    pub initial_display_zoom: f64,

    /// 重绘频率
    pub fps: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            limits: MapLimits::default(),
            origin: [0.0, 0.0],
            show_origin_frame: true,
            coordinate_system_size: 0.5,
            coordinate_system_alpha: 0.9,
            coordinate_system_width: 3.0,
            map_border_width: 1.0,
            map_border_color: Color::WHITE,
            map_color: Color::rgba(1.0, 1.0, 1.0, 0.0),
            background_color: Color::TRANSPARENT,
            show_grid: false,
            adaptive_grid: false,
            major_grid_size: 1.0,
            minor_grid_size: 0.5,
            major_grid_width: 1.0,
            major_grid_style: LineStyle::Solid,
            major_grid_color: Color::rgba(0.5, 0.5, 0.5, 0.4),
            minor_grid_width: 1.0,
            minor_grid_style: LineStyle::Dotted,
            minor_grid_color: Color::rgba(0.5, 0.5, 0.5, 0.4),
            tiles: true,
            tile_size: 0.5,
            tile_colors: [
                Color::rgba(0.3, 0.3, 0.3, 1.0),
                Color::rgba(28.0 / 255.0, 27.0 / 255.0, 43.0 / 255.0, 0.6),
            ],
            tile_border_width: 1.0,
            tile_border_color: Color::BLACK,
            allow_zoom: true,
            allow_drag: true,
            initial_display_center: [1.5, 1.5],
            initial_display_zoom: 0.75,
            fps: 30.0,
        }
    }
}

impl MapConfig {
    pub fn from_json_str(json: &str) -> Result<Self, MapConfigError> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MapConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), MapConfigError> {
        let MapLimits { x, y } = &self.limits;
        if x[0] >= x[1] || y[0] >= y[1] {
            return Err(MapConfigError::InvalidLimits(format!("x={x:?}, y={y:?}")));
        }
        Ok(())
    }

    pub fn bounds(&self) -> BoundingBox2 {
        self.limits.bounds()
    }

    pub fn initial_center(&self) -> Point2 {
        Point2::new(self.initial_display_center[0], self.initial_display_center[1])
    }

    /// 帧间隔（秒）
    pub fn frame_interval(&self) -> f64 {
        1.0 / self.fps.max(1.0)
    }
}
