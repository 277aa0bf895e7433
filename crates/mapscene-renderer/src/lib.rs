//! MapScene 渲染层
//!
//! 为场景模型提供坐标变换与绘制表面。
//!
//! # 组成
//!
//! - **相机**：平移、以光标为中心缩放、适配视图
//! - **地图配置**：地图范围、棋盘格、网格、初始视图
//! - **背景**：棋盘格、自适应网格、边框与原点坐标系
//! - **egui 表面**：把屏幕空间图元提交给 `egui::Painter`

pub mod background;
pub mod camera;
pub mod map_config;
pub mod surface;

pub use background::draw_background;
pub use camera::Camera2D;
pub use map_config::{MapConfig, MapConfigError, MapLimits};
pub use surface::EguiSurface;
