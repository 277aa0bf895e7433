//! MapScene 场景模型
//!
//! 实时、分层的2D场景：点、线段、面状图形、朝向体和坐标系，
//! 由外部进程持续推送位置与属性更新。
//!
//! # 架构设计
//!
//! - `Scene`: 实体与分组的竞技场，负责路径寻址、继承状态和绘制遍历
//! - `MapObject`: 实体，公共配置 + 图形变体 + 历史轨迹
//! - `MapObjectGroup`: 分组，子节点键→句柄映射
//! - `DrawSurface` / `CoordinateTransform`: 与宿主之间的绘制契约
//!
//! # 示例
//!
//! ```rust
//! use mapscene_core::prelude::*;
//! use std::time::Instant;
//!
//! let mut scene = Scene::new("map");
//! let root = scene.root();
//! let payload: ObjectPayload = serde_json::from_str(
//!     r#"{"id": "p1", "type": "point", "data": {"x": 1.0, "y": 2.0}}"#,
//! ).unwrap();
//! let node = scene.handle_add_message(root, &payload).unwrap();
//!
//! let patch = patch_from_value(serde_json::json!({"x": 3.0}));
//! scene.update(node, &patch, Instant::now());
//! assert_eq!(scene.resolve_path("map/p1"), Some(node));
//! ```

pub mod error;
pub mod group;
pub mod id;
pub mod label;
pub mod math;
pub mod object;
pub mod patch;
pub mod payload;
pub mod properties;
pub mod scene;
pub mod shapes;
pub mod surface;
pub mod trail;
pub mod transform;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::error::SceneError;
    pub use crate::group::{GroupConfig, MapObjectGroup};
    pub use crate::id::{GroupId, NodeRef, ObjectId};
    pub use crate::math::{Point2, Vector2};
    pub use crate::object::{MapObject, ObjectConfig, ObjectInfo};
    pub use crate::patch::{combine_patches, patch_from_value, Patch};
    pub use crate::payload::{ObjectPayload, RemoveMessage};
    pub use crate::properties::{Color, SizeMode};
    pub use crate::scene::{Scene, SceneEvent};
    pub use crate::shapes::{Shape, ShapeKind};
    pub use crate::surface::{CoordinateTransform, DrawSurface, LabelAnchor};
}
