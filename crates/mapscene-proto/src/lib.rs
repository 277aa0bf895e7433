//! MapScene 消息协议
//!
//! `add` / `remove` / `update` / `set` 四种 JSON 消息的编解码，
//! 按 uid 路由到 [`Scene`](mapscene_core::scene::Scene) 的分发器，
//! 以及生产端按固定频率合并更新的批处理器。

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod message;

pub use batch::{UpdateBatcher, UPDATE_FREQUENCY_HZ};
pub use dispatch::{Dispatched, Dispatcher};
pub use error::ProtoError;
pub use message::{decode, encode, PatchMap, SceneMessage};
