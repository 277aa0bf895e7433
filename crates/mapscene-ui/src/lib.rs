//! MapScene 用户界面
//!
//! 基于egui的即时模式面板。

pub mod info_panel;
pub mod scene_panel;
pub mod state;

pub use state::UiState;
