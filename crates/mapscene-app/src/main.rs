//! MapScene 主应用程序入口
//! 使用 eframe 作为应用框架，从消息通道接收场景更新并绘制地图

mod simulator;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use eframe::egui;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mapscene_core::math::{Point2, Vector2};
use mapscene_core::scene::Scene;
use mapscene_proto::Dispatcher;
use mapscene_renderer::{draw_background, Camera2D, EguiSurface, MapConfig};
use mapscene_ui::info_panel::show_info_panel;
use mapscene_ui::scene_panel::show_scene_panel;
use mapscene_ui::UiState;

/// 单帧最多处理的消息数，避免积压时阻塞界面
const MAX_MESSAGES_PER_FRAME: usize = 500;

/// MapScene 应用程序
struct MapSceneApp {
    scene: Scene,
    camera: Camera2D,
    map_config: MapConfig,
    dispatcher: Dispatcher,
    inbox: Receiver<String>,
    ui_state: UiState,

    /// 首帧拿到视口尺寸后再设置初始视图
    initial_view_pending: bool,
}

impl MapSceneApp {
    fn new(map_config: MapConfig, inbox: Receiver<String>) -> Self {
        Self {
            scene: Scene::new("map"),
            camera: Camera2D::default(),
            map_config,
            dispatcher: Dispatcher::new(),
            inbox,
            ui_state: UiState::default(),
            initial_view_pending: true,
        }
    }

    /// 处理通道中积压的消息
    fn drain_inbox(&mut self) {
        let now = Instant::now();
        for text in self.inbox.try_iter().take(MAX_MESSAGES_PER_FRAME) {
            if let Err(err) = self.dispatcher.apply_text(&mut self.scene, &text, now) {
                warn!("Dropping message: {}", err);
            }
        }

        let events = self.scene.take_events();
        if !events.is_empty() {
            self.ui_state.note_events(&events);
            self.ui_state.validate_selection(&self.scene);
        }
    }

    fn reset_view(&mut self) {
        self.camera.look_at(
            self.map_config.initial_center(),
            &self.map_config.bounds(),
            self.map_config.initial_display_zoom,
        );
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response) {
        if let Some(hover_pos) = response.hover_pos() {
            self.ui_state.mouse_world_pos = self
                .camera
                .screen_to_world(Point2::new(hover_pos.x as f64, hover_pos.y as f64));
        }

        // 处理滚轮缩放
        if self.map_config.allow_zoom && response.hovered() {
            let scroll_delta = ui.input(|i| i.raw_scroll_delta);
            if scroll_delta.y.abs() > 0.0 {
                if let Some(hover_pos) = response.hover_pos() {
                    let zoom_factor = if scroll_delta.y > 0.0 { 1.1 } else { 0.9 };
                    self.camera
                        .zoom_at(Point2::new(hover_pos.x as f64, hover_pos.y as f64), zoom_factor);
                }
            }
        }

        // 处理拖动平移
        if self.map_config.allow_drag
            && (response.dragged_by(egui::PointerButton::Primary)
                || response.dragged_by(egui::PointerButton::Middle))
        {
            let delta = response.drag_delta();
            self.camera.pan(Vector2::new(delta.x as f64, delta.y as f64));
        }

        ui.input(|i| {
            if i.key_pressed(egui::Key::Home) {
                self.reset_view();
            }
            if i.key_pressed(egui::Key::Z) {
                self.camera.zoom_to_fit(&self.map_config.bounds(), 0.1);
            }
            if i.key_pressed(egui::Key::Escape) {
                self.ui_state.clear_selection();
            }
        });
    }
}

impl eframe::App for MapSceneApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_inbox();

        // 深色主题
        ctx.set_visuals(egui::Visuals::dark());

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.ui_state.status_message);
                ui.separator();
                ui.label(format!(
                    "Messages: {} ({} failed)",
                    self.dispatcher.received(),
                    self.dispatcher.failed()
                ));
                ui.separator();
                ui.label(format!("Zoom: {:.1} px/m", self.camera.zoom));
                ui.separator();
                ui.checkbox(&mut self.ui_state.show_scene_panel, "Scene");
                ui.checkbox(&mut self.ui_state.show_info_panel, "Info");
            });
        });

        show_scene_panel(ctx, &mut self.scene, &mut self.ui_state);
        show_info_panel(ctx, &self.scene, &self.ui_state);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::from_rgb(30, 30, 46)))
            .show(ctx, |ui| {
                let available_rect = ui.available_rect_before_wrap();
                let (response, painter) =
                    ui.allocate_painter(available_rect.size(), egui::Sense::click_and_drag());
                let rect = response.rect;

                self.camera.set_viewport(
                    Point2::new(rect.min.x as f64, rect.min.y as f64),
                    rect.width() as f64,
                    rect.height() as f64,
                );
                if self.initial_view_pending {
                    self.reset_view();
                    self.initial_view_pending = false;
                }

                self.handle_input(ui, &response);

                // ===== 绘制 =====
                let mut surface = EguiSurface::new(&painter);
                draw_background(&self.map_config, &self.camera, &mut surface);
                self.scene.draw(&self.camera, &mut surface, Instant::now());
            });

        // 轨迹持续淡出，按配置的帧率重绘
        ctx.request_repaint_after(Duration::from_secs_f64(self.map_config.frame_interval()));
    }
}

fn log_level() -> Level {
    std::env::var("MAPSCENE_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(Level::INFO)
}

fn main() -> Result<()> {
    // 初始化日志
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(log_level()).finish(),
    )?;

    info!("Starting MapScene...");

    let map_config = match std::env::args().nth(1) {
        Some(path) => MapConfig::from_json_file(&path)
            .with_context(|| format!("failed to load map config from {}", path))?,
        None => MapConfig::default(),
    };

    let (sender, inbox) = channel::unbounded();
    simulator::spawn(sender).context("failed to start demo thread")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 900.0])
            .with_title("MapScene"),
        ..Default::default()
    };

    eframe::run_native(
        "MapScene",
        native_options,
        Box::new(move |_cc| Ok(Box::new(MapSceneApp::new(map_config, inbox)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
