//! 场景面板
//!
//! 以树形列出分组与实体，提供可见性与变暗开关。
//! `show_in_table` 为 false 的分组（连同其子节点）不列出。

use crate::state::UiState;
use mapscene_core::id::{GroupId, NodeRef};
use mapscene_core::scene::Scene;
use tracing::debug;

/// 面板上的一次切换操作
#[derive(Debug, Clone, Copy, PartialEq)]
enum Toggle {
    Visible(NodeRef, bool),
    Dim(NodeRef, bool),
}

/// 渲染场景面板
pub fn show_scene_panel(ctx: &egui::Context, scene: &mut Scene, ui_state: &mut UiState) {
    let mut toggles = Vec::new();
    let mut show = ui_state.show_scene_panel;

    egui::SidePanel::right("scene_panel")
        .resizable(true)
        .default_width(220.0)
        .show_animated(ctx, show, |ui| {
            ui.heading("Scene");
            ui.label(format!(
                "{} objects, {} groups",
                scene.object_count(),
                scene.group_count() - 1
            ));
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                group_children(ui, scene, scene.root(), ui_state, &mut toggles);
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Collapse").clicked() {
                    show = false;
                }
                if ui.button("Deselect").clicked() {
                    ui_state.clear_selection();
                }
            });
        });

    ui_state.show_scene_panel = show;
    for toggle in toggles {
        debug!(?toggle, "Scene panel toggle");
        match toggle {
            Toggle::Visible(node, visible) => scene.set_visibility(node, visible),
            Toggle::Dim(node, dim) => scene.dim(node, dim),
        }
    }
}

fn group_children(
    ui: &mut egui::Ui,
    scene: &Scene,
    gid: GroupId,
    ui_state: &mut UiState,
    toggles: &mut Vec<Toggle>,
) {
    let Some(group) = scene.group(gid) else {
        return;
    };

    for &child in group.groups().values() {
        let Some(sub) = scene.group(child) else {
            continue;
        };
        if !sub.config.show_in_table {
            continue;
        }
        let node = NodeRef::Group(child);
        egui::CollapsingHeader::new(&sub.config.name)
            .id_salt(child.0)
            .default_open(true)
            .show(ui, |ui| {
                node_row(ui, node, "Group", sub.config.visible, sub.config.dim, ui_state, toggles);
                group_children(ui, scene, child, ui_state, toggles);
            });
    }

    for &id in group.objects().values() {
        let Some(object) = scene.object(id) else {
            continue;
        };
        node_row(
            ui,
            NodeRef::Object(id),
            &object.config.name,
            object.config.visible,
            object.config.dim,
            ui_state,
            toggles,
        );
    }
}

fn node_row(
    ui: &mut egui::Ui,
    node: NodeRef,
    label: &str,
    visible: bool,
    dim: bool,
    ui_state: &mut UiState,
    toggles: &mut Vec<Toggle>,
) {
    ui.horizontal(|ui| {
        let vis_icon = if visible { "👁" } else { "—" };
        if ui.small_button(vis_icon).on_hover_text("Visible").clicked() {
            toggles.push(Toggle::Visible(node, !visible));
        }

        let dim_icon = if dim { "◐" } else { "●" };
        if ui.small_button(dim_icon).on_hover_text("Dim").clicked() {
            toggles.push(Toggle::Dim(node, !dim));
        }

        let selected = ui_state.selected == Some(node);
        let text = if selected {
            egui::RichText::new(label).strong()
        } else {
            egui::RichText::new(label)
        };
        if ui.selectable_label(selected, text).clicked() {
            ui_state.select(node);
        }
    });
}
