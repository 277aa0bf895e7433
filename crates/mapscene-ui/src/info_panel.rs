//! 信息面板

use crate::state::UiState;
use mapscene_core::id::NodeRef;
use mapscene_core::object::ObjectInfo;
use mapscene_core::scene::Scene;

/// 渲染信息面板
pub fn show_info_panel(ctx: &egui::Context, scene: &Scene, ui_state: &UiState) {
    egui::SidePanel::left("info_panel")
        .resizable(true)
        .default_width(220.0)
        .show_animated(ctx, ui_state.show_info_panel, |ui| {
            ui.heading("Info");
            ui.separator();

            match ui_state.selected {
                None => {
                    ui.label("No selection");
                }
                Some(NodeRef::Object(id)) => match scene.object_info(id) {
                    Some(info) => object_info(ui, &info, scene.is_visible(NodeRef::Object(id))),
                    None => {
                        ui.label("Removed");
                    }
                },
                Some(NodeRef::Group(id)) => {
                    let Some(group) = scene.group(id) else {
                        ui.label("Removed");
                        return;
                    };
                    let uid = scene.uid_of(NodeRef::Group(id)).unwrap_or_default();
                    egui::Grid::new("group_info")
                        .num_columns(2)
                        .spacing([10.0, 4.0])
                        .show(ui, |ui| {
                            row(ui, "Name:", &group.config.name);
                            row(ui, "UID:", &uid);
                            row(ui, "Objects:", &scene.objects_of(id).len().to_string());
                            row(ui, "Visible:", yes_no(scene.is_visible(NodeRef::Group(id))));
                            row(ui, "Dimmed:", yes_no(scene.is_dimmed(NodeRef::Group(id))));
                        });
                }
            }

            ui.separator();

            // 鼠标位置
            ui.heading("Cursor");
            ui.label(format!(
                "X: {:.3}  Y: {:.3}",
                ui_state.mouse_world_pos.x, ui_state.mouse_world_pos.y
            ));
        });
}

fn object_info(ui: &mut egui::Ui, info: &ObjectInfo, effectively_visible: bool) {
    ui.label(format!("Type: {}", info.kind.type_name()));
    ui.separator();

    egui::Grid::new("object_info")
        .num_columns(2)
        .spacing([10.0, 4.0])
        .show(ui, |ui| {
            row(ui, "Name:", &info.name);
            row(ui, "UID:", &info.uid);
            if let Some(p) = &info.position {
                row(ui, "Position:", &format!("{:.3}, {:.3}", p.x, p.y));
            }
            if let Some(psi) = info.heading {
                row(ui, "Heading:", &format!("{:.1}°", psi.to_degrees()));
            }
            row(ui, "Layer:", &info.layer.to_string());
            row(ui, "Visible:", yes_no(effectively_visible));
            row(ui, "Dimmed:", yes_no(info.dim));
            row(ui, "Trail:", &info.history_len.to_string());
            if let Some(tooltip) = &info.tooltip {
                row(ui, "Tooltip:", tooltip);
            }
        });

    ui.collapsing("Data", |ui| {
        let text = serde_json::to_string_pretty(&info.data).unwrap_or_default();
        ui.monospace(text);
    });
}

fn row(ui: &mut egui::Ui, key: &str, value: &str) {
    ui.label(key);
    ui.label(value);
    ui.end_row();
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
