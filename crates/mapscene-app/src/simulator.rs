//! 演示数据源
//!
//! 在后台线程中构造一个小场景，然后以固定频率推送运动更新，
//! 与外部进程通过消息通道驱动地图的方式相同。

use crossbeam::channel::Sender;
use mapscene_core::patch::patch_from_value;
use mapscene_proto::{encode, SceneMessage, UpdateBatcher};
use serde_json::json;
use std::f64::consts::TAU;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 初始场景：一个机器人分组、目标点、连线和几个静态区域
fn initial_messages() -> Vec<serde_json::Value> {
    vec![
        json!({"type": "add", "parent": "map", "payload": {
            "id": "zones", "type": "group", "config": {"name": "Zones"},
            "objects": {
                "dock": {"id": "dock", "type": "rectangle",
                         "data": {"x": 0.2, "y": 0.2, "width": 0.6, "height": 0.4}},
                "pool": {"id": "pool", "type": "circle",
                         "config": {"color": [0.2, 0.4, 1.0, 0.4]},
                         "data": {"x": 2.4, "y": 2.4, "radius": 0.3}},
                "field": {"id": "field", "type": "ellipse",
                          "data": {"x": 2.3, "y": 0.7, "rx": 0.4, "ry": 0.2, "psi": 0.5}}
            }
        }}),
        json!({"type": "add", "parent": "map", "payload": {
            "id": "robots", "type": "group", "config": {"name": "Robots"},
            "objects": {
                "r1": {"id": "r1", "type": "agent",
                       "config": {"name": "Scout", "show_trail": true, "show_coordinates": true},
                       "data": {"x": 2.3, "y": 1.5, "psi": 1.57}},
                "r2": {"id": "r2", "type": "vision_agent",
                       "config": {"name": "Watcher", "show_trail": true, "color": [0.9, 0.6, 0.1, 1.0]},
                       "data": {"x": 1.5, "y": 1.5, "psi": 0.0}}
            }
        }}),
        json!({"type": "add", "parent": "map", "payload": {
            "id": "target", "type": "point",
            "config": {"name": "Target", "shape": "triangle"},
            "data": {"x": 0.5, "y": 2.5}
        }}),
        json!({"type": "add", "parent": "map", "payload": {
            "id": "link", "type": "line",
            "config": {"name": "Link", "show_name": false},
            "data": {"start": "robots/r1", "end": "target"}
        }}),
        json!({"type": "add", "parent": "map", "payload": {
            "id": "frame", "type": "coordinate_system",
            "data": {"x": 0.5, "y": 1.5, "psi": 0.3}
        }}),
    ]
}

/// 在 `t` 秒时的机器人位姿
fn poses(t: f64) -> [(f64, f64, f64); 2] {
    let w1 = TAU / 12.0;
    let a = w1 * t;
    let r1 = (1.5 + 0.8 * a.cos(), 1.5 + 0.8 * a.sin(), a + TAU / 4.0);

    let w2 = TAU / 20.0;
    let b = w2 * t;
    let (x, y) = (1.5 + 0.9 * b.sin(), 1.5 + 0.6 * (2.0 * b).sin());
    let (dx, dy) = (0.9 * b.cos(), 1.2 * (2.0 * b).cos());
    let r2 = (x, y, dy.atan2(dx));

    [r1, r2]
}

fn send(sender: &Sender<String>, message: &SceneMessage) -> bool {
    match encode(message) {
        Ok(text) => sender.send(text).is_ok(),
        Err(err) => {
            warn!("Failed to encode message: {}", err);
            true
        }
    }
}

/// 启动演示线程；接收端关闭后线程退出
pub fn spawn(sender: Sender<String>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("mapscene-demo".into())
        .spawn(move || run(sender))
}

fn run(sender: Sender<String>) {
    for message in initial_messages() {
        if sender.send(message.to_string()).is_err() {
            return;
        }
    }
    info!("Demo scene sent");

    let mut batcher = UpdateBatcher::default();
    let start = Instant::now();
    let mut highlighted = false;
    let mut last_toggle = 0;

    loop {
        let now = Instant::now();
        let t = now.duration_since(start).as_secs_f64();

        for (uid, (x, y, psi)) in ["map/robots/r1", "map/robots/r2"].into_iter().zip(poses(t)) {
            batcher.queue_update(uid, patch_from_value(json!({"x": x, "y": y, "psi": psi})));
        }

        // 每 5 秒切换一次目标点的高亮
        let period = (t / 5.0) as u64;
        if period != last_toggle {
            last_toggle = period;
            highlighted = !highlighted;
            batcher.queue_config("map/target", patch_from_value(json!({"highlight": highlighted})));
        }

        for message in batcher.poll(now) {
            if !send(&sender, &message) {
                debug!("Receiver closed, stopping demo");
                return;
            }
        }
        std::thread::sleep(batcher.interval());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscene_core::scene::Scene;
    use mapscene_proto::Dispatcher;

    #[test]
    fn test_initial_messages_build_scene() {
        let mut scene = Scene::new("map");
        let mut dispatcher = Dispatcher::new();
        for message in initial_messages() {
            dispatcher
                .apply_text(&mut scene, &message.to_string(), Instant::now())
                .unwrap();
        }

        assert_eq!(scene.object_count(), 8);
        let link = scene.find_path("link").and_then(|n| n.as_object()).unwrap();
        let (start, _) = scene.line_endpoints(link).unwrap();
        assert!((start.x - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_poses_stay_inside_map() {
        for step in 0..200 {
            for (x, y, _) in poses(step as f64 * 0.37) {
                assert!((0.0..=3.0).contains(&x));
                assert!((0.0..=3.0).contains(&y));
            }
        }
    }
}
