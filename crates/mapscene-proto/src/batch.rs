//! 生产端的更新合并
//!
//! 生产者可以任意频繁地提交数据/配置更新，批处理器按 uid 逐键合并（后写覆盖），
//! 并以固定频率输出至多两条消息：一条 `update`，一条 `set`。

use crate::message::{PatchMap, SceneMessage};
use mapscene_core::patch::{combine_patches, Patch};
use std::time::{Duration, Instant};

/// 默认发送频率（Hz）
pub const UPDATE_FREQUENCY_HZ: f64 = 20.0;

#[derive(Debug)]
pub struct UpdateBatcher {
    data: PatchMap,
    config: PatchMap,
    interval: Duration,
    last_flush: Option<Instant>,
}

impl Default for UpdateBatcher {
    fn default() -> Self {
        Self::new(UPDATE_FREQUENCY_HZ)
    }
}

impl UpdateBatcher {
    pub fn new(frequency_hz: f64) -> Self {
        Self {
            data: PatchMap::new(),
            config: PatchMap::new(),
            interval: Duration::from_secs_f64(1.0 / frequency_hz.max(0.1)),
            last_flush: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 提交数据更新，与同一 uid 尚未发送的补丁逐键合并
    pub fn queue_update(&mut self, uid: impl Into<String>, data: Patch) {
        combine_patches(self.data.entry(uid.into()).or_default(), data);
    }

    /// 提交配置更新，与同一 uid 尚未发送的补丁逐键合并
    pub fn queue_config(&mut self, uid: impl Into<String>, config: Patch) {
        combine_patches(self.config.entry(uid.into()).or_default(), config);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.config.is_empty()
    }

    /// 立即取出所有待发送的更新
    pub fn flush(&mut self) -> Vec<SceneMessage> {
        let mut out = Vec::with_capacity(2);
        if !self.data.is_empty() {
            out.push(SceneMessage::Update {
                data: std::mem::take(&mut self.data),
            });
        }
        if !self.config.is_empty() {
            out.push(SceneMessage::Set {
                data: std::mem::take(&mut self.config),
            });
        }
        out
    }

    /// 距上次发送已满一个周期时取出待发送的更新
    pub fn poll(&mut self, now: Instant) -> Vec<SceneMessage> {
        if let Some(last) = self.last_flush {
            if now.duration_since(last) < self.interval {
                return Vec::new();
            }
        }
        self.last_flush = Some(now);
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapscene_core::patch::patch_from_value;
    use serde_json::json;

    #[test]
    fn test_latest_value_wins() {
        let mut batcher = UpdateBatcher::default();
        batcher.queue_update("map/p1", patch_from_value(json!({"x": 1.0})));
        batcher.queue_update("map/p1", patch_from_value(json!({"x": 2.0})));
        batcher.queue_update("map/p2", patch_from_value(json!({"x": 5.0})));

        let messages = batcher.flush();
        assert_eq!(messages.len(), 1);
        let SceneMessage::Update { data } = &messages[0] else {
            panic!("expected update");
        };
        assert_eq!(data.len(), 2);
        assert_eq!(data["map/p1"]["x"], 2.0);
        assert!(batcher.is_empty());
    }

    #[test]
    fn test_partial_patches_for_same_uid_are_merged() {
        let mut batcher = UpdateBatcher::default();
        batcher.queue_config("map/p1", patch_from_value(json!({"highlight": true})));
        batcher.queue_config("map/p1", patch_from_value(json!({"visible": false})));
        batcher.queue_update("map/a1", patch_from_value(json!({"x": 1.0})));
        batcher.queue_update("map/a1", patch_from_value(json!({"psi": 2.0})));

        let messages = batcher.flush();
        let SceneMessage::Update { data } = &messages[0] else {
            panic!("expected update");
        };
        assert_eq!(data["map/a1"]["x"], 1.0);
        assert_eq!(data["map/a1"]["psi"], 2.0);

        let SceneMessage::Set { data } = &messages[1] else {
            panic!("expected set");
        };
        assert_eq!(data["map/p1"]["highlight"], true);
        assert_eq!(data["map/p1"]["visible"], false);
    }

    #[test]
    fn test_data_before_config() {
        let mut batcher = UpdateBatcher::default();
        batcher.queue_config("map/p1", patch_from_value(json!({"visible": false})));
        batcher.queue_update("map/p1", patch_from_value(json!({"x": 1.0})));

        let kinds: Vec<_> = batcher.flush().iter().map(|m| m.type_name()).collect();
        assert_eq!(kinds, ["update", "set"]);
    }

    #[test]
    fn test_poll_respects_interval() {
        let mut batcher = UpdateBatcher::new(20.0);
        let t0 = Instant::now();
        batcher.queue_update("map/p1", patch_from_value(json!({"x": 1.0})));
        assert_eq!(batcher.poll(t0).len(), 1);

        batcher.queue_update("map/p1", patch_from_value(json!({"x": 2.0})));
        assert!(batcher.poll(t0 + Duration::from_millis(10)).is_empty());
        assert_eq!(batcher.poll(t0 + Duration::from_millis(50)).len(), 1);
    }
}
