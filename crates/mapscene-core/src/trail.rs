//! 轨迹子系统
//!
//! 历史采样按距离/时间门控写入有界环形缓冲区；
//! 绘制时按样本年龄做指数半衰期淡出。

use crate::math::Point2;
use crate::properties::Color;
use crate::surface::{CoordinateTransform, DrawSurface};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// 轨迹参数（每个实体独立配置）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailSettings {
    /// 最小移动距离（世界单位）
    pub min_dist: f64,
    /// 最小时间间隔（毫秒）
    pub min_dt_ms: f64,
    /// 最大样本数，0 表示不限
    pub max_len: usize,
    /// 半衰期（毫秒）
    pub half_life_ms: f64,
    /// 最新样本的 alpha 上限
    pub max_alpha: f64,
    /// 变暗时的 alpha 系数
    pub dim_factor: f64,
    /// 轨迹点半径占本体尺寸的比例
    pub size_fraction: f64,
    /// 轨迹点最小半径（像素）
    pub min_px: f64,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            min_dist: 0.02,
            min_dt_ms: 60.0,
            max_len: 0,
            half_life_ms: 20_000.0,
            max_alpha: 0.75,
            dim_factor: 0.3,
            size_fraction: 0.1,
            min_px: 2.0,
        }
    }
}

/// 轨迹样本，创建后不再修改
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSample {
    pub x: f64,
    pub y: f64,
    pub t: Instant,
}

impl TrailSample {
    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// 历史轨迹，最旧的样本在前
#[derive(Debug, Clone, Default)]
pub struct Trail {
    samples: VecDeque<TrailSample>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按门控规则尝试记录样本，返回是否写入
    ///
    /// 首个样本无条件写入；之后要求移动距离 ≥ `min_dist`
    /// 或距上次采样 ≥ `min_dt_ms`。超出 `max_len` 时从头部淘汰。
    pub fn maybe_push(&mut self, x: f64, y: f64, now: Instant, settings: &TrailSettings) -> bool {
        let t = match self.samples.back() {
            None => now,
            Some(last) => {
                let dist = ((x - last.x).powi(2) + (y - last.y).powi(2)).sqrt();
                let dt_ms = now.saturating_duration_since(last.t).as_secs_f64() * 1000.0;
                if dist < settings.min_dist && dt_ms < settings.min_dt_ms {
                    return false;
                }
                // 时间戳保持单调不减
                now.max(last.t)
            }
        };

        if settings.max_len > 0 && self.samples.capacity() <= settings.max_len {
            let additional = (settings.max_len + 1).saturating_sub(self.samples.len());
            self.samples.reserve_exact(additional);
        }
        self.samples.push_back(TrailSample { x, y, t });
        self.enforce_limit(settings.max_len);
        true
    }

    /// 按上限从头部淘汰
    pub fn enforce_limit(&mut self, max_len: usize) {
        if max_len == 0 {
            return;
        }
        while self.samples.len() > max_len {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&TrailSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailSample> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// 指数衰减因子：每经过一个半衰期减半
pub fn decay_factor(age_ms: f64, half_life_ms: f64) -> f64 {
    if half_life_ms <= 0.0 {
        return 1.0;
    }
    (-std::f64::consts::LN_2 / half_life_ms * age_ms.max(0.0)).exp()
}

/// 样本在 `now` 时刻的渲染 alpha
pub fn sample_alpha(sample: &TrailSample, now: Instant, settings: &TrailSettings, dimmed: bool) -> f64 {
    let age_ms = now.saturating_duration_since(sample.t).as_secs_f64() * 1000.0;
    let alpha = decay_factor(age_ms, settings.half_life_ms) * settings.max_alpha;
    if dimmed {
        alpha * settings.dim_factor
    } else {
        alpha
    }
}

/// 轨迹点半径（像素）
///
/// 以本体尺寸（世界单位）乘比例得到，但不小于 `min_px`，缩小视图时仍可见。
pub fn dot_radius_px(body_world_size: f64, settings: &TrailSettings, scale: f64) -> f64 {
    if scale <= 0.0 {
        return settings.min_px;
    }
    let world = body_world_size * settings.size_fraction;
    let min_world = settings.min_px / scale;
    world.max(min_world) * scale
}

/// 由旧到新绘制轨迹
#[allow(clippy::too_many_arguments)]
pub fn draw_trail(
    trail: &Trail,
    color: Color,
    body_world_size: f64,
    settings: &TrailSettings,
    dimmed: bool,
    now: Instant,
    transform: &dyn CoordinateTransform,
    surface: &mut dyn DrawSurface,
) {
    let radius = dot_radius_px(body_world_size, settings, transform.scale());
    for sample in trail.iter() {
        let alpha = sample_alpha(sample, now, settings, dimmed);
        if alpha <= 0.0 {
            continue;
        }
        let center = transform.world_to_canvas(sample.position());
        surface.circle(center, radius, Some(color.with_alpha(alpha)), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq_tol;
    use crate::surface::{FixedTransform, RecordingSurface};
    use std::time::Duration;

    fn ms(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_gating_rejects_small_fast_moves() {
        let settings = TrailSettings::default();
        let base = Instant::now();
        let mut trail = Trail::new();

        assert!(trail.maybe_push(0.0, 0.0, base, &settings));
        assert!(!trail.maybe_push(0.01, 0.0, ms(base, 10), &settings));
        assert_eq!(trail.len(), 1);

        // 距离超过阈值立即记录
        assert!(trail.maybe_push(0.06, 0.0, ms(base, 11), &settings));
        // 时间超过阈值也记录
        assert!(trail.maybe_push(0.06, 0.0, ms(base, 80), &settings));
        assert_eq!(trail.len(), 3);
    }

    #[test]
    fn test_capping_keeps_most_recent() {
        let settings = TrailSettings {
            max_len: 4,
            ..Default::default()
        };
        let base = Instant::now();
        let mut trail = Trail::new();
        for i in 0..9u64 {
            assert!(trail.maybe_push(i as f64, 0.0, ms(base, i), &settings));
        }

        let xs: Vec<f64> = trail.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_half_life_decay() {
        let settings = TrailSettings::default();
        let base = Instant::now();
        let sample = TrailSample { x: 0.0, y: 0.0, t: base };

        let fresh = sample_alpha(&sample, base, &settings, false);
        let halved = sample_alpha(&sample, ms(base, 20_000), &settings, false);
        assert!(approx_eq_tol(fresh, 0.75, 1e-9));
        assert!(approx_eq_tol(halved, 0.375, 1e-9));

        let dimmed = sample_alpha(&sample, base, &settings, true);
        assert!(approx_eq_tol(dimmed, 0.75 * 0.3, 1e-9));
    }

    #[test]
    fn test_dot_radius_has_pixel_floor() {
        let settings = TrailSettings::default();
        // 缩得很小时：0.05 * 0.1 * 10 = 0.05px → 提升到 2px
        assert!(approx_eq_tol(dot_radius_px(0.05, &settings, 10.0), 2.0, 1e-9));
        // 放大时按比例：0.05 * 0.1 * 1000 = 5px
        assert!(approx_eq_tol(dot_radius_px(0.05, &settings, 1000.0), 5.0, 1e-9));
    }

    #[test]
    fn test_draw_oldest_first() {
        let settings = TrailSettings::default();
        let base = Instant::now();
        let mut trail = Trail::new();
        trail.maybe_push(0.0, 0.0, base, &settings);
        trail.maybe_push(1.0, 0.0, ms(base, 100), &settings);

        let transform = FixedTransform::new(100.0, Point2::new(0.0, 0.0));
        let mut surface = RecordingSurface::new();
        draw_trail(
            &trail,
            Color::RED,
            0.05,
            &settings,
            false,
            ms(base, 100),
            &transform,
            &mut surface,
        );

        let centers: Vec<f64> = surface
            .circles()
            .map(|c| match c {
                crate::surface::DrawCommand::Circle { center, .. } => center.x,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(centers, vec![0.0, 100.0]);
    }
}
