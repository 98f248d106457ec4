//! 垂直速度プロファイルとレップ区切り検出
//!
//! 符号の約束（ここで一度だけ定義し、全体で統一する）:
//! 入力は画像座標系の垂直位置系列で、yは下向きに増加する。
//! 速度 = Δy × fps なので、**負の速度 = 上昇（コンセントリック）**、
//! 正の速度 = 下降（エキセントリック）。
//!
//! レップ境界は速度が負→非負に転じるゼロクロス（上昇の終わり）。
//! 最小間隔ガード内の連続クロスはセンサジッタとして統合する。

use serde::Serialize;
use tracing::debug;

use crate::filter::{Ema, Hampel};

/// レップの位相
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepPhase {
    /// 短縮性（挙上・上昇）
    Concentric,
    /// 伸張性（下降）
    Eccentric,
}

/// フレームごとの速度サンプル
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocitySample {
    pub timestamp_ms: f64,
    /// キャリブレーション済みなら unit/s、未較正なら px/s
    pub value: f32,
    pub rep_index: u32,
    /// falseのときvalueは生のピクセル速度
    pub calibrated: bool,
}

/// レップ位相の開始イベント（ビート同期の入力）
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepPhaseEvent {
    pub rep_index: u32,
    pub phase: RepPhase,
    pub timestamp_ms: f64,
}

/// レップ単位のサマリ指標
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepMetrics {
    pub rep_index: u32,
    /// 絶対値ピーク速度
    pub peak: f32,
    /// 絶対値平均速度
    pub mean: f32,
    /// 正味変位（絶対値）
    pub displacement: f32,
}

/// 速度解析の結果一式
#[derive(Debug, Clone, Default, Serialize)]
pub struct VelocityProfile {
    pub samples: Vec<VelocitySample>,
    pub phases: Vec<RepPhaseEvent>,
    pub reps: Vec<RepMetrics>,
}

/// 平滑化済み位置系列 → 速度 + レップ区切り
#[derive(Debug, Clone)]
pub struct VelocityEngine {
    fps: f32,
    min_rep_interval_ms: f64,
    ema: Option<Ema>,
    hampel: Option<Hampel>,
}

impl VelocityEngine {
    pub const DEFAULT_MIN_REP_INTERVAL_MS: f64 = 300.0;
    pub const DEFAULT_EMA_ALPHA: f32 = 0.2;
    pub const DEFAULT_HAMPEL_WINDOW: usize = 5;
    pub const DEFAULT_HAMPEL_K: f32 = 3.0;

    pub fn new(fps: f32) -> Self {
        Self {
            fps,
            min_rep_interval_ms: Self::DEFAULT_MIN_REP_INTERVAL_MS,
            ema: Some(Ema::new(Self::DEFAULT_EMA_ALPHA)),
            hampel: Some(Hampel::new(
                Self::DEFAULT_HAMPEL_WINDOW,
                Self::DEFAULT_HAMPEL_K,
            )),
        }
    }

    pub fn with_min_rep_interval(mut self, ms: f64) -> Self {
        self.min_rep_interval_ms = ms;
        self
    }

    /// 速度系列への後段EMAを無効化/変更する
    pub fn with_ema(mut self, ema: Option<Ema>) -> Self {
        self.ema = ema;
        self
    }

    /// 位置系列への前段Hampel外れ値除去を無効化/変更する
    pub fn with_outlier_rejection(mut self, hampel: Option<Hampel>) -> Self {
        self.hampel = hampel;
        self
    }

    /// 位置系列を解析する。
    ///
    /// `positions`は平滑化済みの垂直位置（フレームごとに1スカラー）。
    /// `pixels_per_unit`があればpx速度を物理単位に換算し、なければ
    /// 生のpx/s値を`calibrated = false`で返す。
    pub fn analyze(&self, positions: &[f32], pixels_per_unit: Option<f32>) -> VelocityProfile {
        // 微分前に単発の検出スパイクを除去する
        let cleaned;
        let positions = match self.hampel {
            Some(hampel) => {
                cleaned = hampel.apply(positions);
                &cleaned[..]
            }
            None => positions,
        };
        let n = positions.len();
        let dt_ms = 1000.0 / self.fps as f64;
        let calibrated = pixels_per_unit.is_some();
        let scale = pixels_per_unit.unwrap_or(1.0);

        if n < 2 {
            let samples = (0..n)
                .map(|i| VelocitySample {
                    timestamp_ms: i as f64 * dt_ms,
                    value: 0.0,
                    rep_index: 0,
                    calibrated,
                })
                .collect();
            return VelocityProfile {
                samples,
                phases: Vec::new(),
                reps: Vec::new(),
            };
        }

        // 速度 = Δy × fps。先頭は次のサンプルを複製（系列長を保つ）。
        let mut velocity = Vec::with_capacity(n);
        velocity.push(0.0);
        for i in 1..n {
            velocity.push((positions[i] - positions[i - 1]) * self.fps);
        }
        velocity[0] = velocity[1];

        if let Some(ema) = self.ema {
            velocity = ema.apply(&velocity);
        }

        // レップ区切り: 負→非負のゼロクロス。ガード内は統合。
        let mut samples = Vec::with_capacity(n);
        let mut phases = Vec::new();
        let mut boundaries = vec![0usize];
        let mut rep_index = 0u32;
        let mut last_crossing_ms = f64::NEG_INFINITY;

        samples.push(VelocitySample {
            timestamp_ms: 0.0,
            value: velocity[0] / scale,
            rep_index: 0,
            calibrated,
        });

        for i in 1..n {
            let t = i as f64 * dt_ms;
            let guarded = t - last_crossing_ms < self.min_rep_interval_ms;

            if velocity[i - 1] < 0.0 && velocity[i] >= 0.0 {
                if !guarded {
                    rep_index += 1;
                    boundaries.push(i);
                    phases.push(RepPhaseEvent {
                        rep_index,
                        phase: RepPhase::Eccentric,
                        timestamp_ms: t,
                    });
                    last_crossing_ms = t;
                }
            } else if velocity[i - 1] > 0.0 && velocity[i] <= 0.0 && !guarded {
                phases.push(RepPhaseEvent {
                    rep_index,
                    phase: RepPhase::Concentric,
                    timestamp_ms: t,
                });
                last_crossing_ms = t;
            }

            samples.push(VelocitySample {
                timestamp_ms: t,
                value: velocity[i] / scale,
                rep_index,
                calibrated,
            });
        }

        if *boundaries.last().unwrap() != n - 1 {
            boundaries.push(n - 1);
        }

        let reps = self.rep_metrics(positions, &velocity, &boundaries, scale);
        debug!(
            frames = n,
            reps = reps.len(),
            calibrated,
            "velocity profile computed"
        );

        VelocityProfile {
            samples,
            phases,
            reps,
        }
    }

    fn rep_metrics(
        &self,
        positions: &[f32],
        velocity: &[f32],
        boundaries: &[usize],
        scale: f32,
    ) -> Vec<RepMetrics> {
        let mut reps = Vec::new();
        for (idx, pair) in boundaries.windows(2).enumerate() {
            let (start, end) = (pair[0], pair[1]);
            if end <= start {
                continue;
            }
            let segment = &velocity[start..end];
            let peak = segment.iter().fold(0.0f32, |m, v| m.max(v.abs()));
            let mean = segment.iter().map(|v| v.abs()).sum::<f32>() / segment.len() as f32;
            let displacement = (positions[end] - positions[start]).abs();
            reps.push(RepMetrics {
                rep_index: idx as u32,
                peak: peak / scale,
                mean: mean / scale,
                displacement: displacement / scale,
            });
        }
        reps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> VelocityEngine {
        // テストはEMAなしの方がゼロクロスが読みやすい
        VelocityEngine::new(30.0).with_ema(None)
    }

    /// 下降→上昇→下降の合成系列（画像座標: yは下向きに増加）
    fn v_then_peak(len_per_leg: usize) -> Vec<f32> {
        let mut positions = Vec::new();
        let mut y = 100.0f32;
        for _ in 0..len_per_leg {
            y += 4.0; // 下降（エキセントリック, v > 0）
            positions.push(y);
        }
        for _ in 0..len_per_leg {
            y -= 4.0; // 上昇（コンセントリック, v < 0）
            positions.push(y);
        }
        for _ in 0..len_per_leg {
            y += 4.0;
            positions.push(y);
        }
        positions
    }

    #[test]
    fn test_sample_per_frame() {
        let positions = v_then_peak(15);
        let profile = engine().analyze(&positions, None);
        assert_eq!(profile.samples.len(), positions.len());
        // 固定タイムステップ
        let dt = profile.samples[1].timestamp_ms - profile.samples[0].timestamp_ms;
        assert!((dt - 1000.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_boundary_per_reversal() {
        let positions = v_then_peak(15);
        let profile = engine().analyze(&positions, None);

        // 上昇→下降の反転は1回 → レップ境界はちょうど1つ
        let boundaries: Vec<_> = profile
            .phases
            .iter()
            .filter(|p| p.phase == RepPhase::Eccentric)
            .collect();
        assert_eq!(boundaries.len(), 1);

        // 下降→上昇の反転も1回
        let concentric: Vec<_> = profile
            .phases
            .iter()
            .filter(|p| p.phase == RepPhase::Concentric)
            .collect();
        assert_eq!(concentric.len(), 1);
    }

    #[test]
    fn test_rep_index_monotone() {
        let positions = v_then_peak(15);
        let profile = engine().analyze(&positions, None);
        let mut prev = 0;
        for s in &profile.samples {
            assert!(s.rep_index >= prev);
            prev = s.rep_index;
        }
        assert_eq!(profile.samples.last().unwrap().rep_index, 1);
    }

    #[test]
    fn test_jitter_coalesced_by_guard() {
        // 30fpsで300msガード = 9フレーム。3フレームごとの振動は統合される。
        let mut positions = Vec::new();
        let mut y = 100.0f32;
        for i in 0..30 {
            y += if (i / 3) % 2 == 0 { 1.0 } else { -1.0 };
            positions.push(y);
        }
        let profile = engine().analyze(&positions, None);
        let boundary_count = profile
            .phases
            .iter()
            .filter(|p| p.phase == RepPhase::Eccentric)
            .count();
        // ガードなしなら〜5境界になるところを大幅に抑える
        assert!(boundary_count <= 2, "got {} boundaries", boundary_count);
    }

    #[test]
    fn test_outlier_spike_no_phantom_boundary() {
        // 上昇中(v < 0)の単発検出スパイクは除去され、偽のレップ境界を作らない
        let mut positions: Vec<f32> = (0..30).map(|i| 200.0 - 4.0 * i as f32).collect();
        positions[10] += 60.0;

        let cleaned = engine().analyze(&positions, None);
        assert!(
            cleaned.phases.iter().all(|p| p.phase != RepPhase::Eccentric),
            "spike produced a boundary: {:?}",
            cleaned.phases
        );

        // 除去なしでは同じスパイクが境界として数えられてしまう
        let raw = engine()
            .with_outlier_rejection(None)
            .analyze(&positions, None);
        assert!(raw.phases.iter().any(|p| p.phase == RepPhase::Eccentric));
    }

    #[test]
    fn test_uncalibrated_flagged() {
        let positions = v_then_peak(10);
        let profile = engine().analyze(&positions, None);
        assert!(profile.samples.iter().all(|s| !s.calibrated));
    }

    #[test]
    fn test_calibrated_scaling() {
        let positions = v_then_peak(10);
        let raw = engine().analyze(&positions, None);
        let scaled = engine().analyze(&positions, Some(750.0));
        assert!(scaled.samples.iter().all(|s| s.calibrated));
        for (r, s) in raw.samples.iter().zip(scaled.samples.iter()) {
            assert!((r.value / 750.0 - s.value).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rep_metrics() {
        let positions = v_then_peak(15);
        let profile = engine().analyze(&positions, None);
        assert!(!profile.reps.is_empty());
        for rep in &profile.reps {
            assert!(rep.peak >= rep.mean);
            assert!(rep.peak > 0.0);
        }
        // 4px/frame × 30fps = 120px/s
        assert!((profile.reps[0].peak - 120.0).abs() < 1.0);
    }

    #[test]
    fn test_short_series() {
        let profile = engine().analyze(&[5.0], None);
        assert_eq!(profile.samples.len(), 1);
        assert_eq!(profile.samples[0].value, 0.0);
        assert!(profile.phases.is_empty());

        let empty = engine().analyze(&[], None);
        assert!(empty.samples.is_empty());
    }
}
