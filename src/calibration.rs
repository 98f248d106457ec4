//! ピクセル→物理単位のスケールキャリブレーション
//!
//! 既知の実寸の参照物をカメラ前で動かし、追跡点の累積移動距離から
//! pixels-per-unitを推定する。統計的推定ではなくヒューリスティック:
//! 信頼度はサンプル密度とスイープ距離の積。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::CalibrationConfig;

/// 必要最小ポイント数（デフォルト）
pub const MIN_POINTS: usize = 10;
/// 必要最小スイープ距離 (px, デフォルト)
pub const MIN_SWEEP_PX: f32 = 100.0;
/// セッションの時間窓 (ms, デフォルト)
pub const MAX_SESSION_MS: u64 = 5000;

/// 追跡された参照点
#[derive(Debug, Clone, Copy)]
pub struct CalibrationPoint {
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: u64,
}

/// キャリブレーション結果。保存・読み込みはJSON。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub pixels_per_unit: f32,
    pub confidence: f32,
}

impl CalibrationResult {
    /// 数値の健全性チェック。永続化データはこれを通らない限り使わない。
    pub fn is_valid(&self) -> bool {
        self.pixels_per_unit.is_finite()
            && self.pixels_per_unit > 0.0
            && self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
    }
}

/// 1回のキャリブレーションセッション
///
/// 時間窓を超えたポイントは受け付けない。閾値を満たさない
/// セッションは結果を返さず破棄される（コミットされない）。
#[derive(Debug)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    points: Vec<CalibrationPoint>,
    started_at_ms: u64,
}

impl CalibrationSession {
    pub fn start(now_ms: u64) -> Self {
        Self::with_config(CalibrationConfig::default(), now_ms)
    }

    /// 閾値と参照物寸法を設定から取るセッション
    pub fn with_config(config: CalibrationConfig, now_ms: u64) -> Self {
        Self {
            config,
            points: Vec::new(),
            started_at_ms: now_ms,
        }
    }

    /// ポイントを追加する。時間窓を超えていたらfalseを返し追加しない。
    pub fn add_point(&mut self, x: f32, y: f32, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.started_at_ms) > self.config.window_ms {
            return false;
        }
        self.points.push(CalibrationPoint {
            x,
            y,
            timestamp_ms: now_ms,
        });
        true
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// 連続ポイント間距離の累積 (px)
    pub fn path_length_px(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| {
                let dx = w[1].x - w[0].x;
                let dy = w[1].y - w[0].y;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    /// スケール係数を計算する。参照物の実寸は設定から取る。
    ///
    /// データ不足（ポイント数・累積距離が閾値未満）はNone。
    /// これはエラーではなく正規の結果であり、呼び出し側は使用前に必ず
    /// チェックする。confidence = min(1, (n/min_points)·(path/min_sweep))。
    pub fn calculate(&self) -> Option<CalibrationResult> {
        let reference_len = self.config.reference_len_m;
        if self.points.len() < self.config.min_points || reference_len <= 0.0 {
            return None;
        }
        let path = self.path_length_px();
        if path < self.config.min_sweep_px {
            return None;
        }
        let confidence = ((self.points.len() as f32 / self.config.min_points as f32)
            * (path / self.config.min_sweep_px))
            .min(1.0);
        Some(CalibrationResult {
            pixels_per_unit: path / reference_len,
            confidence,
        })
    }
}

pub fn save_calibration(path: impl AsRef<Path>, cal: &CalibrationResult) -> Result<()> {
    let json = serde_json::to_string_pretty(cal)?;
    fs::write(path, json).context("Failed to write calibration file")?;
    Ok(())
}

/// 保存済みキャリブレーションを読み込む。
///
/// 壊れたデータ・数値型不正は「キャリブレーションなし」として扱い、
/// 決して強制変換しない。
pub fn load_calibration(path: impl AsRef<Path>) -> Option<CalibrationResult> {
    let content = fs::read_to_string(path.as_ref()).ok()?;
    let cal: CalibrationResult = match serde_json::from_str(&content) {
        Ok(cal) => cal,
        Err(e) => {
            warn!(error = %e, "malformed calibration file ignored");
            return None;
        }
    };
    cal.is_valid().then_some(cal)
}

/// デバイスIDごとの最新キャリブレーションのキャッシュ
#[derive(Debug, Default)]
pub struct CalibrationCache {
    entries: HashMap<String, CalibrationResult>,
}

impl CalibrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 有効な結果のみ受け付ける
    pub fn insert(&mut self, device_id: impl Into<String>, cal: CalibrationResult) -> bool {
        if !cal.is_valid() {
            return false;
        }
        self.entries.insert(device_id.into(), cal);
        true
    }

    pub fn get(&self, device_id: &str) -> Option<&CalibrationResult> {
        self.entries.get(device_id)
    }
}
