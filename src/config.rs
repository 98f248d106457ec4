use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub rep: RepConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothingConfig {
    /// SGフィルタのwindow（5/7/9をサポート）
    #[serde(default = "default_window")]
    pub window: usize,
    /// 多項式次数
    #[serde(default = "default_order")]
    pub order: usize,
    /// 速度系列への後段EMAを使うか
    #[serde(default = "default_ema_enabled")]
    pub ema_enabled: bool,
    /// EMA係数（小さいほど強い平滑化）
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepConfig {
    /// ゼロクロス統合の最小間隔（ms）
    #[serde(default = "default_min_rep_interval")]
    pub min_interval_ms: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    /// アイテムのTTL（ms）
    #[serde(default = "default_feedback_ttl")]
    pub ttl_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    /// 参照物の実寸（メートル）
    #[serde(default = "default_reference_len")]
    pub reference_len_m: f32,
    /// 必要最小ポイント数
    #[serde(default = "default_min_points")]
    pub min_points: usize,
    /// 必要最小スイープ距離（px）
    #[serde(default = "default_min_sweep")]
    pub min_sweep_px: f32,
    /// セッションの時間窓（ms）
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_window() -> usize {
    5
}
fn default_order() -> usize {
    2
}
fn default_ema_enabled() -> bool {
    true
}
fn default_ema_alpha() -> f32 {
    0.2
}
fn default_min_rep_interval() -> f64 {
    300.0
}
fn default_feedback_ttl() -> u64 {
    4000
}
fn default_reference_len() -> f32 {
    0.20
}
fn default_min_points() -> usize {
    crate::calibration::MIN_POINTS
}
fn default_min_sweep() -> f32 {
    crate::calibration::MIN_SWEEP_PX
}
fn default_window_ms() -> u64 {
    crate::calibration::MAX_SESSION_MS
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            order: default_order(),
            ema_enabled: default_ema_enabled(),
            ema_alpha: default_ema_alpha(),
        }
    }
}

impl Default for RepConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_rep_interval(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_feedback_ttl(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            reference_len_m: default_reference_len(),
            min_points: default_min_points(),
            min_sweep_px: default_min_sweep(),
            window_ms: default_window_ms(),
        }
    }
}

impl AnalysisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "config not loaded, using defaults");
                Self::default()
            }
        }
    }
}
