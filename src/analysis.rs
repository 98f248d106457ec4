//! セッション解析パイプライン
//!
//! ポーズ系列と設定を受け取り、フォームスコア・速度プロファイル・
//! ビートタイミングをまとめたレポートを返す。I/Oは一切行わない。
//! 動画取得やポーズ検出は呼び出し側（ルートハンドラ）の責務。

use serde::Serialize;
use tracing::info;

use crate::beat::{self, BeatOffset};
use crate::calibration::CalibrationResult;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::filter::{Ema, SavGol};
use crate::grader::{self, ExerciseKind, FrameFeedback};
use crate::pose::{LandmarkIndex, Pose};
use crate::velocity::{RepMetrics, VelocityEngine, VelocitySample};

/// 解析リクエスト
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub poses: Vec<Pose>,
    pub exercise: ExerciseKind,
    pub fps: f32,
    /// Noneならビート同期は行わず、timing_scoreはNone（未評価）になる
    pub bpm: Option<f32>,
}

/// 解析結果。ルートハンドラがそのままJSONで返せる形。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub form_score: u32,
    pub form_feedback: Vec<FrameFeedback>,
    pub velocity: Vec<VelocitySample>,
    pub rep_metrics: Vec<RepMetrics>,
    pub beat_timing: Vec<BeatOffset>,
    /// 未評価（BPMなし）はNone。0は「最悪と評価された」ことを意味する。
    pub timing_score: Option<u32>,
}

/// ポーズ系列から股関節中点の垂直位置系列を作る
///
/// 欠損フレームは直前の値で埋める（ゼロ扱いにしない）。
fn hip_y_series(poses: &[Pose]) -> Vec<f32> {
    let raw: Vec<Option<f32>> = poses
        .iter()
        .map(|p| {
            p.midpoint(LandmarkIndex::LeftHip, LandmarkIndex::RightHip)
                .map(|m| m.y)
        })
        .collect();

    let first_known = raw.iter().flatten().next().copied().unwrap_or(0.0);
    let mut series = Vec::with_capacity(raw.len());
    let mut prev = first_known;
    for v in raw {
        prev = v.unwrap_or(prev);
        series.push(prev);
    }
    series
}

/// セッション全体を解析する
pub fn analyze(
    input: &AnalysisInput,
    config: &AnalysisConfig,
    calibration: Option<&CalibrationResult>,
) -> Result<AnalysisReport, AnalysisError> {
    if input.poses.is_empty() {
        return Err(AnalysisError::invalid_input("empty pose sequence"));
    }
    if !input.fps.is_finite() || input.fps <= 0.0 {
        return Err(AnalysisError::invalid_input(format!(
            "fps must be positive, got {}",
            input.fps
        )));
    }

    // 1. 垂直位置系列 → SG平滑化
    let filter = SavGol::new(config.smoothing.window, config.smoothing.order)?;
    let y_smooth = filter.smooth(&hip_y_series(&input.poses));

    // 2. 速度 + レップ区切り（キャリブレーションがあれば物理単位）
    let scale = calibration
        .filter(|c| c.is_valid())
        .map(|c| c.pixels_per_unit);
    let ema = config
        .smoothing
        .ema_enabled
        .then(|| Ema::new(config.smoothing.ema_alpha));
    let engine = VelocityEngine::new(input.fps)
        .with_min_rep_interval(config.rep.min_interval_ms)
        .with_ema(ema);
    let profile = engine.analyze(&y_smooth, scale);

    // 3. フレームごとのフォーム評価
    let form_feedback: Vec<FrameFeedback> = input
        .poses
        .iter()
        .map(|p| grader::grade_frame(p, input.exercise))
        .collect();
    let form_score = grader::form_score(&form_feedback);

    // 4. ビート同期（BPMがある場合のみ）
    let (beat_timing, timing_score) = match input.bpm {
        Some(bpm) => {
            let offsets = beat::sync_phases(&profile.phases, bpm);
            let score = beat::timing_score(&offsets, bpm);
            (offsets, Some(score))
        }
        None => (Vec::new(), None),
    };

    info!(
        exercise = input.exercise.id(),
        frames = input.poses.len(),
        reps = profile.reps.len(),
        form_score,
        ?timing_score,
        "session analyzed"
    );

    Ok(AnalysisReport {
        form_score,
        form_feedback,
        velocity: profile.samples,
        rep_metrics: profile.reps,
        beat_timing,
        timing_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;
    use LandmarkIndex as L;

    /// 股関節のy座標だけ動かした全身ポーズ
    fn pose_at_hip_y(hip_y: f32) -> Pose {
        let mut pose = Pose::new();
        pose.set(L::LeftShoulder, Landmark::new(0.45, hip_y - 0.25));
        pose.set(L::RightShoulder, Landmark::new(0.55, hip_y - 0.25));
        pose.set(L::LeftHip, Landmark::new(0.45, hip_y));
        pose.set(L::RightHip, Landmark::new(0.55, hip_y));
        pose.set(L::LeftKnee, Landmark::new(0.45, hip_y + 0.15));
        pose.set(L::RightKnee, Landmark::new(0.55, hip_y + 0.15));
        pose.set(L::LeftAnkle, Landmark::new(0.45, hip_y + 0.30));
        pose.set(L::RightAnkle, Landmark::new(0.55, hip_y + 0.30));
        pose
    }

    /// スクワット1回分: 下降→上昇
    fn squat_session() -> Vec<Pose> {
        let mut poses = Vec::new();
        for i in 0..20 {
            poses.push(pose_at_hip_y(0.4 + i as f32 * 0.01));
        }
        for i in 0..20 {
            poses.push(pose_at_hip_y(0.6 - i as f32 * 0.01));
        }
        poses
    }

    fn input(bpm: Option<f32>) -> AnalysisInput {
        AnalysisInput {
            poses: squat_session(),
            exercise: ExerciseKind::Squat,
            fps: 30.0,
            bpm,
        }
    }

    #[test]
    fn test_report_shape() {
        let report = analyze(&input(None), &AnalysisConfig::default(), None).unwrap();
        assert_eq!(report.velocity.len(), 40);
        assert_eq!(report.form_feedback.len(), 40);
        assert!(report.form_score <= 100);
        assert!(!report.rep_metrics.is_empty());
    }

    #[test]
    fn test_no_bpm_means_unevaluated() {
        let report = analyze(&input(None), &AnalysisConfig::default(), None).unwrap();
        assert_eq!(report.timing_score, None);
        assert!(report.beat_timing.is_empty());
    }

    #[test]
    fn test_bpm_produces_timing() {
        let report = analyze(&input(Some(120.0)), &AnalysisConfig::default(), None).unwrap();
        assert!(report.timing_score.is_some());
    }

    #[test]
    fn test_uncalibrated_velocity_flagged() {
        let report = analyze(&input(None), &AnalysisConfig::default(), None).unwrap();
        assert!(report.velocity.iter().all(|v| !v.calibrated));
    }

    #[test]
    fn test_calibration_converts_units() {
        let cal = CalibrationResult {
            pixels_per_unit: 750.0,
            confidence: 1.0,
        };
        let raw = analyze(&input(None), &AnalysisConfig::default(), None).unwrap();
        let phys = analyze(&input(None), &AnalysisConfig::default(), Some(&cal)).unwrap();
        assert!(phys.velocity.iter().all(|v| v.calibrated));
        for (r, p) in raw.velocity.iter().zip(phys.velocity.iter()) {
            assert!((r.value / 750.0 - p.value).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_calibration_ignored() {
        let bad = CalibrationResult {
            pixels_per_unit: f32::NAN,
            confidence: 0.5,
        };
        let report = analyze(&input(None), &AnalysisConfig::default(), Some(&bad)).unwrap();
        assert!(report.velocity.iter().all(|v| !v.calibrated));
    }

    #[test]
    fn test_empty_poses_rejected() {
        let mut bad = input(None);
        bad.poses.clear();
        assert!(matches!(
            analyze(&bad, &AnalysisConfig::default(), None),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_bad_fps_rejected() {
        let mut bad = input(None);
        bad.fps = 0.0;
        assert!(analyze(&bad, &AnalysisConfig::default(), None).is_err());
    }

    #[test]
    fn test_unsupported_smoothing_propagates() {
        let mut config = AnalysisConfig::default();
        config.smoothing.window = 6;
        assert!(matches!(
            analyze(&input(None), &config, None),
            Err(AnalysisError::UnsupportedSmoothing { .. })
        ));
    }

    #[test]
    fn test_missing_hips_filled_from_previous() {
        let mut poses = squat_session();
        // 中間の2フレームで股関節を欠損させる
        poses[10] = Pose::new();
        poses[11] = Pose::new();
        let report = analyze(
            &AnalysisInput {
                poses,
                exercise: ExerciseKind::Squat,
                fps: 30.0,
                bpm: None,
            },
            &AnalysisConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(report.velocity.len(), 40);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = analyze(&input(Some(120.0)), &AnalysisConfig::default(), None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("formScore").is_some());
        assert!(json.get("formFeedback").is_some());
        assert!(json.get("velocity").is_some());
        assert!(json.get("beatTiming").is_some());
        assert!(json.get("timingScore").is_some());
    }
}
