//! フォーム評価（フレーム単位・ステートレス）
//!
//! フレームをまたぐ状態は持たない。順不同・並列のフレーム評価を許すための設計。

pub mod rules;

pub use rules::{Check, ExerciseKind, Metric, Rule, RuleSeverity};

use serde::Serialize;

use crate::geometry;
use crate::pose::{LandmarkIndex, Pose};

/// 1フレーム分のフォーム評価結果
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameFeedback {
    pub major_errors: Vec<&'static str>,
    pub minor_errors: Vec<&'static str>,
}

impl FrameFeedback {
    pub fn is_clean(&self) -> bool {
        self.major_errors.is_empty() && self.minor_errors.is_empty()
    }
}

/// 指標を計算する。必要ランドマークが欠けていればNone。
fn eval_metric(pose: &Pose, metric: Metric) -> Option<f32> {
    use LandmarkIndex as L;
    match metric {
        Metric::HipFlexion => {
            let shoulder = pose.midpoint(L::LeftShoulder, L::RightShoulder)?;
            let hip = pose.midpoint(L::LeftHip, L::RightHip)?;
            let knee = pose.midpoint(L::LeftKnee, L::RightKnee)?;
            Some(geometry::hip_flexion(shoulder, hip, knee))
        }
        Metric::KneeFlexion => {
            let hip = pose.midpoint(L::LeftHip, L::RightHip)?;
            let knee = pose.midpoint(L::LeftKnee, L::RightKnee)?;
            let ankle = pose.midpoint(L::LeftAnkle, L::RightAnkle)?;
            Some(geometry::knee_flexion(hip, knee, ankle))
        }
        Metric::ElbowFlexion => {
            let shoulder = pose.midpoint(L::LeftShoulder, L::RightShoulder)?;
            let elbow = pose.midpoint(L::LeftElbow, L::RightElbow)?;
            let wrist = pose.midpoint(L::LeftWrist, L::RightWrist)?;
            Some(geometry::elbow_flexion(shoulder, elbow, wrist))
        }
        Metric::TrunkAngle => {
            let hip = pose.midpoint(L::LeftHip, L::RightHip)?;
            let shoulder = pose.midpoint(L::LeftShoulder, L::RightShoulder)?;
            Some(geometry::trunk_angle(hip, shoulder))
        }
        Metric::KneeSeparation => {
            let lk = pose.get(L::LeftKnee)?;
            let rk = pose.get(L::RightKnee)?;
            // 正規化座標を前提にフレーム幅%へ変換
            Some((lk.x - rk.x).abs() * 100.0)
        }
    }
}

/// 1フレームをルールテーブルで評価する。
///
/// 必要ランドマークが欠けたルールはスキップされる（違反扱いにはしない）。
pub fn grade_frame(pose: &Pose, exercise: ExerciseKind) -> FrameFeedback {
    let mut feedback = FrameFeedback::default();

    for rule in exercise.rules() {
        if !pose.has_all(rule.required) {
            continue;
        }
        let value = match eval_metric(pose, rule.metric) {
            Some(v) => v,
            None => continue,
        };
        let violated = match rule.check {
            Check::Min(min) => value < min,
            Check::Max(max) => value > max,
        };
        if violated {
            match rule.severity {
                RuleSeverity::Major => feedback.major_errors.push(rule.tag),
                RuleSeverity::Minor => feedback.minor_errors.push(rule.tag),
            }
        }
    }

    feedback
}

/// セッション集計: formScore = max(0, 100 − major×5 − minor×1)
///
/// 単純な加点減点モデル。メジャーは安全に関わるため5倍の重み。
pub fn form_score(frames: &[FrameFeedback]) -> u32 {
    let majors: u32 = frames.iter().map(|f| f.major_errors.len() as u32).sum();
    let minors: u32 = frames.iter().map(|f| f.minor_errors.len() as u32).sum();
    100u32.saturating_sub(majors.saturating_mul(5)).saturating_sub(minors)
}
