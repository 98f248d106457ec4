//! 種目ごとの宣言的ルールテーブル
//!
//! 種目の追加は「テーブルに行を足す」だけで済むようにする。
//! 各ルールは必要ランドマーク・角度指標・閾値・エラータグ・重大度を持ち、
//! 評価は`grade_frame`の単一インタープリタが行う。

use crate::pose::LandmarkIndex as L;

/// ルールが参照する角度/距離指標
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// 股関節屈曲角（肩中点-股関節中点-膝中点）
    HipFlexion,
    /// 膝屈曲角（股関節中点-膝中点-足首中点）
    KneeFlexion,
    /// 肘屈曲角（肩中点-肘中点-手首中点）
    ElbowFlexion,
    /// 体幹角度（股関節中点→肩中点, 水平軸基準）
    TrunkAngle,
    /// 左右膝のX間隔（正規化座標のフレーム幅%）、ニーバルガスの代理指標
    KneeSeparation,
}

/// 閾値チェック。Minは下回ったら違反、Maxは上回ったら違反。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    Min(f32),
    Max(f32),
}

/// 違反時の重大度。Majorは安全に関わるフォルト。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSeverity {
    Major,
    Minor,
}

pub struct Rule {
    pub required: &'static [L],
    pub metric: Metric,
    pub check: Check,
    pub tag: &'static str,
    pub severity: RuleSeverity,
}

/// 対応種目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    Squat,
    Deadlift,
    Pushup,
    Lunge,
    BenchPress,
}

impl ExerciseKind {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "squat" => Some(Self::Squat),
            "deadlift" => Some(Self::Deadlift),
            "pushup" => Some(Self::Pushup),
            "lunge" => Some(Self::Lunge),
            "bench_press" => Some(Self::BenchPress),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Deadlift => "deadlift",
            Self::Pushup => "pushup",
            Self::Lunge => "lunge",
            Self::BenchPress => "bench_press",
        }
    }

    pub fn rules(&self) -> &'static [Rule] {
        match self {
            Self::Squat => SQUAT_RULES,
            Self::Deadlift => DEADLIFT_RULES,
            Self::Pushup => PUSHUP_RULES,
            Self::Lunge => LUNGE_RULES,
            Self::BenchPress => BENCH_PRESS_RULES,
        }
    }
}

const HIP_FLEXION_LANDMARKS: &[L] = &[
    L::LeftShoulder,
    L::RightShoulder,
    L::LeftHip,
    L::RightHip,
    L::LeftKnee,
    L::RightKnee,
];

const KNEE_FLEXION_LANDMARKS: &[L] = &[
    L::LeftHip,
    L::RightHip,
    L::LeftKnee,
    L::RightKnee,
    L::LeftAnkle,
    L::RightAnkle,
];

const ELBOW_FLEXION_LANDMARKS: &[L] = &[
    L::LeftShoulder,
    L::RightShoulder,
    L::LeftElbow,
    L::RightElbow,
    L::LeftWrist,
    L::RightWrist,
];

const TRUNK_LANDMARKS: &[L] = &[
    L::LeftShoulder,
    L::RightShoulder,
    L::LeftHip,
    L::RightHip,
];

const KNEE_PAIR: &[L] = &[L::LeftKnee, L::RightKnee];

const SQUAT_RULES: &[Rule] = &[
    Rule {
        required: HIP_FLEXION_LANDMARKS,
        metric: Metric::HipFlexion,
        check: Check::Min(80.0),
        tag: "insufficient_depth",
        severity: RuleSeverity::Major,
    },
    Rule {
        required: KNEE_PAIR,
        metric: Metric::KneeSeparation,
        check: Check::Max(30.0),
        tag: "knee_valgus",
        severity: RuleSeverity::Major,
    },
    Rule {
        required: TRUNK_LANDMARKS,
        metric: Metric::TrunkAngle,
        check: Check::Min(50.0),
        tag: "back_too_horizontal",
        severity: RuleSeverity::Major,
    },
    Rule {
        required: TRUNK_LANDMARKS,
        metric: Metric::TrunkAngle,
        check: Check::Max(85.0),
        tag: "torso_too_upright",
        severity: RuleSeverity::Minor,
    },
];

const DEADLIFT_RULES: &[Rule] = &[
    Rule {
        required: HIP_FLEXION_LANDMARKS,
        metric: Metric::HipFlexion,
        check: Check::Min(45.0),
        tag: "insufficient_hinge",
        severity: RuleSeverity::Major,
    },
    Rule {
        required: KNEE_FLEXION_LANDMARKS,
        metric: Metric::KneeFlexion,
        check: Check::Max(70.0),
        tag: "excessive_knee_bend",
        severity: RuleSeverity::Minor,
    },
];

const PUSHUP_RULES: &[Rule] = &[
    Rule {
        required: ELBOW_FLEXION_LANDMARKS,
        metric: Metric::ElbowFlexion,
        check: Check::Min(70.0),
        tag: "insufficient_depth",
        severity: RuleSeverity::Major,
    },
    Rule {
        required: HIP_FLEXION_LANDMARKS,
        metric: Metric::HipFlexion,
        check: Check::Max(25.0),
        tag: "hip_sag",
        severity: RuleSeverity::Minor,
    },
];

const LUNGE_RULES: &[Rule] = &[
    Rule {
        required: KNEE_FLEXION_LANDMARKS,
        metric: Metric::KneeFlexion,
        check: Check::Min(70.0),
        tag: "insufficient_depth",
        severity: RuleSeverity::Major,
    },
    Rule {
        required: TRUNK_LANDMARKS,
        metric: Metric::TrunkAngle,
        check: Check::Min(60.0),
        tag: "torso_lean",
        severity: RuleSeverity::Minor,
    },
];

const BENCH_PRESS_RULES: &[Rule] = &[
    Rule {
        required: ELBOW_FLEXION_LANDMARKS,
        metric: Metric::ElbowFlexion,
        check: Check::Min(60.0),
        tag: "insufficient_range",
        severity: RuleSeverity::Major,
    },
    Rule {
        required: ELBOW_FLEXION_LANDMARKS,
        metric: Metric::ElbowFlexion,
        check: Check::Max(165.0),
        tag: "overextension",
        severity: RuleSeverity::Minor,
    },
];
