use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// 17ランドマークのインデックス（MoveNet互換の語彙）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl LandmarkIndex {
    pub const COUNT: usize = 17;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }

    /// 検出器出力のJSONキー名（camelCase）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        (0..Self::COUNT)
            .filter_map(Self::from_index)
            .find(|idx| idx.name() == name)
    }
}

/// 単一ランドマーク（正規化またはピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// 検出信頼度 (0.0〜1.0)。検出器が出力しない場合はNone。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            confidence: None,
        }
    }

    pub fn with_confidence(x: f32, y: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            confidence: Some(confidence),
        }
    }

    /// 信頼度が閾値以上か。信頼度なしは信頼できるものとして扱う。
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence.map_or(true, |c| c >= threshold)
    }

    pub fn point(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}

/// 1フレーム分の姿勢。ランドマークは疎（欠損あり）。
///
/// 欠損ランドマークはNoneであり、ゼロ座標とは区別される。
#[derive(Debug, Clone, Default)]
pub struct Pose {
    landmarks: [Option<Landmark>; LandmarkIndex::COUNT],
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks[index as usize].as_ref()
    }

    pub fn set(&mut self, index: LandmarkIndex, landmark: Landmark) {
        self.landmarks[index as usize] = Some(landmark);
    }

    pub fn has(&self, index: LandmarkIndex) -> bool {
        self.landmarks[index as usize].is_some()
    }

    pub fn has_all(&self, indices: &[LandmarkIndex]) -> bool {
        indices.iter().all(|&idx| self.has(idx))
    }

    /// 左右ランドマークの中点。どちらかが欠損ならNone。
    pub fn midpoint(&self, left: LandmarkIndex, right: LandmarkIndex) -> Option<Point2<f32>> {
        let l = self.get(left)?;
        let r = self.get(right)?;
        Some(Point2::new((l.x + r.x) / 2.0, (l.y + r.y) / 2.0))
    }

    /// 存在するランドマークの平均信頼度。信頼度なしは1.0として数える。
    pub fn average_confidence(&self) -> f32 {
        let present: Vec<f32> = self
            .landmarks
            .iter()
            .flatten()
            .map(|l| l.confidence.unwrap_or(1.0))
            .collect();
        if present.is_empty() {
            return 0.0;
        }
        present.iter().sum::<f32>() / present.len() as f32
    }
}
