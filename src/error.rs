use thiserror::Error;

/// 解析コアのエラー型
///
/// 純粋な計算コンポーネントは設定が不正な場合のみエラーを返す。
/// ランドマーク欠損やキャリブレーション不足は正常系（None / スキップ）として扱う。
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("unsupported smoothing configuration: window {window}, order {order}")]
    UnsupportedSmoothing { window: usize, order: usize },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl AnalysisError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}
