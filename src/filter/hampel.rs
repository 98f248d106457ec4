/// Hampel外れ値除去フィルタ
///
/// 各サンプルを近傍（自身を除く窓）の中央値±k·MADと比較し、外れたもの
/// だけ近傍中央値で置き換える。単発の検出スパイクを潰し、正常な信号には
/// 手を加えない。自身を除くのは、傾斜のある系列で置換値が1ステップ
/// ずれて平坦部を作らないため。判定は常に元系列に対して行う
/// （置換結果を伝播させない）。
#[derive(Debug, Clone, Copy)]
pub struct Hampel {
    window: usize,
    k: f32,
}

/// MAD→標準偏差換算係数（正規分布前提）
const MAD_SCALE: f32 = 1.4826;

impl Hampel {
    pub fn new(window: usize, k: f32) -> Self {
        Self {
            window: window.max(3) | 1,
            k: k.max(0.0),
        }
    }

    pub fn apply(&self, series: &[f32]) -> Vec<f32> {
        let n = series.len();
        if n < 3 {
            return series.to_vec();
        }
        let half = self.window / 2;

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            // 端は窓を詰める
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let neighbors: Vec<f32> = (lo..hi)
                .filter(|&j| j != i)
                .map(|j| series[j])
                .collect();
            let med = median(&neighbors);
            let deviations: Vec<f32> = neighbors.iter().map(|v| (v - med).abs()).collect();
            let mad = median(&deviations);

            let threshold = self.k * MAD_SCALE * mad;
            if (series[i] - med).abs() > threshold {
                out.push(med);
            } else {
                out.push(series[i]);
            }
        }
        out
    }
}

fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
