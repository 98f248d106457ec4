//! Savitzky-Golayフィルタ
//!
//! 位置系列の平滑化に使う。係数はレガシー互換の固定テーブル（window 5/7/9, order 2）
//! または最小二乗法によるオンデマンド計算（任意の奇数window・低次order）。

use crate::error::AnalysisError;

/// レガシー実装と同一の事前計算済み係数（window 5/7/9, order 2）
const COEFF_5_2: [f32; 5] = [-0.0857, 0.3429, 0.4857, 0.3429, -0.0857];
const COEFF_7_2: [f32; 7] = [
    -0.0952, 0.1429, 0.2857, 0.3333, 0.2857, 0.1429, -0.0952,
];
const COEFF_9_2: [f32; 9] = [
    -0.0909, 0.0606, 0.1688, 0.2338, 0.2554, 0.2338, 0.1688, 0.0606, -0.0909,
];

const MAX_FITTED_WINDOW: usize = 31;
const MAX_FITTED_ORDER: usize = 6;

/// 固定カーネルの畳み込み平滑化フィルタ
#[derive(Debug, Clone)]
pub struct SavGol {
    window: usize,
    coeffs: Vec<f32>,
}

impl SavGol {
    /// 事前計算テーブルからフィルタを作る。
    ///
    /// テーブルにない(window, order)は`UnsupportedSmoothing`で失敗する。
    /// 黙ってフォールバックはしない。
    pub fn new(window: usize, order: usize) -> Result<Self, AnalysisError> {
        let coeffs: &[f32] = match (window, order) {
            (5, 2) => &COEFF_5_2,
            (7, 2) => &COEFF_7_2,
            (9, 2) => &COEFF_9_2,
            _ => return Err(AnalysisError::UnsupportedSmoothing { window, order }),
        };
        Ok(Self {
            window,
            coeffs: coeffs.to_vec(),
        })
    }

    /// 最小二乗フィットで係数を計算するフィルタを作る。
    ///
    /// 奇数window (3〜31) と order < window (最大6) をサポート。
    /// テーブル係数の一般化版であり、テーブルと組み合わせはほぼ同一の出力になる。
    pub fn fitted(window: usize, order: usize) -> Result<Self, AnalysisError> {
        if window < 3
            || window > MAX_FITTED_WINDOW
            || window % 2 == 0
            || order >= window
            || order > MAX_FITTED_ORDER
        {
            return Err(AnalysisError::UnsupportedSmoothing { window, order });
        }
        Ok(Self {
            window,
            coeffs: fit_coefficients(window, order),
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// 系列を平滑化する。出力は入力と同じ長さ。
    ///
    /// 端は先頭/末尾サンプルをwindow/2個ずつ複製してパディングする
    /// （系列を縮めず、端に人工的な過渡も持ち込まない）。
    pub fn smooth(&self, series: &[f32]) -> Vec<f32> {
        if series.is_empty() {
            return Vec::new();
        }
        let half = self.window / 2;

        let mut padded = Vec::with_capacity(series.len() + 2 * half);
        padded.extend(std::iter::repeat(series[0]).take(half));
        padded.extend_from_slice(series);
        padded.extend(std::iter::repeat(series[series.len() - 1]).take(half));

        let mut result = Vec::with_capacity(series.len());
        for i in half..padded.len() - half {
            let mut sum = 0.0;
            for (j, c) in self.coeffs.iter().enumerate() {
                sum += padded[i - half + j] * c;
            }
            result.push(sum);
        }
        result
    }
}

/// 中心評価のSG平滑化係数を正規方程式で解く
///
/// c_j = [V (V^T V)^{-1} e_0]_j, V: Vandermonde行列 (t = j - half)
fn fit_coefficients(window: usize, order: usize) -> Vec<f32> {
    let half = (window / 2) as i64;
    let p = order + 1;

    // A = V^T V (p x p)
    let mut a = vec![vec![0.0f64; p]; p];
    for t in -half..=half {
        let mut powers = vec![1.0f64; p];
        for k in 1..p {
            powers[k] = powers[k - 1] * t as f64;
        }
        for r in 0..p {
            for c in 0..p {
                a[r][c] += powers[r] * powers[c];
            }
        }
    }

    // A x = e_0 をガウスの消去法（部分ピボット選択）で解く
    let mut b = vec![0.0f64; p];
    b[0] = 1.0;
    let x = solve(&mut a, &mut b);

    // c_j = Σ_k x_k t_j^k
    let mut coeffs = Vec::with_capacity(window);
    for t in -half..=half {
        let mut c = 0.0f64;
        let mut tp = 1.0f64;
        for &xk in &x {
            c += xk * tp;
            tp *= t as f64;
        }
        coeffs.push(c as f32);
    }
    coeffs
}

fn solve(a: &mut [Vec<f64>], b: &mut [f64]) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let mut pivot = col;
        for r in col + 1..n {
            if a[r][col].abs() > a[pivot][col].abs() {
                pivot = r;
            }
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        // 正規方程式は正定値なのでピボットはゼロにならない
        for r in col + 1..n {
            let factor = a[r][col] / a[col][col];
            for c in col..n {
                a[r][c] -= factor * a[col][c];
            }
            b[r] -= factor * b[col];
        }
    }
    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in i + 1..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }
    x
}
