/// 指数移動平均（速度系列の後段平滑化用）
///
/// alphaが小さいほど平滑化が強い。先頭サンプルはそのまま通す。
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f32,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn apply(&self, series: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(series.len());
        let mut prev = match series.first() {
            Some(&v) => v,
            None => return out,
        };
        out.push(prev);
        for &v in &series[1..] {
            prev = self.alpha * v + (1.0 - self.alpha) * prev;
            out.push(prev);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passthrough() {
        let out = Ema::new(0.2).apply(&[5.0, 5.0, 5.0]);
        assert_eq!(out, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_no_smoothing_at_alpha_one() {
        let series = [1.0, -2.0, 3.0];
        let out = Ema::new(1.0).apply(&series);
        assert_eq!(out, series.to_vec());
    }

    #[test]
    fn test_smoothing_lags_step() {
        let out = Ema::new(0.5).apply(&[0.0, 1.0, 1.0]);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[2], 0.75);
    }

    #[test]
    fn test_empty_series() {
        assert!(Ema::new(0.2).apply(&[]).is_empty());
    }
}
