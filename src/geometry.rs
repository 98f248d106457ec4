//! 関節角度の幾何計算
//!
//! すべて純粋関数。ランドマーク座標は画像座標系（y軸下向き）を前提とする。

use nalgebra::{Point2, Vector2};

/// 頂点bにおけるb→aとb→cの内角（度, 0〜180）
///
/// どちらかのレイが長さゼロの退化入力は0.0を返す。
/// 呼び出し側は退化triple由来の0°を「不明」として扱うこと（完全伸展ではない）。
pub fn angle_between(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> f32 {
    let u: Vector2<f32> = a - b;
    let v: Vector2<f32> = c - b;
    let nu = u.norm();
    let nv = v.norm();
    if nu <= f32::EPSILON || nv <= f32::EPSILON {
        return 0.0;
    }
    // cos = u.v / (|u||v|), 数値誤差で±1をわずかに超えることがある
    let cos = (u.dot(&v) / (nu * nv)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// 屈曲角: 完全伸展(180°)からの曲がり。0°=伸展、大きいほど深い屈曲。
fn flexion(a: Point2<f32>, vertex: Point2<f32>, c: Point2<f32>) -> f32 {
    (180.0 - angle_between(a, vertex, c)).max(0.0)
}

/// 膝屈曲角（股関節-膝-足首）
pub fn knee_flexion(hip: Point2<f32>, knee: Point2<f32>, ankle: Point2<f32>) -> f32 {
    flexion(hip, knee, ankle)
}

/// 股関節屈曲角（肩-股関節-膝）
pub fn hip_flexion(shoulder: Point2<f32>, hip: Point2<f32>, knee: Point2<f32>) -> f32 {
    flexion(shoulder, hip, knee)
}

/// 肘屈曲角（肩-肘-手首）
pub fn elbow_flexion(shoulder: Point2<f32>, elbow: Point2<f32>, wrist: Point2<f32>) -> f32 {
    flexion(shoulder, elbow, wrist)
}

/// 体幹角度: 股関節中点→肩中点ベクトルの水平軸に対する角度（度, 絶対値）
pub fn trunk_angle(hip_mid: Point2<f32>, shoulder_mid: Point2<f32>) -> f32 {
    let d = shoulder_mid - hip_mid;
    d.y.atan2(d.x).to_degrees().abs()
}
