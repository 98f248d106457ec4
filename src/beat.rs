//! ビートグリッドとタイミングスコア
//!
//! BPMから等間隔グリッドを生成し、レップ位相イベントの最近傍ビートとの
//! 符号付きオフセットを計算する。BPMが与えられない場合このモジュール全体が
//! スキップされ、スコアは「未評価(None)」になる（0は「最悪と評価」を意味する）。

use serde::Serialize;

use crate::velocity::{RepPhase, RepPhaseEvent};

pub const MIN_BPM: f32 = 30.0;
pub const MAX_BPM: f32 = 300.0;

/// グリッド上の1ビート
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatCue {
    pub time_ms: f64,
    pub index: u32,
}

/// リプレイオーバーレイ用の字幕キュー
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionCue {
    pub time_ms: f64,
    pub text: String,
    pub duration_ms: f64,
}

/// ビートと字幕をまとめたタイムライン
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub start_ms: f64,
    pub end_ms: f64,
    pub bpm: f32,
    pub beats: Vec<BeatCue>,
    pub captions: Vec<CaptionCue>,
}

/// レップ位相と最近傍ビートの符号付きオフセット
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatOffset {
    pub rep_index: u32,
    pub phase: RepPhase,
    /// 正 = ビートより遅れ、負 = ビートより先行
    pub offset_ms: f64,
}

pub fn beat_interval_ms(bpm: f32) -> f64 {
    60_000.0 / clamp_bpm(bpm) as f64
}

pub fn clamp_bpm(bpm: f32) -> f32 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// [start_ms, end_ms]内の等間隔ビートグリッドを生成する
pub fn beat_grid(start_ms: f64, end_ms: f64, bpm: f32) -> Vec<BeatCue> {
    let interval = beat_interval_ms(bpm);
    let mut beats = Vec::new();
    let first = (start_ms / interval).ceil() as i64;
    let mut index = 0u32;
    let mut i = first;
    loop {
        let t = i as f64 * interval;
        if t > end_ms {
            break;
        }
        beats.push(BeatCue { time_ms: t, index });
        index += 1;
        i += 1;
    }
    beats
}

pub fn build_timeline(
    start_ms: f64,
    end_ms: f64,
    bpm: f32,
    captions: Vec<CaptionCue>,
) -> Timeline {
    Timeline {
        start_ms,
        end_ms,
        bpm: clamp_bpm(bpm),
        beats: beat_grid(start_ms, end_ms, bpm),
        captions,
    }
}

/// 最近傍グリッドビートへの符号付きオフセット
///
/// ちょうど半インターバルのタイは前のビート側（正オフセット）に倒す。
fn offset_to_nearest_beat(t_ms: f64, interval: f64) -> f64 {
    let frac = t_ms.rem_euclid(interval);
    if frac * 2.0 <= interval {
        frac
    } else {
        frac - interval
    }
}

/// レップ位相イベント列をビートグリッドに整列する
pub fn sync_phases(events: &[RepPhaseEvent], bpm: f32) -> Vec<BeatOffset> {
    let interval = beat_interval_ms(bpm);
    events
        .iter()
        .map(|e| BeatOffset {
            rep_index: e.rep_index,
            phase: e.phase,
            offset_ms: offset_to_nearest_beat(e.timestamp_ms, interval),
        })
        .collect()
}

/// 平均絶対オフセット → 0〜100のタイミングスコア
///
/// score = 100 · exp(−ln2 · 2·mean/interval)
/// 単調非増加で、score(0) = 100、score(interval/2) = 50 を満たす。
pub fn timing_score(offsets: &[BeatOffset], bpm: f32) -> u32 {
    if offsets.is_empty() {
        return 0;
    }
    let interval = beat_interval_ms(bpm);
    let mean_abs: f64 =
        offsets.iter().map(|o| o.offset_ms.abs()).sum::<f64>() / offsets.len() as f64;
    let score = 100.0 * (-std::f64::consts::LN_2 * 2.0 * mean_abs / interval).exp();
    score.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(t_ms: f64) -> RepPhaseEvent {
        RepPhaseEvent {
            rep_index: 0,
            phase: RepPhase::Concentric,
            timestamp_ms: t_ms,
        }
    }

    #[test]
    fn test_beat_interval() {
        assert!((beat_interval_ms(120.0) - 500.0).abs() < 1e-9);
        assert!((beat_interval_ms(60.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_bpm_clamped() {
        assert_eq!(clamp_bpm(10.0), MIN_BPM);
        assert_eq!(clamp_bpm(500.0), MAX_BPM);
    }

    #[test]
    fn test_beat_grid_regular() {
        let beats = beat_grid(0.0, 2000.0, 120.0);
        assert_eq!(beats.len(), 5); // 0, 500, 1000, 1500, 2000
        for (i, b) in beats.iter().enumerate() {
            assert_eq!(b.index, i as u32);
            assert!((b.time_ms - i as f64 * 500.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_beat_grid_offset_start() {
        let beats = beat_grid(600.0, 2100.0, 120.0);
        assert_eq!(beats[0].time_ms, 1000.0);
        assert_eq!(beats[0].index, 0);
    }

    #[test]
    fn test_offset_on_beat() {
        let offsets = sync_phases(&[event(1000.0)], 120.0);
        assert!(offsets[0].offset_ms.abs() < 1e-9);
    }

    #[test]
    fn test_offset_signed() {
        // 120BPM → 500ms間隔。1100msはビート1000msの100ms後。
        let late = sync_phases(&[event(1100.0)], 120.0);
        assert!((late[0].offset_ms - 100.0).abs() < 1e-9);
        // 900msはビート1000msの100ms前。
        let early = sync_phases(&[event(900.0)], 120.0);
        assert!((early[0].offset_ms + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_half_interval_tie_to_earlier_beat() {
        // ちょうど半分(250ms)は前のビート側 → 正のオフセット
        let offsets = sync_phases(&[event(1250.0)], 120.0);
        assert!((offsets[0].offset_ms - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_perfect() {
        let offsets = sync_phases(&[event(0.0), event(500.0)], 120.0);
        assert_eq!(timing_score(&offsets, 120.0), 100);
    }

    #[test]
    fn test_score_half_interval_at_most_50() {
        let offsets = sync_phases(&[event(1250.0)], 120.0);
        assert!(timing_score(&offsets, 120.0) <= 50);
    }

    #[test]
    fn test_score_monotone_in_offset() {
        let mut prev = u32::MAX;
        for off in [0.0, 20.0, 50.0, 100.0, 150.0, 200.0, 250.0] {
            let offsets = sync_phases(&[event(1000.0 + off)], 120.0);
            let score = timing_score(&offsets, 120.0);
            assert!(score <= prev, "score increased at offset {}", off);
            prev = score;
        }
    }

    #[test]
    fn test_score_empty_events() {
        assert_eq!(timing_score(&[], 120.0), 0);
    }

    #[test]
    fn test_timeline_bundles_grid_and_captions() {
        let captions = vec![CaptionCue {
            time_ms: 1000.0,
            text: "depth!".to_string(),
            duration_ms: 1500.0,
        }];
        let timeline = build_timeline(0.0, 4000.0, 100.0, captions);
        assert_eq!(timeline.bpm, 100.0);
        assert_eq!(timeline.beats.len(), 7); // 600ms間隔で0〜3600
        assert_eq!(timeline.captions.len(), 1);
    }
}
