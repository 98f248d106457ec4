use std::collections::HashMap;
use std::fs;

use anyhow::{bail, Context, Result};
use velox_analysis::analysis::{analyze, AnalysisInput};
use velox_analysis::calibration;
use velox_analysis::config::AnalysisConfig;
use velox_analysis::grader::ExerciseKind;
use velox_analysis::pose::{Landmark, LandmarkIndex, Pose};

const CONFIG_PATH: &str = "velox.toml";

/// 検出器が出力したポーズ列JSONを解析してレポートを出力する
///
/// 使い方: analyze <poses.json> <exercise> <fps> [bpm] [calibration.json]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        bail!("usage: analyze <poses.json> <exercise> <fps> [bpm] [calibration.json]");
    }

    let poses = load_poses(&args[1])?;
    let exercise = ExerciseKind::from_id(&args[2])
        .with_context(|| format!("unknown exercise: {}", args[2]))?;
    let fps: f32 = args[3].parse().context("fps must be a number")?;
    let bpm: Option<f32> = match args.get(4) {
        Some(s) => Some(s.parse().context("bpm must be a number")?),
        None => None,
    };
    let cal = args.get(5).and_then(calibration::load_calibration);

    let config = AnalysisConfig::load_or_default(CONFIG_PATH);
    let input = AnalysisInput {
        poses,
        exercise,
        fps,
        bpm,
    };
    let report = analyze(&input, &config, cal.as_ref())?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// JSON形式: フレームごとの {ランドマーク名: {x, y, confidence?}} の配列
fn load_poses(path: &str) -> Result<Vec<Pose>> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    let frames: Vec<HashMap<String, Landmark>> =
        serde_json::from_str(&content).context("parse poses json")?;

    let mut poses = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut pose = Pose::new();
        for (name, landmark) in frame {
            match LandmarkIndex::from_name(&name) {
                Some(idx) => pose.set(idx, landmark),
                None => bail!("unknown landmark name: {}", name),
            }
        }
        poses.push(pose);
    }
    Ok(poses)
}
