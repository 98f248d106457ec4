pub mod analysis;
pub mod beat;
pub mod calibration;
pub mod config;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod geometry;
pub mod grader;
pub mod pose;
pub mod velocity;

pub use analysis::{analyze, AnalysisInput, AnalysisReport};
pub use error::AnalysisError;
