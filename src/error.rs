//! Error types for the subject pose pipeline.
//!
//! Soft failures (nothing detected, subject not tracked this frame, empty
//! pose) never surface here: the orchestrator absorbs them by zero-filling
//! the frame. Everything in this module aborts a run.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error coming out of an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("frame source failed: {0}")]
    Source(#[source] BoxError),

    #[error("detector failed on frame {frame}: {source}")]
    Detector {
        frame: usize,
        #[source]
        source: BoxError,
    },

    #[error("tracker failed on frame {frame}: {source}")]
    Tracker {
        frame: usize,
        #[source]
        source: BoxError,
    },

    #[error("pose estimator failed on frame {frame}: {source}")]
    Pose {
        frame: usize,
        #[source]
        source: BoxError,
    },

    #[error("keypoint sink failed: {0}")]
    Sink(#[source] BoxError),

    /// Detector returned label/box/score arrays of different lengths.
    #[error(
        "malformed detections: {labels} labels, {boxes} boxes, {scores} scores (must be parallel)"
    )]
    MalformedDetections {
        labels: usize,
        boxes: usize,
        scores: usize,
    },

    /// Scores were not sorted descending and the filter was told to validate.
    #[error("detector scores are not sorted descending (first violation at index {index})")]
    UnsortedScores { index: usize },

    #[error("pose has {preds} predictions and {confidences} confidences, expected 0 or {expected}")]
    PoseShapeMismatch {
        preds: usize,
        confidences: usize,
        expected: usize,
    },

    #[error("frame index {got} arrived after frame {previous}; frames must be strictly increasing")]
    FrameOutOfOrder { previous: usize, got: usize },

    #[error("pipeline already reached the end of its frame stream")]
    Finished,

    #[error("pipeline stopped after an earlier error and cannot continue")]
    Aborted,

    #[error("keypoint array has shape {actual:?}, expected (frames, {joints}, 3)")]
    ShapeMismatch { actual: Vec<usize>, joints: usize },

    #[error("failed to write keypoints to {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("failed to read keypoints from {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
