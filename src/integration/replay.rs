//! Replay of recorded model outputs.
//!
//! A recording is a JSON-lines file with one object per video frame:
//!
//! ```text
//! {"labels": ["person", "dog"], "boxes": [[10, 20, 110, 320], [0, 0, 5, 5]],
//!  "scores": [0.99, 0.97], "joints": [[x, y, c], ...]}
//! ```
//!
//! `joints` is what the pose model returned for the subject crop on that
//! frame (empty or absent when it returned nothing). Replaying lets the
//! filtering, tracking and subject selection be re-run with different
//! settings without touching the networks.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::integration::{
    Frame, FrameSource, ObjectDetector, PoseEstimate, PoseEstimator, RawDetections,
};
use crate::pipeline::{CenterScale, Joint};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read recording: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("frame {0} is not in the recording")]
    MissingFrame(usize),
}

/// One recorded frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub boxes: Vec<[f32; 4]>,
    #[serde(default)]
    pub scores: Vec<f32>,
    #[serde(default)]
    pub joints: Vec<[f32; 3]>,
}

impl RecordedFrame {
    pub fn detections(&self) -> RawDetections {
        RawDetections::new(self.labels.clone(), self.boxes.clone(), self.scores.clone())
    }

    pub fn pose(&self) -> PoseEstimate {
        let joints: Vec<Joint> = self
            .joints
            .iter()
            .map(|&[x, y, c]| Joint::new(x, y, c))
            .collect();
        PoseEstimate::from_joints(&joints)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub frames: Vec<RecordedFrame>,
    /// Reported frame size; recordings carry no pixels
    pub width: u32,
    pub height: u32,
}

impl Recording {
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames,
            width: 0,
            height: 0,
        }
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Parse a JSON-lines recording; blank lines are skipped.
    pub fn from_jsonl<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let reader = BufReader::new(File::open(path)?);
        let mut frames = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                line: i + 1,
                source,
            })?;
            frames.push(frame);
        }
        debug!("loaded recording with {} frames", frames.len());
        Ok(Self::new(frames))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Split into the three collaborators the pipeline needs.
    pub fn into_replay(self) -> (ReplaySource, ReplayDetector, ReplayPose) {
        let width = self.width;
        let height = self.height;
        let frames: Arc<[RecordedFrame]> = self.frames.into();
        (
            ReplaySource {
                next: 0,
                count: frames.len(),
                width,
                height,
            },
            ReplayDetector {
                frames: Arc::clone(&frames),
            },
            ReplayPose { frames },
        )
    }
}

/// Emits one placeholder frame per recorded frame.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    next: usize,
    count: usize,
    width: u32,
    height: u32,
}

impl FrameSource for ReplaySource {
    type Error = ReplayError;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        if self.next >= self.count {
            return Ok(None);
        }
        let frame = Frame::placeholder(self.next, self.width, self.height);
        self.next += 1;
        Ok(Some(frame))
    }
}

#[derive(Debug, Clone)]
pub struct ReplayDetector {
    frames: Arc<[RecordedFrame]>,
}

impl ObjectDetector for ReplayDetector {
    type Error = ReplayError;

    fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Self::Error> {
        self.frames
            .get(frame.index)
            .map(RecordedFrame::detections)
            .ok_or(ReplayError::MissingFrame(frame.index))
    }
}

/// Returns the recorded joints regardless of the requested crop.
#[derive(Debug, Clone)]
pub struct ReplayPose {
    frames: Arc<[RecordedFrame]>,
}

impl PoseEstimator for ReplayPose {
    type Error = ReplayError;

    fn estimate(
        &mut self,
        frame: &Frame,
        _target: &CenterScale,
    ) -> Result<PoseEstimate, Self::Error> {
        self.frames
            .get(frame.index)
            .map(RecordedFrame::pose)
            .ok_or(ReplayError::MissingFrame(frame.index))
    }
}
