//! Per-frame stages and the orchestrator that chains them.
//!
//! Each frame flows through detection filtering, identity tracking, subject
//! selection, center/scale mapping and pose estimation, and always leaves
//! exactly one [`KeypointFrame`] behind.

mod center_scale;
mod detection_filter;
mod identity;
mod keypoints;
mod orchestrator;

pub use center_scale::{CenterScale, CenterScaleMapper, ModelInputSize, PIXEL_STD, SCALE_MARGIN};
pub use detection_filter::{DEFAULT_THRESHOLD, DetectionFilter, ScoreOrder};
pub use identity::{Selection, SubjectIdentity, select_subject};
pub use keypoints::{Joint, JointIndex, KeypointFrame, KeypointSequence, NUM_JOINTS};
pub use orchestrator::{FrameOutcome, FramePipeline, PipelineState, RunReport};
