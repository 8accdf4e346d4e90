//! Single-subject pose tracking over video.
//!
//! Every frame is run through a person detector, a SORT tracker and a
//! top-down pose estimator. The first person the tracker reports becomes
//! the subject; from then on only that identity's keypoints are recorded.
//! The result is a `(frames, 17, 3)` array of `[x, y, confidence]` per COCO
//! joint, with zero rows wherever the subject could not be located, so it
//! stays aligned frame-for-frame with the video.
//!
//! ```ignore
//! use subject_pose_rs::{FramePipeline, NpyFileSink, PipelineConfig, Recording};
//!
//! let config = PipelineConfig::load_or_default("subject-pose.toml")?;
//! let (source, detector, pose) = Recording::from_jsonl("run.jsonl")?.into_replay();
//! let mut pipeline = FramePipeline::from_config(detector, pose, &config);
//! pipeline.run(source)?;
//! pipeline.save(NpyFileSink::new(config.output_path()))?;
//! ```

pub mod config;
pub mod error;
pub mod integration;
pub mod pipeline;
pub mod tracker;

pub use config::PipelineConfig;
pub use error::{BoxError, ConfigError, PipelineError, PipelineResult};
pub use integration::{
    DetectionBuilder, Frame, FrameSource, IdentityTracker, IterSource, KeypointSink, MemorySink,
    NpyFileSink, ObjectDetector, PoseEstimate, PoseEstimator, RawDetections, Recording,
};
pub use pipeline::{
    CenterScale, CenterScaleMapper, DetectionFilter, FrameOutcome, FramePipeline, Joint,
    KeypointFrame, KeypointSequence, NUM_JOINTS, PipelineState, RunReport, ScoreOrder,
    SubjectIdentity,
};
pub use tracker::{PersonBox, SortConfig, SortTracker, TrackedBox};
