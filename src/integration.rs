//! Seams between the pipeline and the outside world.
//!
//! Frame sources, object detectors, trackers, pose estimators and keypoint
//! sinks are all traits here, so inference backends plug in without the
//! pipeline knowing about them. Replay implementations drive the pipeline
//! from recorded detector/pose output.

mod builder;
mod detector;
mod heatmap;
mod pose;
mod replay;
mod sink;
mod source;
mod tracking;

pub use builder::DetectionBuilder;
pub use detector::{COCO_CATEGORY_NAMES, ObjectDetector, RawDetections, coco_category_name};
pub use heatmap::decode_heatmaps;
pub use pose::{HeatmapModel, HeatmapPoseEstimator, PoseEstimate, PoseEstimator};
pub use replay::{RecordedFrame, Recording, ReplayDetector, ReplayError, ReplayPose, ReplaySource};
pub use sink::{KeypointSink, MemorySink, NpyFileSink};
pub use source::{Frame, FrameSource, IterSource};
pub use tracking::IdentityTracker;

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};
